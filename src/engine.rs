// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Circulation engine.
//!
//! The [`Engine`] owns the catalog, the membership and the transaction log,
//! and is the only way to lend, take back or settle fines.
//!
//! # Circulation
//!
//! - **Borrow**: Lends an available book to an eligible member for their
//!   type's loan period.
//! - **Return**: Takes a book back from its borrower, charging
//!   `min(days_overdue * 1.00, 50.00)` when late.
//! - **Pay fine**: Reduces a member's outstanding fine.
//!
//! Every operation checks all of its preconditions before touching state, so
//! a rejected call changes nothing.
//!
//! # Thread Safety
//!
//! All state sits behind one [`Mutex`]. Each operation holds it from the
//! first check to the last write, and every query returns owned copies.

use crate::LibraryError;
use crate::base::{BookId, MemberId};
use crate::book::{Book, Loan, SearchField};
use crate::catalog::Catalog;
use crate::clock::{Clock, SystemClock};
use crate::member::{Member, MemberType};
use crate::membership::Membership;
use crate::receipt::{BorrowReceipt, PaymentReceipt, ReturnReceipt};
use crate::report::{Statistics, StatisticsReport};
use crate::transaction::Transaction;
use crate::transaction_log::TransactionLog;
use chrono::{Duration, NaiveDateTime};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::{debug, info};

/// Charged per whole day a book is late.
pub const FINE_PER_DAY: Decimal = dec!(1.00);
/// Most a single late return can cost.
pub const MAX_FINE_PER_BOOK: Decimal = dec!(50.00);
/// Members owing more than this cannot borrow.
pub const FINE_CEILING: Decimal = dec!(50.00);

/// Fine for a return `days_overdue` whole days late.
pub fn fine_for(days_overdue: i64) -> Decimal {
    if days_overdue <= 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(days_overdue) * FINE_PER_DAY).min(MAX_FINE_PER_BOOK)
}

/// Owned copy of the whole engine state, taken under one lock.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub books: Vec<Book>,
    pub members: Vec<Member>,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Default)]
struct LibraryState {
    catalog: Catalog,
    members: Membership,
    log: TransactionLog,
}

impl LibraryState {
    fn borrow(
        &mut self,
        member_id: &MemberId,
        book_id: &BookId,
        now: NaiveDateTime,
    ) -> Result<BorrowReceipt, LibraryError> {
        let member = self
            .members
            .get_mut(member_id)
            .ok_or(LibraryError::MemberNotFound)?;
        let book = self
            .catalog
            .get_mut(book_id)
            .ok_or(LibraryError::BookNotFound)?;

        if !member.is_active() {
            return Err(LibraryError::MemberInactive);
        }
        if !book.is_available() {
            return Err(LibraryError::BookNotAvailable);
        }
        if member.fine_amount() > FINE_CEILING {
            return Err(LibraryError::FineLimitExceeded);
        }
        if !member.can_borrow_more_books() {
            return Err(LibraryError::BookLimitReached);
        }

        let due_date = now + Duration::days(member.member_type().borrow_duration_days());
        let transaction_id = self.log.next_id();
        self.log.push(Transaction::borrow(
            transaction_id,
            member_id.clone(),
            book_id.clone(),
            now,
            due_date,
        ))?;

        book.lend(Loan::new(member_id.clone(), now, due_date));
        member.add_borrowed_book(book_id.clone());

        Ok(BorrowReceipt {
            transaction_id,
            due_date,
        })
    }

    fn take_back(
        &mut self,
        member_id: &MemberId,
        book_id: &BookId,
        now: NaiveDateTime,
    ) -> Result<ReturnReceipt, LibraryError> {
        let member = self
            .members
            .get_mut(member_id)
            .ok_or(LibraryError::MemberNotFound)?;
        let book = self
            .catalog
            .get_mut(book_id)
            .ok_or(LibraryError::BookNotFound)?;

        let loan = book.loan().ok_or(LibraryError::BookNotBorrowed)?;
        if loan.borrowed_by() != member_id {
            return Err(LibraryError::WrongBorrower);
        }

        let days_overdue = loan.days_overdue(now);
        let fine = fine_for(days_overdue);
        let notes = if fine > Decimal::ZERO {
            "Returned late"
        } else {
            "Returned on time"
        };

        let transaction_id = self.log.next_id();
        self.log.push(Transaction::returned(
            transaction_id,
            member_id.clone(),
            book_id.clone(),
            now,
            loan.due_date(),
            fine,
            notes,
        ))?;

        member.add_fine(fine);
        member.remove_borrowed_book(book_id);
        book.take_back();

        Ok(ReturnReceipt {
            transaction_id,
            fine,
            days_overdue,
        })
    }

    fn pay_fine(
        &mut self,
        member_id: &MemberId,
        amount: Decimal,
        now: NaiveDateTime,
    ) -> Result<PaymentReceipt, LibraryError> {
        let member = self
            .members
            .get_mut(member_id)
            .ok_or(LibraryError::MemberNotFound)?;

        if amount <= Decimal::ZERO {
            return Err(LibraryError::InvalidAmount);
        }
        if amount > member.fine_amount() {
            return Err(LibraryError::PaymentExceedsFine);
        }

        let transaction_id = self.log.next_id();
        self.log.push(Transaction::fine_payment(
            transaction_id,
            member_id.clone(),
            now,
            amount,
        ))?;

        member.pay_fine(amount);

        Ok(PaymentReceipt {
            transaction_id,
            paid: amount,
            remaining: member.fine_amount(),
        })
    }
}

/// Library circulation engine.
///
/// # Invariants
///
/// - A book is on loan iff it has a borrower, a borrow date and a due date.
/// - A member never holds more books than their type allows.
/// - Fines are never negative; each late return adds at most
///   [`MAX_FINE_PER_BOOK`].
/// - Transaction ids are unique and increase in log order.
/// - Books on loan and members holding books cannot be removed.
pub struct Engine {
    state: Mutex<LibraryState>,
    clock: Arc<dyn Clock>,
}

impl Engine {
    /// Creates an empty engine on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Engine {
            state: Mutex::new(LibraryState::default()),
            clock,
        }
    }

    /// Rebuilds an engine from previously saved entities.
    ///
    /// # Errors
    ///
    /// - [`LibraryError::DuplicateBook`] / [`LibraryError::DuplicateMember`] -
    ///   Two records share an id.
    /// - [`LibraryError::DuplicateTransaction`] - Two log entries share an id.
    pub fn restore(
        books: impl IntoIterator<Item = Book>,
        members: impl IntoIterator<Item = Member>,
        transactions: impl IntoIterator<Item = Transaction>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LibraryError> {
        let mut state = LibraryState {
            log: TransactionLog::from_entries(transactions)?,
            ..LibraryState::default()
        };
        for book in books {
            state.catalog.add(book)?;
        }
        for member in members {
            state.members.add(member)?;
        }
        Ok(Engine {
            state: Mutex::new(state),
            clock,
        })
    }

    /// Current time according to the engine's clock.
    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    // === Catalog ===

    /// # Errors
    ///
    /// [`LibraryError::DuplicateBook`] if the id is taken.
    pub fn add_book(&self, book: Book) -> Result<(), LibraryError> {
        let id = book.id().clone();
        let result = self.state.lock().catalog.add(book);
        match &result {
            Ok(()) => info!(book = %id, "book added"),
            Err(e) => debug!(book = %id, reason = %e, "add book rejected"),
        }
        result
    }

    /// # Errors
    ///
    /// [`LibraryError::BookNotFound`] or [`LibraryError::BookOnLoan`].
    pub fn remove_book(&self, book_id: &BookId) -> Result<Book, LibraryError> {
        let result = self.state.lock().catalog.remove(book_id);
        match &result {
            Ok(_) => info!(book = %book_id, "book removed"),
            Err(e) => debug!(book = %book_id, reason = %e, "remove book rejected"),
        }
        result
    }

    pub fn book(&self, book_id: &BookId) -> Option<Book> {
        self.state.lock().catalog.get(book_id).cloned()
    }

    pub fn books(&self) -> Vec<Book> {
        self.state.lock().catalog.iter().cloned().collect()
    }

    pub fn available_books(&self) -> Vec<Book> {
        self.state.lock().catalog.available().cloned().collect()
    }

    pub fn search_books(&self, field: SearchField, query: &str) -> Vec<Book> {
        self.state
            .lock()
            .catalog
            .search(field, query)
            .cloned()
            .collect()
    }

    // === Membership ===

    /// # Errors
    ///
    /// [`LibraryError::DuplicateMember`] if the id is taken.
    pub fn add_member(&self, member: Member) -> Result<(), LibraryError> {
        let id = member.id().clone();
        let result = self.state.lock().members.add(member);
        match &result {
            Ok(()) => info!(member = %id, "member added"),
            Err(e) => debug!(member = %id, reason = %e, "add member rejected"),
        }
        result
    }

    /// # Errors
    ///
    /// [`LibraryError::MemberNotFound`] or [`LibraryError::MemberHasLoans`].
    pub fn remove_member(&self, member_id: &MemberId) -> Result<Member, LibraryError> {
        let result = self.state.lock().members.remove(member_id);
        match &result {
            Ok(_) => info!(member = %member_id, "member removed"),
            Err(e) => debug!(member = %member_id, reason = %e, "remove member rejected"),
        }
        result
    }

    /// # Errors
    ///
    /// [`LibraryError::MemberNotFound`] if there is no such member.
    pub fn set_member_active(
        &self,
        member_id: &MemberId,
        active: bool,
    ) -> Result<(), LibraryError> {
        self.state.lock().members.set_active(member_id, active)?;
        info!(member = %member_id, active, "member status changed");
        Ok(())
    }

    pub fn member(&self, member_id: &MemberId) -> Option<Member> {
        self.state.lock().members.get(member_id).cloned()
    }

    pub fn members(&self) -> Vec<Member> {
        self.state.lock().members.iter().cloned().collect()
    }

    // === Circulation ===

    /// Lends `book_id` to `member_id` for the member type's loan period.
    ///
    /// Checks, in order, stopping at the first failure:
    ///
    /// | Check | Error |
    /// |-------|-------|
    /// | member exists | [`LibraryError::MemberNotFound`] |
    /// | book exists | [`LibraryError::BookNotFound`] |
    /// | member is active | [`LibraryError::MemberInactive`] |
    /// | book is available | [`LibraryError::BookNotAvailable`] |
    /// | fine ≤ [`FINE_CEILING`] | [`LibraryError::FineLimitExceeded`] |
    /// | below the type's book limit | [`LibraryError::BookLimitReached`] |
    pub fn borrow_book(
        &self,
        member_id: &MemberId,
        book_id: &BookId,
    ) -> Result<BorrowReceipt, LibraryError> {
        let now = self.clock.now();
        let result = self.state.lock().borrow(member_id, book_id, now);
        match &result {
            Ok(receipt) => info!(
                member = %member_id,
                book = %book_id,
                transaction = %receipt.transaction_id,
                due = %receipt.due_date,
                "book borrowed"
            ),
            Err(e) => debug!(member = %member_id, book = %book_id, reason = %e, "borrow rejected"),
        }
        result
    }

    /// Takes `book_id` back from `member_id`, charging a fine when late.
    ///
    /// # Errors
    ///
    /// - [`LibraryError::MemberNotFound`] / [`LibraryError::BookNotFound`]
    /// - [`LibraryError::BookNotBorrowed`] - The book is on the shelf.
    /// - [`LibraryError::WrongBorrower`] - Someone else borrowed it.
    pub fn return_book(
        &self,
        member_id: &MemberId,
        book_id: &BookId,
    ) -> Result<ReturnReceipt, LibraryError> {
        let now = self.clock.now();
        let result = self.state.lock().take_back(member_id, book_id, now);
        match &result {
            Ok(receipt) => info!(
                member = %member_id,
                book = %book_id,
                transaction = %receipt.transaction_id,
                fine = %receipt.fine,
                days_overdue = receipt.days_overdue,
                "book returned"
            ),
            Err(e) => debug!(member = %member_id, book = %book_id, reason = %e, "return rejected"),
        }
        result
    }

    /// Records a payment of `amount` against the member's fine.
    ///
    /// # Errors
    ///
    /// - [`LibraryError::MemberNotFound`]
    /// - [`LibraryError::InvalidAmount`] - `amount` is not positive.
    /// - [`LibraryError::PaymentExceedsFine`] - Overpayment; nothing is applied.
    pub fn pay_fine(
        &self,
        member_id: &MemberId,
        amount: Decimal,
    ) -> Result<PaymentReceipt, LibraryError> {
        let now = self.clock.now();
        let result = self.state.lock().pay_fine(member_id, amount, now);
        match &result {
            Ok(receipt) => info!(
                member = %member_id,
                transaction = %receipt.transaction_id,
                paid = %receipt.paid,
                remaining = %receipt.remaining,
                "fine paid"
            ),
            Err(e) => debug!(
                member = %member_id,
                amount = %amount,
                reason = %e,
                "payment rejected"
            ),
        }
        result
    }

    // === Reports ===

    pub fn overdue_books(&self) -> Vec<Book> {
        let now = self.clock.now();
        self.state
            .lock()
            .catalog
            .iter()
            .filter(|book| book.is_overdue(now))
            .cloned()
            .collect()
    }

    pub fn members_with_fines(&self) -> Vec<Member> {
        self.state
            .lock()
            .members
            .iter()
            .filter(|member| member.has_pending_fines())
            .cloned()
            .collect()
    }

    /// Full transaction history, oldest first.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.state.lock().log.iter().cloned().collect()
    }

    pub fn member_transactions(&self, member_id: &MemberId) -> Vec<Transaction> {
        self.state
            .lock()
            .log
            .for_member(member_id)
            .cloned()
            .collect()
    }

    pub fn statistics(&self) -> Statistics {
        let state = self.state.lock();
        Statistics::collect(&state.catalog, &state.members)
    }

    pub fn statistics_report(&self) -> StatisticsReport {
        let now = self.clock.now();
        let state = self.state.lock();
        StatisticsReport::collect(&state.catalog, &state.members, now)
    }

    /// Consistent copy of every book, member and transaction.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.lock();
        Snapshot {
            books: state.catalog.iter().cloned().collect(),
            members: state.members.iter().cloned().collect(),
            transactions: state.log.iter().cloned().collect(),
        }
    }

    /// Adds the demo catalog (B001–B005) and members (M001–M003).
    ///
    /// Entries whose id already exists are skipped. Returns how many were added.
    pub fn seed_sample_data(&self) -> usize {
        let today = self.clock.now().date();
        let books = [
            ("B001", "The Great Gatsby", "F. Scott Fitzgerald", "978-0-7432-7356-5", "Fiction"),
            ("B002", "To Kill a Mockingbird", "Harper Lee", "978-0-06-112008-4", "Fiction"),
            ("B003", "1984", "George Orwell", "978-0-452-28423-4", "Dystopian"),
            ("B004", "Pride and Prejudice", "Jane Austen", "978-0-14-143951-8", "Romance"),
            ("B005", "The Catcher in the Rye", "J.D. Salinger", "978-0-316-76948-0", "Fiction"),
        ];
        let members = [
            (
                "M001",
                "John Doe",
                "john@email.com",
                "123-456-7890",
                "123 Main St",
                MemberType::Student,
            ),
            (
                "M002",
                "Jane Smith",
                "jane@email.com",
                "098-765-4321",
                "456 Oak Ave",
                MemberType::Faculty,
            ),
            (
                "M003",
                "Bob Johnson",
                "bob@email.com",
                "555-123-4567",
                "789 Pine Rd",
                MemberType::Staff,
            ),
        ];

        let mut state = self.state.lock();
        let mut added = 0;
        for (id, title, author, isbn, category) in books {
            added += usize::from(
                state
                    .catalog
                    .add(Book::new(id, title, author, isbn, category, today))
                    .is_ok(),
            );
        }
        for (id, name, email, phone, address, kind) in members {
            added += usize::from(
                state
                    .members
                    .add(Member::new(id, name, kind, today).with_contact(email, phone, address))
                    .is_ok(),
            );
        }
        info!(added, "sample data seeded");
        added
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
