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

//! Library members and their borrowing policy.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use library_ledger_rs::{Member, MemberType};
//! use rust_decimal_macros::dec;
//!
//! let registered = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
//! let member = Member::new("M001", "John Doe", MemberType::Student, registered);
//! assert!(member.can_borrow_more_books());
//! assert_eq!(member.fine_amount(), dec!(0.00));
//! assert_eq!(member.member_type().max_books_allowed(), 3);
//! ```

use crate::base::{BookId, MemberId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Member category; each carries a loan period and a concurrent-loan cap.
///
/// | Type    | Loan period | Max books |
/// |---------|-------------|-----------|
/// | STUDENT | 14 days     | 3         |
/// | FACULTY | 21 days     | 5         |
/// | STAFF   | 14 days     | 3         |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberType {
    Student,
    Faculty,
    Staff,
}

/// Loan policy attached to a [`MemberType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowPolicy {
    pub borrow_duration_days: i64,
    pub max_books_allowed: usize,
}

impl MemberType {
    pub const ALL: [MemberType; 3] = [Self::Student, Self::Faculty, Self::Staff];

    pub const fn policy(self) -> BorrowPolicy {
        match self {
            Self::Student | Self::Staff => BorrowPolicy {
                borrow_duration_days: 14,
                max_books_allowed: 3,
            },
            Self::Faculty => BorrowPolicy {
                borrow_duration_days: 21,
                max_books_allowed: 5,
            },
        }
    }

    pub const fn borrow_duration_days(self) -> i64 {
        self.policy().borrow_duration_days
    }

    pub const fn max_books_allowed(self) -> usize {
        self.policy().max_books_allowed
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "STUDENT",
            Self::Faculty => "FACULTY",
            Self::Staff => "STAFF",
        }
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown member type: {0:?}")]
pub struct ParseMemberTypeError(pub String);

impl FromStr for MemberType {
    type Err = ParseMemberTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseMemberTypeError(s.to_owned()))
    }
}

/// A registered library member.
///
/// The borrowed list and the fine are only changed through the engine, which
/// keeps `borrowed_books.len() <= max_books_allowed` and `fine_amount >= 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    id: MemberId,
    name: String,
    email: String,
    phone_number: String,
    address: String,
    member_type: MemberType,
    registration_date: NaiveDate,
    borrowed_books: Vec<BookId>,
    fine_amount: Decimal,
    active: bool,
}

impl Member {
    /// Creates an active member with no loans and no fines.
    pub fn new(
        id: impl Into<MemberId>,
        name: impl Into<String>,
        member_type: MemberType,
        registration_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: String::new(),
            phone_number: String::new(),
            address: String::new(),
            member_type,
            registration_date,
            borrowed_books: Vec::new(),
            fine_amount: Decimal::ZERO,
            active: true,
        }
    }

    /// Sets the contact fields.
    pub fn with_contact(
        mut self,
        email: impl Into<String>,
        phone_number: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        self.email = email.into();
        self.phone_number = phone_number.into();
        self.address = address.into();
        self
    }

    /// Rebuilds a member exactly as it was saved.
    pub(crate) fn restore(
        mut self,
        borrowed_books: Vec<BookId>,
        fine_amount: Decimal,
        active: bool,
    ) -> Self {
        self.borrowed_books = borrowed_books;
        self.fine_amount = fine_amount.max(Decimal::ZERO);
        self.active = active;
        self
    }

    pub fn id(&self) -> &MemberId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn member_type(&self) -> MemberType {
        self.member_type
    }

    pub fn registration_date(&self) -> NaiveDate {
        self.registration_date
    }

    /// Ids of the books currently on loan, in borrowing order.
    pub fn borrowed_books(&self) -> &[BookId] {
        &self.borrowed_books
    }

    pub fn borrowed_books_count(&self) -> usize {
        self.borrowed_books.len()
    }

    pub fn fine_amount(&self) -> Decimal {
        self.fine_amount
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn has_pending_fines(&self) -> bool {
        self.fine_amount > Decimal::ZERO
    }

    pub fn can_borrow_more_books(&self) -> bool {
        self.borrowed_books.len() < self.member_type.max_books_allowed()
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(crate) fn add_borrowed_book(&mut self, book_id: BookId) {
        debug_assert!(
            self.can_borrow_more_books(),
            "Invariant violated: {} is over the {} book limit",
            self.id,
            self.member_type.max_books_allowed()
        );
        self.borrowed_books.push(book_id);
    }

    pub(crate) fn remove_borrowed_book(&mut self, book_id: &BookId) {
        if let Some(position) = self.borrowed_books.iter().position(|id| id == book_id) {
            self.borrowed_books.remove(position);
        }
    }

    pub(crate) fn add_fine(&mut self, amount: Decimal) {
        self.fine_amount += amount;
    }

    /// Reduces the fine by `amount`, never below zero.
    pub(crate) fn pay_fine(&mut self, amount: Decimal) {
        self.fine_amount = (self.fine_amount - amount).max(Decimal::ZERO);
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Member{{ID='{}', Name='{}', Type='{}', Books Borrowed={}, Fine=${:.2}, Active={}}}",
            self.id,
            self.name,
            self.member_type,
            self.borrowed_books.len(),
            self.fine_amount,
            self.active
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn member(kind: MemberType) -> Member {
        Member::new(
            "M001",
            "John Doe",
            kind,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        )
    }

    #[test]
    fn policy_table() {
        assert_eq!(MemberType::Student.borrow_duration_days(), 14);
        assert_eq!(MemberType::Student.max_books_allowed(), 3);
        assert_eq!(MemberType::Faculty.borrow_duration_days(), 21);
        assert_eq!(MemberType::Faculty.max_books_allowed(), 5);
        assert_eq!(MemberType::Staff.borrow_duration_days(), 14);
        assert_eq!(MemberType::Staff.max_books_allowed(), 3);
    }

    #[test]
    fn member_type_parses_case_insensitively() {
        assert_eq!("FACULTY".parse::<MemberType>(), Ok(MemberType::Faculty));
        assert_eq!("staff".parse::<MemberType>(), Ok(MemberType::Staff));
        assert!("VISITOR".parse::<MemberType>().is_err());
    }

    #[test]
    fn borrowed_list_keeps_order_and_removes_by_id() {
        let mut m = member(MemberType::Faculty);
        for id in ["B001", "B002", "B003"] {
            m.add_borrowed_book(BookId::from(id));
        }
        m.remove_borrowed_book(&BookId::from("B002"));
        assert_eq!(
            m.borrowed_books(),
            &[BookId::from("B001"), BookId::from("B003")]
        );
        assert!(m.can_borrow_more_books());
    }

    #[test]
    fn limit_reached_at_max_books() {
        let mut m = member(MemberType::Student);
        for id in ["B001", "B002", "B003"] {
            m.add_borrowed_book(BookId::from(id));
        }
        assert!(!m.can_borrow_more_books());
    }

    #[test]
    fn pay_fine_floors_at_zero() {
        let mut m = member(MemberType::Staff);
        m.add_fine(dec!(4.00));
        m.pay_fine(dec!(10.00));
        assert_eq!(m.fine_amount(), Decimal::ZERO);
        assert!(!m.has_pending_fines());
    }

    #[test]
    fn display_summarises_member() {
        let mut m = member(MemberType::Student);
        m.add_fine(dec!(6));
        assert_eq!(
            m.to_string(),
            "Member{ID='M001', Name='John Doe', Type='STUDENT', Books Borrowed=0, Fine=$6.00, Active=true}"
        );
    }
}
