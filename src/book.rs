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

//! Catalogued books.
//!
//! A book is either on the shelf or out on a [`Loan`]:
//!
//! ```text
//!  Available ──borrow──► On loan ──return──► Available
//!                           │
//!                           └── overdue while now > due date (derived, not stored)
//! ```
//!
//! The borrower, borrow date and due date live together in one optional
//! [`Loan`], so they are always all present or all absent.

use crate::base::{BookId, MemberId};
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// Borrowing state of a book that is out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    borrowed_by: MemberId,
    borrow_date: NaiveDateTime,
    due_date: NaiveDateTime,
}

impl Loan {
    pub fn new(borrowed_by: MemberId, borrow_date: NaiveDateTime, due_date: NaiveDateTime) -> Self {
        Self {
            borrowed_by,
            borrow_date,
            due_date,
        }
    }

    pub fn borrowed_by(&self) -> &MemberId {
        &self.borrowed_by
    }

    pub fn borrow_date(&self) -> NaiveDateTime {
        self.borrow_date
    }

    pub fn due_date(&self) -> NaiveDateTime {
        self.due_date
    }

    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        now > self.due_date
    }

    /// Whole days elapsed since the due date, floored; zero when not overdue.
    pub fn days_overdue(&self, now: NaiveDateTime) -> i64 {
        days_past(self.due_date, now)
    }
}

/// Whole days from `due` to `now`, or zero if `now` is not past `due`.
pub(crate) fn days_past(due: NaiveDateTime, now: NaiveDateTime) -> i64 {
    if now > due {
        (now - due).num_days()
    } else {
        0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    id: BookId,
    title: String,
    author: String,
    isbn: String,
    category: String,
    date_added: NaiveDate,
    loan: Option<Loan>,
}

impl Book {
    /// Creates an available book.
    pub fn new(
        id: impl Into<BookId>,
        title: impl Into<String>,
        author: impl Into<String>,
        isbn: impl Into<String>,
        category: impl Into<String>,
        date_added: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            isbn: isbn.into(),
            category: category.into(),
            date_added,
            loan: None,
        }
    }

    /// Rebuilds a book with its saved loan state.
    pub(crate) fn with_loan(mut self, loan: Option<Loan>) -> Self {
        self.loan = loan;
        self
    }

    pub fn id(&self) -> &BookId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn date_added(&self) -> NaiveDate {
        self.date_added
    }

    pub fn is_available(&self) -> bool {
        self.loan.is_none()
    }

    pub fn loan(&self) -> Option<&Loan> {
        self.loan.as_ref()
    }

    pub fn borrowed_by(&self) -> Option<&MemberId> {
        self.loan.as_ref().map(Loan::borrowed_by)
    }

    pub fn borrow_date(&self) -> Option<NaiveDateTime> {
        self.loan.as_ref().map(Loan::borrow_date)
    }

    pub fn due_date(&self) -> Option<NaiveDateTime> {
        self.loan.as_ref().map(Loan::due_date)
    }

    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        self.loan.as_ref().is_some_and(|loan| loan.is_overdue(now))
    }

    pub fn days_overdue(&self, now: NaiveDateTime) -> i64 {
        self.loan.as_ref().map_or(0, |loan| loan.days_overdue(now))
    }

    /// Case-insensitive substring match on the given field.
    pub fn matches(&self, field: SearchField, query: &str) -> bool {
        let query = query.to_lowercase();
        let contains = |value: &str| value.to_lowercase().contains(&query);
        match field {
            SearchField::Title => contains(&self.title),
            SearchField::Author => contains(&self.author),
            SearchField::Category => contains(&self.category),
            SearchField::Isbn => contains(&self.isbn),
            SearchField::Any => {
                contains(&self.title)
                    || contains(&self.author)
                    || contains(&self.category)
                    || contains(&self.isbn)
            }
        }
    }

    pub(crate) fn lend(&mut self, loan: Loan) {
        debug_assert!(
            self.loan.is_none(),
            "Invariant violated: book {} lent while on loan",
            self.id
        );
        self.loan = Some(loan);
    }

    /// Puts the book back on the shelf, returning the loan it was out on.
    pub(crate) fn take_back(&mut self) -> Option<Loan> {
        self.loan.take()
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Book{{ID='{}', Title='{}', Author='{}', Category='{}', Available={}}}",
            self.id,
            self.title,
            self.author,
            self.category,
            self.is_available()
        )
    }
}

/// Book field a catalog search looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchField {
    Title,
    Author,
    Category,
    Isbn,
    /// Title, author, category or ISBN.
    #[default]
    Any,
}
