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

//! Error types for circulation and persistence.
//!
//! [`LibraryError`] covers rule violations. Every variant is recoverable and
//! its display text is the message shown to the person at the desk.
//! [`PersistenceError`] covers the data files.

use std::path::PathBuf;
use thiserror::Error;

/// Circulation and store rule violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    /// No member with the requested id
    #[error("Member not found!")]
    MemberNotFound,

    /// No book with the requested id
    #[error("Book not found!")]
    BookNotFound,

    /// A book with the same id is already catalogued
    #[error("Book already exists!")]
    DuplicateBook,

    /// A member with the same id is already registered
    #[error("Member already exists!")]
    DuplicateMember,

    /// Id is empty, padded with whitespace, or contains `;`
    #[error("Invalid ID!")]
    InvalidId,

    /// Member account has been deactivated
    #[error("Member account is inactive!")]
    MemberInactive,

    /// Book is out on loan
    #[error("Book is not available!")]
    BookNotAvailable,

    /// Outstanding fines are above the borrowing ceiling
    #[error("Member cannot borrow books (fine exceeds limit or account issues)!")]
    FineLimitExceeded,

    /// Member already holds as many books as their type allows
    #[error("Member has reached maximum book limit!")]
    BookLimitReached,

    /// Return requested for a book that is on the shelf
    #[error("Book is not currently borrowed!")]
    BookNotBorrowed,

    /// Return requested by someone other than the borrower on record
    #[error("This book was not borrowed by this member!")]
    WrongBorrower,

    /// Payment is zero or negative
    #[error("Invalid payment amount!")]
    InvalidAmount,

    /// Payment is larger than the outstanding fine
    #[error("Payment amount exceeds fine amount!")]
    PaymentExceedsFine,

    /// Borrowed books cannot be removed from the catalog
    #[error("Cannot remove a book that is currently borrowed!")]
    BookOnLoan,

    /// Members holding books cannot be removed
    #[error("Cannot remove a member with borrowed books!")]
    MemberHasLoans,

    /// Transaction id already present in the log
    #[error("Duplicate transaction ID!")]
    DuplicateTransaction,
}

/// Failures reading or writing the data files.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A row parsed as CSV but its contents make no sense.
    #[error("malformed record {row} in {path}: {reason}")]
    Malformed {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    /// Loaded rows violate a store rule (e.g. two books with the same id).
    #[error("inconsistent data: {0}")]
    Conflict(#[from] LibraryError),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
