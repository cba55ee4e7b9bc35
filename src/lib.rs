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

//! # Library Ledger
//!
//! This library provides a circulation engine for a lending library: the
//! book catalog, the member registry, borrowing and returning, overdue fines,
//! and an append-only transaction history, persisted to flat CSV files.
//!
//! ## Core Components
//!
//! - [`Engine`]: Circulation desk owning catalog, members and history
//! - [`Book`] / [`Member`] / [`Transaction`]: Domain entities
//! - [`LibraryError`]: Rule violations, displayed verbatim to the user
//! - [`DataStore`]: CSV load/save, backups and report export
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::{Duration, NaiveDate};
//! use library_ledger_rs::{Book, BookId, Engine, ManualClock, Member, MemberId, MemberType};
//! use rust_decimal_macros::dec;
//!
//! let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
//! let clock = Arc::new(ManualClock::new(start));
//! let engine = Engine::with_clock(clock.clone());
//!
//! let book = Book::new(
//!     "B001", "1984", "George Orwell", "978-0-452-28423-4", "Dystopian", start.date(),
//! );
//! engine.add_book(book).unwrap();
//! engine.add_member(Member::new("M001", "John Doe", MemberType::Student, start.date())).unwrap();
//!
//! let (member, book) = (MemberId::from("M001"), BookId::from("B001"));
//! engine.borrow_book(&member, &book).unwrap();
//!
//! // Twenty days later: six days past the 14-day student loan.
//! clock.advance(Duration::days(20));
//! let receipt = engine.return_book(&member, &book).unwrap();
//! assert_eq!(receipt.fine, dec!(6.00));
//! assert_eq!(engine.member(&member).unwrap().fine_amount(), dec!(6.00));
//! ```
//!
//! ## Thread Safety
//!
//! The engine serializes every operation behind a single lock, so it can be
//! shared across threads while behaving exactly like a sequential desk.

mod base;
mod book;
mod catalog;
mod clock;
mod engine;
pub mod error;
mod member;
mod membership;
pub mod persistence;
mod receipt;
pub mod report;
mod transaction;
mod transaction_log;

pub use base::{BookId, MemberId, ParseTransactionIdError, TransactionId};
pub use book::{Book, Loan, SearchField};
pub use catalog::Catalog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Engine, FINE_CEILING, FINE_PER_DAY, MAX_FINE_PER_BOOK, Snapshot, fine_for};
pub use error::{LibraryError, PersistenceError};
pub use member::{BorrowPolicy, Member, MemberType, ParseMemberTypeError};
pub use membership::Membership;
pub use persistence::DataStore;
pub use receipt::{BorrowReceipt, PaymentReceipt, ReturnReceipt};
pub use report::{Statistics, StatisticsReport};
pub use transaction::{ParseTransactionKindError, Transaction, TransactionKind};
pub use transaction_log::TransactionLog;
