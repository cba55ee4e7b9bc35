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

//! Circulation history records.
//!
//! A [`Transaction`] is fully formed by one of its constructors and never
//! changes afterwards.

use crate::base::{BookId, MemberId, TransactionId};
use crate::book::days_past;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Borrow,
    Return,
    Renew,
    FinePaid,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 4] = [Self::Borrow, Self::Return, Self::Renew, Self::FinePaid];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Borrow => "BORROW",
            Self::Return => "RETURN",
            Self::Renew => "RENEW",
            Self::FinePaid => "FINE_PAID",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transaction type: {0:?}")]
pub struct ParseTransactionKindError(pub String);

impl FromStr for TransactionKind {
    type Err = ParseTransactionKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| ParseTransactionKindError(s.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    id: TransactionId,
    member_id: MemberId,
    book_id: Option<BookId>,
    kind: TransactionKind,
    transaction_date: NaiveDateTime,
    due_date: Option<NaiveDateTime>,
    return_date: Option<NaiveDateTime>,
    fine_amount: Decimal,
    notes: String,
}

impl Transaction {
    /// A book leaving the desk, due back at `due_date`.
    pub fn borrow(
        id: TransactionId,
        member_id: MemberId,
        book_id: BookId,
        at: NaiveDateTime,
        due_date: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            member_id,
            book_id: Some(book_id),
            kind: TransactionKind::Borrow,
            transaction_date: at,
            due_date: Some(due_date),
            return_date: None,
            fine_amount: Decimal::ZERO,
            notes: String::new(),
        }
    }

    /// A book coming back, with the fine charged for it (zero if on time).
    pub fn returned(
        id: TransactionId,
        member_id: MemberId,
        book_id: BookId,
        at: NaiveDateTime,
        due_date: NaiveDateTime,
        fine_amount: Decimal,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            id,
            member_id,
            book_id: Some(book_id),
            kind: TransactionKind::Return,
            transaction_date: at,
            due_date: Some(due_date),
            return_date: Some(at),
            fine_amount,
            notes: notes.into(),
        }
    }

    /// A payment against a member's outstanding fine.
    pub fn fine_payment(
        id: TransactionId,
        member_id: MemberId,
        at: NaiveDateTime,
        amount: Decimal,
    ) -> Self {
        Self {
            id,
            member_id,
            book_id: None,
            kind: TransactionKind::FinePaid,
            transaction_date: at,
            due_date: None,
            return_date: None,
            fine_amount: amount,
            notes: "Fine payment".to_owned(),
        }
    }

    /// Rebuilds a record from every stored field.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id: TransactionId,
        member_id: MemberId,
        book_id: Option<BookId>,
        kind: TransactionKind,
        transaction_date: NaiveDateTime,
        due_date: Option<NaiveDateTime>,
        return_date: Option<NaiveDateTime>,
        fine_amount: Decimal,
        notes: String,
    ) -> Self {
        Self {
            id,
            member_id,
            book_id,
            kind,
            transaction_date,
            due_date,
            return_date,
            fine_amount,
            notes,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn member_id(&self) -> &MemberId {
        &self.member_id
    }

    pub fn book_id(&self) -> Option<&BookId> {
        self.book_id.as_ref()
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn transaction_date(&self) -> NaiveDateTime {
        self.transaction_date
    }

    pub fn due_date(&self) -> Option<NaiveDateTime> {
        self.due_date
    }

    pub fn return_date(&self) -> Option<NaiveDateTime> {
        self.return_date
    }

    /// Fine charged (returns) or paid (fine payments).
    pub fn fine_amount(&self) -> Decimal {
        self.fine_amount
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// True for a record with a due date, no return date, and `now` past due.
    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        match (self.due_date, self.return_date) {
            (Some(due), None) => now > due,
            _ => false,
        }
    }

    /// Whole days late: up to `now` while outstanding, up to the return once returned.
    pub fn days_overdue(&self, now: NaiveDateTime) -> i64 {
        match (self.due_date, self.return_date) {
            (Some(due), None) => days_past(due, now),
            (Some(due), Some(returned)) => days_past(due, returned),
            _ => 0,
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transaction{{ID='{}', Member='{}', Book='{}', Type='{}', Date='{}', Fine=${:.2}}}",
            self.id,
            self.member_id,
            self.book_id.as_ref().map_or("", |id| id.0.as_str()),
            self.kind,
            self.transaction_date.date(),
            self.fine_amount
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use rust_decimal_macros::dec;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 2, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn borrow_record_is_overdue_after_due_date() {
        let tx = Transaction::borrow(
            TransactionId(1),
            MemberId::from("M001"),
            BookId::from("B001"),
            at(1),
            at(15),
        );
        assert_eq!(tx.kind(), TransactionKind::Borrow);
        assert!(!tx.is_overdue(at(15)));
        assert!(tx.is_overdue(at(16)));
        assert_eq!(tx.days_overdue(at(18) + Duration::hours(8)), 3);
    }

    #[test]
    fn return_record_counts_days_to_return() {
        let tx = Transaction::returned(
            TransactionId(2),
            MemberId::from("M001"),
            BookId::from("B001"),
            at(20),
            at(15),
            dec!(5.00),
            "Returned late",
        );
        assert_eq!(tx.return_date(), Some(at(20)));
        assert!(!tx.is_overdue(at(28)));
        assert_eq!(tx.days_overdue(at(28)), 5);
    }

    #[test]
    fn fine_payment_has_no_book() {
        let tx =
            Transaction::fine_payment(TransactionId(3), MemberId::from("M001"), at(2), dec!(2.50));
        assert_eq!(tx.kind(), TransactionKind::FinePaid);
        assert!(tx.book_id().is_none());
        assert_eq!(tx.fine_amount(), dec!(2.50));
        assert_eq!(tx.notes(), "Fine payment");
        assert_eq!(tx.days_overdue(at(28)), 0);
    }

    #[test]
    fn kind_round_trips_through_text() {
        for kind in TransactionKind::ALL {
            assert_eq!(kind.as_str().parse::<TransactionKind>(), Ok(kind));
        }
        assert!("LOST".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn display_uses_date_only() {
        let tx =
            Transaction::fine_payment(TransactionId(7), MemberId::from("M002"), at(3), dec!(1));
        assert_eq!(
            tx.to_string(),
            "Transaction{ID='TXN000007', Member='M002', Book='', Type='FINE_PAID', Date='2025-02-03', Fine=$1.00}"
        );
    }
}
