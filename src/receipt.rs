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

//! Successful circulation outcomes.
//!
//! Each receipt's `Display` output is the message shown at the desk.

use crate::base::TransactionId;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowReceipt {
    pub transaction_id: TransactionId,
    pub due_date: NaiveDateTime,
}

impl fmt::Display for BorrowReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Book borrowed successfully! Due date: {}",
            self.due_date.date()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnReceipt {
    pub transaction_id: TransactionId,
    /// Fine charged for this return, zero when on time.
    pub fine: Decimal,
    pub days_overdue: i64,
}

impl ReturnReceipt {
    pub fn is_late(&self) -> bool {
        self.fine > Decimal::ZERO
    }
}

impl fmt::Display for ReturnReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Book returned successfully!")?;
        if self.is_late() {
            write!(
                f,
                " Fine of ${:.2} applied for {} days overdue.",
                self.fine, self.days_overdue
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub transaction_id: TransactionId,
    pub paid: Decimal,
    pub remaining: Decimal,
}

impl fmt::Display for PaymentReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Fine payment of ${:.2} successful! Remaining fine: ${:.2}",
            self.paid, self.remaining
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn borrow_message_shows_due_day() {
        let receipt = BorrowReceipt {
            transaction_id: TransactionId(1),
            due_date: NaiveDate::from_ymd_opt(2025, 1, 15)
                .unwrap()
                .and_hms_opt(16, 45, 0)
                .unwrap(),
        };
        assert_eq!(
            receipt.to_string(),
            "Book borrowed successfully! Due date: 2025-01-15"
        );
    }

    #[test]
    fn on_time_return_message() {
        let receipt = ReturnReceipt {
            transaction_id: TransactionId(2),
            fine: Decimal::ZERO,
            days_overdue: 0,
        };
        assert_eq!(receipt.to_string(), "Book returned successfully!");
    }

    #[test]
    fn late_return_message_shows_fine_and_days() {
        let receipt = ReturnReceipt {
            transaction_id: TransactionId(2),
            fine: dec!(6),
            days_overdue: 6,
        };
        assert_eq!(
            receipt.to_string(),
            "Book returned successfully! Fine of $6.00 applied for 6 days overdue."
        );
    }

    #[test]
    fn payment_message_shows_remaining() {
        let receipt = PaymentReceipt {
            transaction_id: TransactionId(3),
            paid: dec!(2.5),
            remaining: dec!(3.5),
        };
        assert_eq!(
            receipt.to_string(),
            "Fine payment of $2.50 successful! Remaining fine: $3.50"
        );
    }
}
