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

//! Append-only transaction log with deduplication.
//!
//! Owns the id sequence, so ids are unique and increase in insertion order.

use crate::LibraryError;
use crate::base::{MemberId, TransactionId};
use crate::transaction::Transaction;
use std::collections::HashSet;

/// An append-only transaction log with duplicate detection.
///
/// Combines a [`HashSet`] for O(1) duplicate checking with a [`Vec`]
/// preserving insertion order.
#[derive(Debug)]
pub struct TransactionLog {
    entries: Vec<Transaction>,
    ids: HashSet<TransactionId>,
    /// Sequence handed out by the next call to [`TransactionLog::next_id`].
    next_sequence: u32,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            ids: HashSet::new(),
            next_sequence: 1,
        }
    }

    /// Rebuilds a log from saved history, continuing after the highest id seen.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::DuplicateTransaction`] if two entries share an id.
    pub fn from_entries(
        entries: impl IntoIterator<Item = Transaction>,
    ) -> Result<Self, LibraryError> {
        let mut log = Self::new();
        for transaction in entries {
            log.push(transaction)?;
        }
        Ok(log)
    }

    /// Id for the next record. Does not reserve it; [`push`](Self::push) does.
    pub fn next_id(&self) -> TransactionId {
        TransactionId(self.next_sequence)
    }

    /// Appends a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::DuplicateTransaction`] if a transaction
    /// with the same ID already exists in the log.
    pub fn push(&mut self, transaction: Transaction) -> Result<(), LibraryError> {
        let transaction_id = transaction.id();
        if !self.ids.insert(transaction_id) {
            return Err(LibraryError::DuplicateTransaction);
        }
        self.next_sequence = self
            .next_sequence
            .max(transaction_id.sequence().saturating_add(1));
        self.entries.push(transaction);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.entries.iter()
    }

    /// Entries belonging to one member, oldest first.
    pub fn for_member<'a>(
        &'a self,
        member_id: &'a MemberId,
    ) -> impl Iterator<Item = &'a Transaction> + 'a {
        self.entries
            .iter()
            .filter(move |transaction| transaction.member_id() == member_id)
    }
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self::new()
    }
}
