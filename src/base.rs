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

//! Core identifier types for books, members and transactions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Joins ids stored together in one field, so it may not appear inside an id.
pub const ID_LIST_SEPARATOR: char = ';';

/// Non-empty, no surrounding whitespace, no [`ID_LIST_SEPARATOR`].
fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.trim() == id && !id.contains(ID_LIST_SEPARATOR)
}

/// Catalog key of a book, e.g. `B001`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct BookId(pub String);

impl BookId {
    /// Whether the id survives being stored in a member's borrowed list.
    pub fn is_valid(&self) -> bool {
        is_valid_id(&self.0)
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for BookId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Membership key of a library member, e.g. `M001`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn is_valid(&self) -> bool {
        is_valid_id(&self.0)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for MemberId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Sequential identifier of a circulation transaction.
///
/// Displayed as `TXN` followed by the sequence number zero-padded to six
/// digits (`TXN000001`). Sequences wider than six digits are printed in full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(pub u32);

impl TransactionId {
    pub const PREFIX: &'static str = "TXN";

    pub fn sequence(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:06}", Self::PREFIX, self.0)
    }
}

/// Error returned when a string is not a `TXNnnnnnn` identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transaction id: {0:?}")]
pub struct ParseTransactionIdError(pub String);

impl FromStr for TransactionId {
    type Err = ParseTransactionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(Self::PREFIX)
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse().ok())
            .map(TransactionId)
            .ok_or_else(|| ParseTransactionIdError(s.to_owned()))
    }
}

impl TryFrom<String> for TransactionId {
    type Error = ParseTransactionIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TransactionId> for String {
    fn from(value: TransactionId) -> Self {
        value.to_string()
    }
}
