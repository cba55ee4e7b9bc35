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

//! Member registry keyed by [`MemberId`].

use crate::LibraryError;
use crate::base::MemberId;
use crate::member::Member;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

#[derive(Debug, Default)]
pub struct Membership {
    members: HashMap<MemberId, Member>,
}

impl Membership {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// - [`LibraryError::InvalidId`] - The id could not be stored and reloaded.
    /// - [`LibraryError::DuplicateMember`] - The id is taken.
    pub fn add(&mut self, member: Member) -> Result<(), LibraryError> {
        if !member.id().is_valid() {
            return Err(LibraryError::InvalidId);
        }
        match self.members.entry(member.id().clone()) {
            Entry::Occupied(_) => Err(LibraryError::DuplicateMember),
            Entry::Vacant(entry) => {
                entry.insert(member);
                Ok(())
            }
        }
    }

    /// Removes a member holding no books. Outstanding fines do not block removal.
    ///
    /// # Errors
    ///
    /// - [`LibraryError::MemberNotFound`] - No such member.
    /// - [`LibraryError::MemberHasLoans`] - The member still holds books.
    pub fn remove(&mut self, id: &MemberId) -> Result<Member, LibraryError> {
        let member = self.members.get(id).ok_or(LibraryError::MemberNotFound)?;
        if member.borrowed_books_count() > 0 {
            return Err(LibraryError::MemberHasLoans);
        }
        self.members.remove(id).ok_or(LibraryError::MemberNotFound)
    }

    pub fn get(&self, id: &MemberId) -> Option<&Member> {
        self.members.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &MemberId) -> Option<&mut Member> {
        self.members.get_mut(id)
    }

    /// # Errors
    ///
    /// [`LibraryError::MemberNotFound`] if there is no such member.
    pub fn set_active(&mut self, id: &MemberId, active: bool) -> Result<(), LibraryError> {
        self.members
            .get_mut(id)
            .ok_or(LibraryError::MemberNotFound)?
            .set_active(active);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
