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

//! Book catalog keyed by [`BookId`].

use crate::LibraryError;
use crate::base::BookId;
use crate::book::{Book, SearchField};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// In-memory catalog. Listing order is unspecified.
#[derive(Debug, Default)]
pub struct Catalog {
    books: HashMap<BookId, Book>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a book under its id.
    ///
    /// # Errors
    ///
    /// - [`LibraryError::InvalidId`] - The id could not be stored and reloaded.
    /// - [`LibraryError::DuplicateBook`] - The id is taken.
    pub fn add(&mut self, book: Book) -> Result<(), LibraryError> {
        if !book.id().is_valid() {
            return Err(LibraryError::InvalidId);
        }
        match self.books.entry(book.id().clone()) {
            Entry::Occupied(_) => Err(LibraryError::DuplicateBook),
            Entry::Vacant(entry) => {
                entry.insert(book);
                Ok(())
            }
        }
    }

    /// Removes an available book.
    ///
    /// # Errors
    ///
    /// - [`LibraryError::BookNotFound`] - No such book.
    /// - [`LibraryError::BookOnLoan`] - The book is out.
    pub fn remove(&mut self, id: &BookId) -> Result<Book, LibraryError> {
        let book = self.books.get(id).ok_or(LibraryError::BookNotFound)?;
        if !book.is_available() {
            return Err(LibraryError::BookOnLoan);
        }
        self.books.remove(id).ok_or(LibraryError::BookNotFound)
    }

    pub fn get(&self, id: &BookId) -> Option<&Book> {
        self.books.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &BookId) -> Option<&mut Book> {
        self.books.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn available(&self) -> impl Iterator<Item = &Book> {
        self.iter().filter(|book| book.is_available())
    }

    pub fn search<'a>(
        &'a self,
        field: SearchField,
        query: &'a str,
    ) -> impl Iterator<Item = &'a Book> + 'a {
        self.iter().filter(move |book| book.matches(field, query))
    }
}
