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

//! Read-only projections over the catalog and membership.
//!
//! Everything here borrows the stores immutably and returns owned values.

use crate::base::{BookId, MemberId};
use crate::catalog::Catalog;
use crate::membership::Membership;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

pub const REPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Headline counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total_books: usize,
    pub available_books: usize,
    pub borrowed_books: usize,
    pub total_members: usize,
    pub active_members: usize,
}

impl Statistics {
    pub fn collect(catalog: &Catalog, members: &Membership) -> Self {
        let available_books = catalog.available().count();
        Self {
            total_books: catalog.len(),
            available_books,
            borrowed_books: catalog.len() - available_books,
            total_members: members.len(),
            active_members: members.iter().filter(|m| m.is_active()).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverdueBook {
    pub book_id: BookId,
    pub title: String,
    pub borrowed_by: MemberId,
    pub due_date: NaiveDateTime,
    pub days_overdue: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutstandingFine {
    pub member_id: MemberId,
    pub name: String,
    pub fine_amount: Decimal,
}

/// Full statistics report: counts, overdue loans and unpaid fines.
///
/// Rows are sorted by id. `Display` renders the plain-text document that
/// `DataStore::export_statistics` writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatisticsReport {
    pub generated_at: NaiveDateTime,
    pub statistics: Statistics,
    pub overdue_books: Vec<OverdueBook>,
    pub members_with_fines: Vec<OutstandingFine>,
    pub total_outstanding_fines: Decimal,
}

impl StatisticsReport {
    pub fn collect(catalog: &Catalog, members: &Membership, now: NaiveDateTime) -> Self {
        let mut overdue_books: Vec<_> = catalog
            .iter()
            .filter_map(|book| {
                let loan = book.loan().filter(|loan| loan.is_overdue(now))?;
                Some(OverdueBook {
                    book_id: book.id().clone(),
                    title: book.title().to_owned(),
                    borrowed_by: loan.borrowed_by().clone(),
                    due_date: loan.due_date(),
                    days_overdue: loan.days_overdue(now),
                })
            })
            .collect();
        overdue_books.sort_by(|a, b| a.book_id.cmp(&b.book_id));

        let mut members_with_fines: Vec<_> = members
            .iter()
            .filter(|member| member.has_pending_fines())
            .map(|member| OutstandingFine {
                member_id: member.id().clone(),
                name: member.name().to_owned(),
                fine_amount: member.fine_amount(),
            })
            .collect();
        members_with_fines.sort_by(|a, b| a.member_id.cmp(&b.member_id));

        let total_outstanding_fines = members_with_fines.iter().map(|m| m.fine_amount).sum();

        Self {
            generated_at: now,
            statistics: Statistics::collect(catalog, members),
            overdue_books,
            members_with_fines,
            total_outstanding_fines,
        }
    }
}

impl fmt::Display for StatisticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.statistics;
        writeln!(f, "LIBRARY MANAGEMENT SYSTEM - STATISTICS REPORT")?;
        writeln!(
            f,
            "Generated on: {}",
            self.generated_at.format(REPORT_TIMESTAMP_FORMAT)
        )?;
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f)?;

        writeln!(f, "BASIC STATISTICS:")?;
        writeln!(f, "{}", "-".repeat(20))?;
        writeln!(f, "Total Books: {}", stats.total_books)?;
        writeln!(f, "Available Books: {}", stats.available_books)?;
        writeln!(f, "Borrowed Books: {}", stats.borrowed_books)?;
        writeln!(f, "Total Members: {}", stats.total_members)?;
        writeln!(f, "Active Members: {}", stats.active_members)?;
        writeln!(f)?;

        writeln!(f, "OVERDUE BOOKS ({}):", self.overdue_books.len())?;
        writeln!(f, "{}", "-".repeat(25))?;
        if self.overdue_books.is_empty() {
            writeln!(f, "No overdue books found.")?;
        }
        for book in &self.overdue_books {
            writeln!(
                f,
                "Book ID: {}, Title: {}, Borrowed By: {}, Days Overdue: {}",
                book.book_id, book.title, book.borrowed_by, book.days_overdue
            )?;
        }
        writeln!(f)?;

        writeln!(f, "MEMBERS WITH FINES ({}):", self.members_with_fines.len())?;
        writeln!(f, "{}", "-".repeat(30))?;
        if self.members_with_fines.is_empty() {
            return writeln!(f, "No members with fines found.");
        }
        for member in &self.members_with_fines {
            writeln!(
                f,
                "Member ID: {}, Name: {}, Fine Amount: ${:.2}",
                member.member_id, member.name, member.fine_amount
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "Total Outstanding Fines: ${:.2}",
            self.total_outstanding_fines
        )
    }
}
