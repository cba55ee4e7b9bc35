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

//! CSV files backing the engine.
//!
//! A data directory holds three files, each with a header row:
//!
//! ```csv
//! BookID,Title,Author,ISBN,Category,IsAvailable,DateAdded,BorrowedBy,BorrowDate,DueDate
//! B001,The Great Gatsby,F. Scott Fitzgerald,978-0-7432-7356-5,Fiction,false,2025-01-01,M001,2025-01-02 10:00:00,2025-01-16 10:00:00
//! ```
//!
//! ```csv
//! MemberID,Name,Email,Phone,Address,MemberType,RegistrationDate,BorrowedBooks,FineAmount,IsActive
//! M001,John Doe,john@email.com,123-456-7890,123 Main St,STUDENT,2025-01-01,B001;B003,6.00,true
//! ```
//!
//! ```csv
//! TransactionID,MemberID,BookID,Type,TransactionDate,DueDate,ReturnDate,FineAmount,Notes
//! TXN000001,M001,B001,BORROW,2025-01-02 10:00:00,2025-01-16 10:00:00,,0.00,
//! ```
//!
//! Dates are `YYYY-MM-DD`, timestamps `YYYY-MM-DD HH:MM:SS` (a bare date is
//! read as midnight). Fields containing a comma, quote or line break are
//! quoted with embedded quotes doubled. A missing file reads as empty.

use crate::base::{BookId, ID_LIST_SEPARATOR, MemberId, TransactionId};
use crate::book::{Book, Loan};
use crate::clock::Clock;
use crate::engine::Engine;
use crate::error::PersistenceError;
use crate::member::{Member, MemberType};
use crate::report::StatisticsReport;
use crate::transaction::{Transaction, TransactionKind};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, WriterBuilder};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const BOOKS_FILE: &str = "books.csv";
pub const MEMBERS_FILE: &str = "members.csv";
pub const TRANSACTIONS_FILE: &str = "transactions.csv";
pub const DATA_FILES: [&str; 3] = [BOOKS_FILE, MEMBERS_FILE, TRANSACTIONS_FILE];

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Separates ids inside the `BorrowedBooks` field.
pub const BORROWED_BOOKS_SEPARATOR: char = ID_LIST_SEPARATOR;

const BOOK_HEADERS: [&str; 10] = [
    "BookID",
    "Title",
    "Author",
    "ISBN",
    "Category",
    "IsAvailable",
    "DateAdded",
    "BorrowedBy",
    "BorrowDate",
    "DueDate",
];

const MEMBER_HEADERS: [&str; 10] = [
    "MemberID",
    "Name",
    "Email",
    "Phone",
    "Address",
    "MemberType",
    "RegistrationDate",
    "BorrowedBooks",
    "FineAmount",
    "IsActive",
];

const TRANSACTION_HEADERS: [&str; 9] = [
    "TransactionID",
    "MemberID",
    "BookID",
    "Type",
    "TransactionDate",
    "DueDate",
    "ReturnDate",
    "FineAmount",
    "Notes",
];

// === Row formats ===

#[derive(Debug, Serialize, Deserialize)]
struct BookRecord {
    #[serde(rename = "BookID")]
    book_id: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Author")]
    author: String,
    #[serde(rename = "ISBN")]
    isbn: String,
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "IsAvailable")]
    is_available: bool,
    #[serde(rename = "DateAdded")]
    date_added: String,
    #[serde(rename = "BorrowedBy")]
    borrowed_by: Option<String>,
    #[serde(rename = "BorrowDate")]
    borrow_date: Option<String>,
    #[serde(rename = "DueDate")]
    due_date: Option<String>,
}

impl From<&Book> for BookRecord {
    fn from(book: &Book) -> Self {
        Self {
            book_id: book.id().to_string(),
            title: book.title().to_owned(),
            author: book.author().to_owned(),
            isbn: book.isbn().to_owned(),
            category: book.category().to_owned(),
            is_available: book.is_available(),
            date_added: book.date_added().format(DATE_FORMAT).to_string(),
            borrowed_by: book.borrowed_by().map(ToString::to_string),
            borrow_date: book.borrow_date().map(format_timestamp),
            due_date: book.due_date().map(format_timestamp),
        }
    }
}

impl TryFrom<BookRecord> for Book {
    type Error = String;

    fn try_from(record: BookRecord) -> Result<Self, Self::Error> {
        let loan = match (record.borrowed_by, record.borrow_date, record.due_date) {
            (None, None, None) => None,
            (Some(borrowed_by), Some(borrow_date), Some(due_date)) => Some(Loan::new(
                MemberId(borrowed_by),
                parse_timestamp(&borrow_date)?,
                parse_timestamp(&due_date)?,
            )),
            _ => {
                return Err(
                    "BorrowedBy, BorrowDate and DueDate must be all set or all empty".to_owned(),
                );
            }
        };
        if record.is_available == loan.is_some() {
            return Err(format!(
                "IsAvailable={} contradicts the loan fields",
                record.is_available
            ));
        }

        Ok(Book::new(
            record.book_id,
            record.title,
            record.author,
            record.isbn,
            record.category,
            parse_date(&record.date_added)?,
        )
        .with_loan(loan))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct MemberRecord {
    #[serde(rename = "MemberID")]
    member_id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Email")]
    email: String,
    #[serde(rename = "Phone")]
    phone: String,
    #[serde(rename = "Address")]
    address: String,
    #[serde(rename = "MemberType")]
    member_type: String,
    #[serde(rename = "RegistrationDate")]
    registration_date: String,
    #[serde(rename = "BorrowedBooks")]
    borrowed_books: String,
    #[serde(rename = "FineAmount")]
    fine_amount: String,
    #[serde(rename = "IsActive")]
    is_active: bool,
}

impl From<&Member> for MemberRecord {
    fn from(member: &Member) -> Self {
        let separator = BORROWED_BOOKS_SEPARATOR.to_string();
        Self {
            member_id: member.id().to_string(),
            name: member.name().to_owned(),
            email: member.email().to_owned(),
            phone: member.phone_number().to_owned(),
            address: member.address().to_owned(),
            member_type: member.member_type().to_string(),
            registration_date: member.registration_date().format(DATE_FORMAT).to_string(),
            borrowed_books: member
                .borrowed_books()
                .iter()
                .map(|id| id.0.as_str())
                .collect::<Vec<_>>()
                .join(separator.as_str()),
            fine_amount: format_amount(member.fine_amount()),
            is_active: member.is_active(),
        }
    }
}

impl TryFrom<MemberRecord> for Member {
    type Error = String;

    fn try_from(record: MemberRecord) -> Result<Self, Self::Error> {
        let member_type = MemberType::from_str(&record.member_type).map_err(|e| e.to_string())?;
        let borrowed_books: Vec<BookId> = record
            .borrowed_books
            .split(BORROWED_BOOKS_SEPARATOR)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(BookId::from)
            .collect();
        if borrowed_books.len() > member_type.max_books_allowed() {
            return Err(format!(
                "{} borrowed books exceeds the {} limit of {}",
                borrowed_books.len(),
                member_type,
                member_type.max_books_allowed()
            ));
        }
        let fine_amount = parse_amount(&record.fine_amount)?;
        if fine_amount < Decimal::ZERO {
            return Err(format!("negative fine amount {fine_amount}"));
        }

        Ok(Member::new(
            record.member_id,
            record.name,
            member_type,
            parse_date(&record.registration_date)?,
        )
        .with_contact(record.email, record.phone, record.address)
        .restore(borrowed_books, fine_amount, record.is_active))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TransactionRecord {
    #[serde(rename = "TransactionID")]
    transaction_id: String,
    #[serde(rename = "MemberID")]
    member_id: String,
    #[serde(rename = "BookID")]
    book_id: Option<String>,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "TransactionDate")]
    transaction_date: String,
    #[serde(rename = "DueDate")]
    due_date: Option<String>,
    #[serde(rename = "ReturnDate")]
    return_date: Option<String>,
    #[serde(rename = "FineAmount")]
    fine_amount: String,
    #[serde(rename = "Notes")]
    notes: String,
}

impl From<&Transaction> for TransactionRecord {
    fn from(transaction: &Transaction) -> Self {
        Self {
            transaction_id: transaction.id().to_string(),
            member_id: transaction.member_id().to_string(),
            book_id: transaction.book_id().map(ToString::to_string),
            kind: transaction.kind().to_string(),
            transaction_date: format_timestamp(transaction.transaction_date()),
            due_date: transaction.due_date().map(format_timestamp),
            return_date: transaction.return_date().map(format_timestamp),
            fine_amount: format_amount(transaction.fine_amount()),
            notes: transaction.notes().to_owned(),
        }
    }
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = String;

    fn try_from(record: TransactionRecord) -> Result<Self, Self::Error> {
        let id = TransactionId::from_str(&record.transaction_id).map_err(|e| e.to_string())?;
        let kind = TransactionKind::from_str(&record.kind).map_err(|e| e.to_string())?;
        Ok(Transaction::from_parts(
            id,
            MemberId(record.member_id),
            record.book_id.map(BookId),
            kind,
            parse_timestamp(&record.transaction_date)?,
            record.due_date.as_deref().map(parse_timestamp).transpose()?,
            record.return_date.as_deref().map(parse_timestamp).transpose()?,
            parse_amount(&record.fine_amount)?,
            record.notes,
        ))
    }
}

// === Field codecs ===

fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| format!("invalid date {value:?}: {e}"))
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime, String> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| {
            NaiveDate::parse_from_str(value, DATE_FORMAT).map(|d| d.and_time(NaiveTime::MIN))
        })
        .map_err(|e| format!("invalid timestamp {value:?}: {e}"))
}

/// At least two decimals, more if the amount carries them.
fn format_amount(value: Decimal) -> String {
    let mut value = value.normalize();
    if value.scale() < 2 {
        value.rescale(2);
    }
    value.to_string()
}

fn parse_amount(value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|e| format!("invalid amount {value:?}: {e}"))
}

// === Data directory ===

/// A directory of CSV files holding one library.
#[derive(Debug, Clone)]
pub struct DataStore {
    dir: PathBuf,
}

impl DataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&self) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir).map_err(|e| PersistenceError::io(&self.dir, e))
    }

    /// # Errors
    ///
    /// I/O or CSV failures, and rows whose fields do not parse or whose
    /// availability flag disagrees with the loan fields.
    pub fn load_books(&self) -> Result<Vec<Book>, PersistenceError> {
        self.read_rows::<BookRecord, _>(BOOKS_FILE)
    }

    /// # Errors
    ///
    /// I/O or CSV failures, and rows with an unknown member type, a bad date
    /// or amount, or more borrowed books than the type allows.
    pub fn load_members(&self) -> Result<Vec<Member>, PersistenceError> {
        self.read_rows::<MemberRecord, _>(MEMBERS_FILE)
    }

    /// # Errors
    ///
    /// I/O or CSV failures, and rows with a bad id, type, timestamp or amount.
    pub fn load_transactions(&self) -> Result<Vec<Transaction>, PersistenceError> {
        self.read_rows::<TransactionRecord, _>(TRANSACTIONS_FILE)
    }

    pub fn save_books<'a>(
        &self,
        books: impl IntoIterator<Item = &'a Book>,
    ) -> Result<(), PersistenceError> {
        let staged = self.stage_books(books)?;
        self.commit([(BOOKS_FILE, staged)])
    }

    pub fn save_members<'a>(
        &self,
        members: impl IntoIterator<Item = &'a Member>,
    ) -> Result<(), PersistenceError> {
        let staged = self.stage_members(members)?;
        self.commit([(MEMBERS_FILE, staged)])
    }

    pub fn save_transactions<'a>(
        &self,
        transactions: impl IntoIterator<Item = &'a Transaction>,
    ) -> Result<(), PersistenceError> {
        let staged = self.stage_transactions(transactions)?;
        self.commit([(TRANSACTIONS_FILE, staged)])
    }

    /// Loads all three files into a fresh engine.
    ///
    /// # Errors
    ///
    /// Any load failure, or [`PersistenceError::Conflict`] when two rows
    /// share an id.
    pub fn load(&self, clock: Arc<dyn Clock>) -> Result<Engine, PersistenceError> {
        let books = self.load_books()?;
        let members = self.load_members()?;
        let transactions = self.load_transactions()?;
        info!(
            dir = %self.dir.display(),
            books = books.len(),
            members = members.len(),
            transactions = transactions.len(),
            "library loaded"
        );
        Ok(Engine::restore(books, members, transactions, clock)?)
    }

    /// Writes the engine's current state to all three files.
    ///
    /// Every file is written in full to a temporary file first; the data
    /// files are only replaced once all three were written.
    pub fn save(&self, engine: &Engine) -> Result<(), PersistenceError> {
        let mut snapshot = engine.snapshot();
        snapshot.books.sort_by(|a, b| a.id().cmp(b.id()));
        snapshot.members.sort_by(|a, b| a.id().cmp(b.id()));

        let staged = [
            (BOOKS_FILE, self.stage_books(&snapshot.books)?),
            (MEMBERS_FILE, self.stage_members(&snapshot.members)?),
            (TRANSACTIONS_FILE, self.stage_transactions(&snapshot.transactions)?),
        ];
        self.commit(staged)?;
        info!(
            dir = %self.dir.display(),
            books = snapshot.books.len(),
            members = snapshot.members.len(),
            transactions = snapshot.transactions.len(),
            "library saved"
        );
        Ok(())
    }

    /// Copies every existing data file into `backup_<YYYYmmdd_HHMMSS>/`.
    ///
    /// Returns the backup directory.
    pub fn create_backup(&self, now: NaiveDateTime) -> Result<PathBuf, PersistenceError> {
        let backup_dir = self
            .dir
            .join(format!("backup_{}", now.format(FILE_STAMP_FORMAT)));
        fs::create_dir_all(&backup_dir).map_err(|e| PersistenceError::io(&backup_dir, e))?;

        for file in DATA_FILES {
            let source = self.dir.join(file);
            if !source.exists() {
                continue;
            }
            let target = backup_dir.join(file);
            fs::copy(&source, &target).map_err(|e| PersistenceError::io(&target, e))?;
        }
        info!(dir = %backup_dir.display(), "backup created");
        Ok(backup_dir)
    }

    /// Writes the rendered report to `library_statistics_<YYYYmmdd_HHMMSS>.txt`.
    ///
    /// Returns the file written.
    pub fn export_statistics(
        &self,
        report: &StatisticsReport,
    ) -> Result<PathBuf, PersistenceError> {
        self.ensure_dir()?;
        let path = self.dir.join(format!(
            "library_statistics_{}.txt",
            report.generated_at.format(FILE_STAMP_FORMAT)
        ));
        fs::write(&path, report.to_string()).map_err(|e| PersistenceError::io(&path, e))?;
        info!(path = %path.display(), "statistics exported");
        Ok(path)
    }

    /// Combined size in bytes of the data files that exist. See
    /// [`format_file_size`] for display.
    pub fn data_size(&self) -> u64 {
        DATA_FILES
            .iter()
            .filter_map(|file| fs::metadata(self.dir.join(file)).ok())
            .map(|meta| meta.len())
            .sum()
    }

    fn read_rows<R, T>(&self, file: &str) -> Result<Vec<T>, PersistenceError>
    where
        R: DeserializeOwned,
        T: TryFrom<R, Error = String>,
    {
        let path = self.dir.join(file);
        let handle = match File::open(&path) {
            Ok(handle) => handle,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no data file, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(PersistenceError::io(path, e)),
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(BufReader::new(handle));

        let mut rows = Vec::new();
        for (index, result) in reader.deserialize::<R>().enumerate() {
            let record = result.map_err(|e| PersistenceError::csv(&path, e))?;
            let row = T::try_from(record).map_err(|reason| PersistenceError::Malformed {
                path: path.clone(),
                row: index + 1,
                reason,
            })?;
            rows.push(row);
        }
        debug!(path = %path.display(), rows = rows.len(), "data file read");
        Ok(rows)
    }

    fn stage_books<'a>(
        &self,
        books: impl IntoIterator<Item = &'a Book>,
    ) -> Result<NamedTempFile, PersistenceError> {
        let rows = books.into_iter().map(BookRecord::from);
        self.stage_rows(BOOKS_FILE, &BOOK_HEADERS, rows)
    }

    fn stage_members<'a>(
        &self,
        members: impl IntoIterator<Item = &'a Member>,
    ) -> Result<NamedTempFile, PersistenceError> {
        let rows = members.into_iter().map(MemberRecord::from);
        self.stage_rows(MEMBERS_FILE, &MEMBER_HEADERS, rows)
    }

    fn stage_transactions<'a>(
        &self,
        transactions: impl IntoIterator<Item = &'a Transaction>,
    ) -> Result<NamedTempFile, PersistenceError> {
        let rows = transactions.into_iter().map(TransactionRecord::from);
        self.stage_rows(TRANSACTIONS_FILE, &TRANSACTION_HEADERS, rows)
    }

    /// Writes `file`'s header and rows to a temporary file in the data
    /// directory. Dropping the result discards it.
    fn stage_rows<R: Serialize>(
        &self,
        file: &str,
        headers: &[&str],
        rows: impl Iterator<Item = R>,
    ) -> Result<NamedTempFile, PersistenceError> {
        self.ensure_dir()?;
        let path = self.dir.join(file);
        let staged =
            NamedTempFile::new_in(&self.dir).map_err(|e| PersistenceError::io(&path, e))?;

        let mut count = 0usize;
        {
            let mut writer = WriterBuilder::new()
                .has_headers(false)
                .from_writer(staged.as_file());
            writer
                .write_record(headers)
                .map_err(|e| PersistenceError::csv(&path, e))?;
            for row in rows {
                writer
                    .serialize(row)
                    .map_err(|e| PersistenceError::csv(&path, e))?;
                count += 1;
            }
            writer.flush().map_err(|e| PersistenceError::io(&path, e))?;
        }
        debug!(path = %path.display(), rows = count, "data file staged");
        Ok(staged)
    }

    /// Renames staged files over their data files.
    fn commit<const N: usize>(
        &self,
        staged: [(&str, NamedTempFile); N],
    ) -> Result<(), PersistenceError> {
        for (file, temp) in staged {
            let path = self.dir.join(file);
            temp.persist(&path).map_err(|e| PersistenceError::io(&path, e.error))?;
            debug!(path = %path.display(), "data file replaced");
        }
        Ok(())
    }
}

/// Renders a byte count as `B`, `KB`, `MB` or `GB` with one decimal.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match bytes {
        b if b < KB => format!("{b} B"),
        b if b < MB => format!("{:.1} KB", b as f64 / KB as f64),
        b if b < GB => format!("{:.1} MB", b as f64 / MB as f64),
        b => format!("{:.1} GB", b as f64 / GB as f64),
    }
}
