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

use clap::{Parser, Subcommand, ValueEnum};
use library_ledger_rs::persistence::format_file_size;
use library_ledger_rs::{
    Book, BookId, DataStore, Engine, Member, MemberId, MemberType, PersistenceError,
    SearchField, SystemClock,
};
use rust_decimal::Decimal;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Library Ledger - Run a lending library from the command line
///
/// Each invocation loads the CSV files in the data directory, performs one
/// operation, prints the outcome, and saves if anything changed.
#[derive(Parser, Debug)]
#[command(name = "library-ledger-rs")]
#[command(about = "Catalog, membership and circulation for a lending library", long_about = None)]
struct Args {
    /// Directory holding books.csv, members.csv and transactions.csv
    #[arg(long, value_name = "DIR", env = "LIBRARY_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add the sample books and members
    Seed,
    /// List every book
    Books,
    /// List books on the shelf
    Available,
    /// List every member
    Members,
    /// Catalog a new book
    AddBook {
        id: String,
        title: String,
        author: String,
        isbn: String,
        category: String,
    },
    /// Remove a book that is not on loan
    RemoveBook { id: String },
    /// Register a new member
    AddMember {
        id: String,
        name: String,
        #[arg(value_enum)]
        member_type: MemberTypeArg,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        address: String,
    },
    /// Remove a member holding no books
    RemoveMember { id: String },
    /// Re-enable a member account
    Activate { id: String },
    /// Disable a member account
    Deactivate { id: String },
    /// Case-insensitive catalog search
    Search {
        query: String,
        #[arg(long, value_enum, default_value_t = SearchFieldArg::Any)]
        by: SearchFieldArg,
    },
    /// Lend a book to a member
    Borrow { member: String, book: String },
    /// Take a book back from its borrower
    Return { member: String, book: String },
    /// Pay part or all of a member's fine
    PayFine {
        member: String,
        #[arg(allow_negative_numbers = true)]
        amount: Decimal,
    },
    /// List overdue books
    Overdue,
    /// List members with outstanding fines
    Fines,
    /// Show transaction history, optionally for one member
    History {
        #[arg(long)]
        member: Option<String>,
    },
    /// Show counts and the full statistics report
    Stats,
    /// Copy the data files into a timestamped backup directory
    Backup,
    /// Write the statistics report to a timestamped text file
    ExportStats,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MemberTypeArg {
    Student,
    Faculty,
    Staff,
}

impl From<MemberTypeArg> for MemberType {
    fn from(value: MemberTypeArg) -> Self {
        match value {
            MemberTypeArg::Student => MemberType::Student,
            MemberTypeArg::Faculty => MemberType::Faculty,
            MemberTypeArg::Staff => MemberType::Staff,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SearchFieldArg {
    Title,
    Author,
    Category,
    Isbn,
    Any,
}

impl From<SearchFieldArg> for SearchField {
    fn from(value: SearchFieldArg) -> Self {
        match value {
            SearchFieldArg::Title => SearchField::Title,
            SearchFieldArg::Author => SearchField::Author,
            SearchFieldArg::Category => SearchField::Category,
            SearchFieldArg::Isbn => SearchField::Isbn,
            SearchFieldArg::Any => SearchField::Any,
        }
    }
}

fn main() {
    let args = Args::parse();

    // Logs go to stderr so stdout carries only command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let store = DataStore::new(&args.data_dir);
    let engine = match store.load(Arc::new(SystemClock)) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error loading library from '{}': {}", args.data_dir.display(), e);
            process::exit(1);
        }
    };

    let mut stdout = std::io::stdout().lock();
    let outcome = match run(&engine, &store, args.command, &mut stdout) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if outcome == Outcome::Changed {
        if let Err(e) = store.save(&engine) {
            eprintln!("Error saving library: {}", e);
            process::exit(1);
        }
    }
}

/// Whether a command modified the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Changed,
    Unchanged,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Runs one command against the engine, writing human-readable output.
///
/// Rule violations (unknown member, book on loan, ...) are printed as the
/// outcome and are not errors; only I/O failures are.
fn run<W: Write>(
    engine: &Engine,
    store: &DataStore,
    command: Command,
    out: &mut W,
) -> Result<Outcome, CliError> {
    let outcome = match command {
        Command::Seed => {
            let added = engine.seed_sample_data();
            writeln!(out, "Sample data loaded ({added} new records).")?;
            if added > 0 {
                Outcome::Changed
            } else {
                Outcome::Unchanged
            }
        }
        Command::Books => {
            write_books(out, engine.books())?;
            Outcome::Unchanged
        }
        Command::Available => {
            write_books(out, engine.available_books())?;
            Outcome::Unchanged
        }
        Command::Members => {
            let mut members = engine.members();
            members.sort_by(|a, b| a.id().cmp(b.id()));
            for member in &members {
                writeln!(out, "{member}")?;
            }
            Outcome::Unchanged
        }
        Command::AddBook {
            id,
            title,
            author,
            isbn,
            category,
        } => {
            let today = engine.now().date();
            let result = engine.add_book(Book::new(id, title, author, isbn, category, today));
            report(out, result.map(|()| "Book added successfully!"))?
        }
        Command::RemoveBook { id } => {
            let result = engine.remove_book(&BookId::from(id));
            report(out, result.map(|_| "Book removed successfully!"))?
        }
        Command::AddMember {
            id,
            name,
            member_type,
            email,
            phone,
            address,
        } => {
            let today = engine.now().date();
            let member = Member::new(id, name, member_type.into(), today)
                .with_contact(email, phone, address);
            report(out, engine.add_member(member).map(|()| "Member added successfully!"))?
        }
        Command::RemoveMember { id } => {
            let result = engine.remove_member(&MemberId::from(id));
            report(out, result.map(|_| "Member removed successfully!"))?
        }
        Command::Activate { id } => {
            let result = engine.set_member_active(&MemberId::from(id), true);
            report(out, result.map(|()| "Member activated."))?
        }
        Command::Deactivate { id } => {
            let result = engine.set_member_active(&MemberId::from(id), false);
            report(out, result.map(|()| "Member deactivated."))?
        }
        Command::Search { query, by } => {
            write_books(out, engine.search_books(by.into(), &query))?;
            Outcome::Unchanged
        }
        Command::Borrow { member, book } => {
            let result = engine.borrow_book(&MemberId::from(member), &BookId::from(book));
            report(out, result)?
        }
        Command::Return { member, book } => {
            let result = engine.return_book(&MemberId::from(member), &BookId::from(book));
            report(out, result)?
        }
        Command::PayFine { member, amount } => {
            let result = engine.pay_fine(&MemberId::from(member), amount);
            report(out, result)?
        }
        Command::Overdue => {
            let now = engine.now();
            let mut books = engine.overdue_books();
            books.sort_by(|a, b| a.id().cmp(b.id()));
            if books.is_empty() {
                writeln!(out, "No overdue books found.")?;
            }
            for book in &books {
                writeln!(
                    out,
                    "{} - {} (borrowed by {}, {} days overdue)",
                    book.id(),
                    book.title(),
                    book.borrowed_by().map_or("?", |id| id.0.as_str()),
                    book.days_overdue(now)
                )?;
            }
            Outcome::Unchanged
        }
        Command::Fines => {
            let mut members = engine.members_with_fines();
            members.sort_by(|a, b| a.id().cmp(b.id()));
            if members.is_empty() {
                writeln!(out, "No members with fines found.")?;
            }
            for member in &members {
                writeln!(out, "{} - {}: ${:.2}", member.id(), member.name(), member.fine_amount())?;
            }
            Outcome::Unchanged
        }
        Command::History { member } => {
            let transactions = match member {
                Some(id) => engine.member_transactions(&MemberId::from(id)),
                None => engine.transactions(),
            };
            if transactions.is_empty() {
                writeln!(out, "No transactions found.")?;
            }
            for transaction in &transactions {
                writeln!(out, "{transaction}")?;
            }
            Outcome::Unchanged
        }
        Command::Stats => {
            write!(out, "{}", engine.statistics_report())?;
            writeln!(out)?;
            writeln!(out, "Data size: {}", format_file_size(store.data_size()))?;
            Outcome::Unchanged
        }
        Command::Backup => {
            let dir = store.create_backup(engine.now())?;
            writeln!(out, "Backup created successfully at: {}", dir.display())?;
            Outcome::Unchanged
        }
        Command::ExportStats => {
            let path = store.export_statistics(&engine.statistics_report())?;
            writeln!(out, "Statistics exported to: {}", path.display())?;
            Outcome::Unchanged
        }
    };
    Ok(outcome)
}

/// Prints a circulation or store outcome verbatim.
fn report<W: Write, T: std::fmt::Display, E: std::fmt::Display>(
    out: &mut W,
    result: Result<T, E>,
) -> Result<Outcome, CliError> {
    match result {
        Ok(message) => {
            writeln!(out, "{message}")?;
            Ok(Outcome::Changed)
        }
        Err(message) => {
            writeln!(out, "{message}")?;
            Ok(Outcome::Unchanged)
        }
    }
}

fn write_books<W: Write>(out: &mut W, mut books: Vec<Book>) -> std::io::Result<()> {
    books.sort_by(|a, b| a.id().cmp(b.id()));
    if books.is_empty() {
        writeln!(out, "No books found.")?;
    }
    for book in &books {
        writeln!(out, "{book}")?;
    }
    Ok(())
}
