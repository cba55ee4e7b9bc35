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

//! CSV persistence integration tests against a temporary data directory.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use library_ledger_rs::persistence::{BOOKS_FILE, MEMBERS_FILE, TRANSACTIONS_FILE};
use library_ledger_rs::{
    Book, BookId, DataStore, Engine, LibraryError, ManualClock, Member, MemberId, MemberType,
    PersistenceError, TransactionKind,
};
use rust_decimal_macros::dec;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 1)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap()
}

fn make_store() -> (TempDir, DataStore, Arc<ManualClock>) {
    let dir = tempfile::tempdir().unwrap();
    let store = DataStore::new(dir.path());
    (dir, store, Arc::new(ManualClock::new(start())))
}

/// Seeded engine with one late return, one open loan and one payment.
fn make_busy_engine(clock: Arc<ManualClock>) -> Engine {
    let engine = Engine::with_clock(clock.clone());
    engine.seed_sample_data();
    let (m001, m002) = (MemberId::from("M001"), MemberId::from("M002"));

    engine.borrow_book(&m001, &BookId::from("B001")).unwrap();
    clock.advance(Duration::days(17));
    engine.return_book(&m001, &BookId::from("B001")).unwrap();
    engine.pay_fine(&m001, dec!(1.50)).unwrap();
    engine.borrow_book(&m002, &BookId::from("B002")).unwrap();
    engine
}

// === Round trips ===

#[test]
fn save_then_load_restores_everything() {
    let (_dir, store, clock) = make_store();
    let engine = make_busy_engine(clock.clone());
    store.save(&engine).unwrap();

    let reloaded = store.load(clock).unwrap();

    let mut before = engine.snapshot();
    let mut after = reloaded.snapshot();
    for snapshot in [&mut before, &mut after] {
        snapshot.books.sort_by(|a, b| a.id().cmp(b.id()));
        snapshot.members.sort_by(|a, b| a.id().cmp(b.id()));
    }
    assert_eq!(before.books, after.books);
    assert_eq!(before.members, after.members);
    assert_eq!(before.transactions, after.transactions);

    let m001 = reloaded.member(&MemberId::from("M001")).unwrap();
    assert_eq!(m001.fine_amount(), dec!(1.50));
    let b002 = reloaded.book(&BookId::from("B002")).unwrap();
    assert_eq!(b002.borrowed_by(), Some(&MemberId::from("M002")));
}

#[test]
fn reloaded_engine_continues_transaction_numbering() {
    let (_dir, store, clock) = make_store();
    let engine = make_busy_engine(clock.clone());
    store.save(&engine).unwrap();

    let reloaded = store.load(clock).unwrap();
    let receipt = reloaded
        .return_book(&MemberId::from("M002"), &BookId::from("B002"))
        .unwrap();
    assert_eq!(receipt.transaction_id.to_string(), "TXN000005");
}

#[test]
fn text_with_commas_quotes_and_newlines_survives() {
    let (_dir, store, clock) = make_store();
    let engine = Engine::with_clock(clock.clone());
    engine
        .add_book(Book::new(
            "B100",
            "Crime, and \"Punishment\"",
            "Fyodor Dostoevsky",
            "978-0-14-044913-6",
            "Classics\nRussian",
            start().date(),
        ))
        .unwrap();
    engine
        .add_member(
            Member::new("M100", "O'Brien, Pat", MemberType::Staff, start().date())
                .with_contact("pat@example.com", "", "1 Elm St, Apt 2"),
        )
        .unwrap();
    store.save(&engine).unwrap();

    let reloaded = store.load(clock).unwrap();
    let book = reloaded.book(&BookId::from("B100")).unwrap();
    assert_eq!(book.title(), "Crime, and \"Punishment\"");
    assert_eq!(book.category(), "Classics\nRussian");
    let member = reloaded.member(&MemberId::from("M100")).unwrap();
    assert_eq!(member.name(), "O'Brien, Pat");
    assert_eq!(member.address(), "1 Elm St, Apt 2");
    assert_eq!(member.phone_number(), "");
}

// === File layout ===

#[test]
fn files_have_header_rows() {
    let (dir, store, clock) = make_store();
    store.save(&make_busy_engine(clock)).unwrap();

    let first_line = |file: &str| {
        fs::read_to_string(dir.path().join(file))
            .unwrap()
            .lines()
            .next()
            .unwrap()
            .to_owned()
    };
    assert_eq!(
        first_line(BOOKS_FILE),
        "BookID,Title,Author,ISBN,Category,IsAvailable,DateAdded,BorrowedBy,BorrowDate,DueDate"
    );
    assert_eq!(
        first_line(MEMBERS_FILE),
        "MemberID,Name,Email,Phone,Address,MemberType,RegistrationDate,BorrowedBooks,FineAmount,IsActive"
    );
    assert_eq!(
        first_line(TRANSACTIONS_FILE),
        "TransactionID,MemberID,BookID,Type,TransactionDate,DueDate,ReturnDate,FineAmount,Notes"
    );
}

#[test]
fn fine_payment_row_has_empty_optional_fields() {
    let (dir, store, clock) = make_store();
    store.save(&make_busy_engine(clock)).unwrap();

    let text = fs::read_to_string(dir.path().join(TRANSACTIONS_FILE)).unwrap();
    let payment = text
        .lines()
        .find(|line| line.contains("FINE_PAID"))
        .unwrap();
    assert_eq!(
        payment,
        "TXN000003,M001,,FINE_PAID,2025-03-18 08:30:00,,,1.50,Fine payment"
    );
}

#[test]
fn missing_files_load_as_empty_library() {
    let (_dir, store, clock) = make_store();
    let engine = store.load(clock).unwrap();
    assert!(engine.books().is_empty());
    assert!(engine.members().is_empty());
    assert!(engine.transactions().is_empty());
    assert_eq!(store.data_size(), 0);
}

#[test]
fn hand_written_files_load() {
    let (dir, store, clock) = make_store();
    fs::write(
        dir.path().join(BOOKS_FILE),
        "BookID,Title,Author,ISBN,Category,IsAvailable,DateAdded,BorrowedBy,BorrowDate,DueDate\n\
         B001,Dune,Frank Herbert,978-0-441-01359-3,SciFi,false,2025-01-01,M001,2025-02-01,2025-02-15\n",
    )
    .unwrap();
    fs::write(
        dir.path().join(MEMBERS_FILE),
        "MemberID,Name,Email,Phone,Address,MemberType,RegistrationDate,BorrowedBooks,FineAmount,IsActive\n\
         M001,Ann,ann@example.com,,,student,2025-01-01,B001,2.5,true\n",
    )
    .unwrap();

    let engine = store.load(clock).unwrap();
    let book = engine.book(&BookId::from("B001")).unwrap();
    let due = NaiveDate::from_ymd_opt(2025, 2, 15).unwrap().and_hms_opt(0, 0, 0).unwrap();
    assert_eq!(book.due_date(), Some(due));
    let member = engine.member(&MemberId::from("M001")).unwrap();
    assert_eq!(member.member_type(), MemberType::Student);
    assert_eq!(member.fine_amount(), dec!(2.50));
    assert_eq!(member.borrowed_books(), &[BookId::from("B001")]);
}

#[test]
fn save_leaves_only_data_files() {
    let (dir, store, clock) = make_store();
    let engine = make_busy_engine(clock);
    store.save(&engine).unwrap();
    store.save(&engine).unwrap();

    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec![BOOKS_FILE, MEMBERS_FILE, TRANSACTIONS_FILE]);
}

// === Rejected data ===

#[test]
fn ids_that_would_not_reload_are_refused() {
    let (_dir, store, clock) = make_store();
    let engine = Engine::with_clock(clock.clone());
    engine.seed_sample_data();

    let shelf = |id: &str| Book::new(id, "Dune", "Frank Herbert", "", "SciFi", start().date());
    for id in ["A;B;C;D", " B1", "B1 ", ""] {
        assert_eq!(engine.add_book(shelf(id)), Err(LibraryError::InvalidId), "{id:?}");
    }
    let member = Member::new("M1;M2", "Ann", MemberType::Student, start().date());
    assert_eq!(engine.add_member(member), Err(LibraryError::InvalidId));

    // Every loan that can be made survives a save and reload.
    engine.add_book(shelf("B1,2")).unwrap();
    engine.borrow_book(&MemberId::from("M001"), &BookId::from("B1,2")).unwrap();
    store.save(&engine).unwrap();

    let reloaded = store.load(clock).unwrap();
    assert_eq!(
        reloaded.member(&MemberId::from("M001")).unwrap().borrowed_books(),
        &[BookId::from("B1,2")]
    );
    reloaded
        .return_book(&MemberId::from("M001"), &BookId::from("B1,2"))
        .unwrap();
    assert!(reloaded.member(&MemberId::from("M001")).unwrap().borrowed_books().is_empty());
}

#[test]
fn padded_id_in_file_is_a_conflict() {
    let (dir, store, clock) = make_store();
    fs::write(
        dir.path().join(BOOKS_FILE),
        "BookID,Title,Author,ISBN,Category,IsAvailable,DateAdded,BorrowedBy,BorrowDate,DueDate\n\
         \" B1\",Dune,Frank Herbert,,SciFi,true,2025-01-01,,,\n",
    )
    .unwrap();

    match store.load(clock) {
        Err(PersistenceError::Conflict(e)) => assert_eq!(e, LibraryError::InvalidId),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("expected invalid id conflict"),
    }
}

#[test]
fn unknown_member_type_is_malformed() {
    let (dir, store, clock) = make_store();
    fs::write(
        dir.path().join(MEMBERS_FILE),
        "MemberID,Name,Email,Phone,Address,MemberType,RegistrationDate,BorrowedBooks,FineAmount,IsActive\n\
         M001,Ann,,,,STUDENT,2025-01-01,,0.00,true\n\
         M002,Bob,,,,VISITOR,2025-01-01,,0.00,true\n",
    )
    .unwrap();

    match store.load(clock) {
        Err(PersistenceError::Malformed { row, .. }) => assert_eq!(row, 2),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("expected malformed member row"),
    }
}

#[test]
fn partial_loan_fields_are_malformed() {
    let (dir, store, _clock) = make_store();
    fs::write(
        dir.path().join(BOOKS_FILE),
        "BookID,Title,Author,ISBN,Category,IsAvailable,DateAdded,BorrowedBy,BorrowDate,DueDate\n\
         B001,Dune,Frank Herbert,,SciFi,false,2025-01-01,M001,,\n",
    )
    .unwrap();

    let err = store.load_books().unwrap_err();
    assert!(matches!(err, PersistenceError::Malformed { row: 1, .. }));
    assert!(err.to_string().starts_with("malformed record 1 in "));
}

#[test]
fn duplicate_ids_are_a_conflict() {
    let (dir, store, clock) = make_store();
    fs::write(
        dir.path().join(BOOKS_FILE),
        "BookID,Title,Author,ISBN,Category,IsAvailable,DateAdded,BorrowedBy,BorrowDate,DueDate\n\
         B001,Dune,Frank Herbert,,SciFi,true,2025-01-01,,,\n\
         B001,Emma,Jane Austen,,Romance,true,2025-01-01,,,\n",
    )
    .unwrap();

    match store.load(clock) {
        Err(PersistenceError::Conflict(e)) => assert_eq!(e, LibraryError::DuplicateBook),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("expected duplicate book conflict"),
    }
}

// === Backups and exports ===

#[test]
fn backup_copies_data_files() {
    let (dir, store, clock) = make_store();
    let engine = make_busy_engine(clock);
    store.save(&engine).unwrap();

    let backup = store.create_backup(start()).unwrap();
    assert_eq!(backup, dir.path().join("backup_20250301_083000"));
    for file in [BOOKS_FILE, MEMBERS_FILE, TRANSACTIONS_FILE] {
        assert_eq!(
            fs::read(backup.join(file)).unwrap(),
            fs::read(dir.path().join(file)).unwrap()
        );
    }

    let restored = DataStore::new(&backup)
        .load(Arc::new(ManualClock::new(start())))
        .unwrap();
    assert_eq!(restored.transactions().len(), 4);
    assert_eq!(
        restored.transactions()[1].kind(),
        TransactionKind::Return
    );
}

#[test]
fn export_statistics_writes_report() {
    let (dir, store, clock) = make_store();
    let engine = make_busy_engine(clock);

    let path = store.export_statistics(&engine.statistics_report()).unwrap();
    assert_eq!(
        path,
        dir.path().join("library_statistics_20250318_083000.txt")
    );
    let text = fs::read_to_string(path).unwrap();
    assert!(text.contains("Total Books: 5"));
    assert!(text.contains("Total Outstanding Fines: $1.50"));
}

#[test]
fn data_size_counts_only_data_files() {
    let (dir, store, clock) = make_store();
    store.save(&make_busy_engine(clock)).unwrap();
    fs::write(dir.path().join("notes.txt"), "not library data").unwrap();

    let expected: u64 = [BOOKS_FILE, MEMBERS_FILE, TRANSACTIONS_FILE]
        .iter()
        .map(|file| fs::metadata(dir.path().join(file)).unwrap().len())
        .sum();
    assert_eq!(store.data_size(), expected);
    assert!(expected > 0);
}
