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

//! Property-based tests for the circulation engine.
//!
//! These tests drive random sequences of operations through the engine and
//! check that the library stays consistent after every step.

use chrono::{Duration, NaiveDate};
use library_ledger_rs::{
    Book, BookId, Engine, ManualClock, Member, MemberId, MemberType, TransactionKind,
    MAX_FINE_PER_BOOK, fine_for,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

const BOOKS: usize = 8;
const MEMBERS: usize = 4;

// =============================================================================
// Arbitrary Strategies
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Borrow { member: usize, book: usize },
    Return { member: usize, book: usize },
    Pay { member: usize, cents: i64 },
    Wait { hours: i64 },
    Toggle { member: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..MEMBERS, 0..BOOKS).prop_map(|(member, book)| Op::Borrow { member, book }),
        3 => (0..MEMBERS, 0..BOOKS).prop_map(|(member, book)| Op::Return { member, book }),
        1 => (0..MEMBERS, -100i64..2_000).prop_map(|(member, cents)| Op::Pay { member, cents }),
        2 => (1i64..24 * 40).prop_map(|hours| Op::Wait { hours }),
        1 => (0..MEMBERS).prop_map(|member| Op::Toggle { member }),
    ]
}

fn arb_member_type() -> impl Strategy<Value = MemberType> {
    prop_oneof![
        Just(MemberType::Student),
        Just(MemberType::Faculty),
        Just(MemberType::Staff),
    ]
}

// =============================================================================
// Helpers
// =============================================================================

fn book_id(i: usize) -> BookId {
    BookId::from(format!("B{i:03}"))
}

fn member_id(i: usize) -> MemberId {
    MemberId::from(format!("M{i:03}"))
}

fn make_library(types: &[MemberType]) -> (Arc<ManualClock>, Engine) {
    let start = NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let engine = Engine::with_clock(clock.clone());
    for i in 0..BOOKS {
        engine
            .add_book(Book::new(
                book_id(i),
                format!("Book {i}"),
                "Author",
                "isbn",
                "General",
                start.date(),
            ))
            .unwrap();
    }
    for (i, member_type) in types.iter().enumerate() {
        engine
            .add_member(Member::new(
                member_id(i),
                format!("Member {i}"),
                *member_type,
                start.date(),
            ))
            .unwrap();
    }
    (clock, engine)
}

fn apply(clock: &ManualClock, engine: &Engine, op: &Op) {
    match *op {
        Op::Borrow { member, book } => {
            let _ = engine.borrow_book(&member_id(member), &book_id(book));
        }
        Op::Return { member, book } => {
            let _ = engine.return_book(&member_id(member), &book_id(book));
        }
        Op::Pay { member, cents } => {
            let _ = engine.pay_fine(&member_id(member), Decimal::new(cents, 2));
        }
        Op::Wait { hours } => clock.advance(Duration::hours(hours)),
        Op::Toggle { member } => {
            let id = member_id(member);
            let active = engine.member(&id).is_some_and(|m| m.is_active());
            engine.set_member_active(&id, !active).unwrap();
        }
    }
}

/// Books and members agree on who holds what.
fn assert_consistent(engine: &Engine) -> Result<(), TestCaseError> {
    let snapshot = engine.snapshot();
    let mut holders: HashMap<BookId, MemberId> = HashMap::new();

    for member in &snapshot.members {
        prop_assert!(member.borrowed_books_count() <= member.member_type().max_books_allowed());
        prop_assert!(member.fine_amount() >= Decimal::ZERO);
        for book in member.borrowed_books() {
            prop_assert!(holders.insert(book.clone(), member.id().clone()).is_none());
        }
    }
    for book in &snapshot.books {
        match book.loan() {
            Some(loan) => {
                prop_assert_eq!(holders.get(book.id()), Some(loan.borrowed_by()));
                prop_assert!(loan.due_date() > loan.borrow_date());
            }
            None => prop_assert!(!holders.contains_key(book.id())),
        }
    }
    Ok(())
}

// =============================================================================
// Engine Invariant Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Loans, limits and fines stay consistent after every operation.
    #[test]
    fn library_stays_consistent(
        types in prop::collection::vec(arb_member_type(), MEMBERS),
        ops in prop::collection::vec(arb_op(), 1..80),
    ) {
        let (clock, engine) = make_library(&types);
        for op in &ops {
            apply(&clock, &engine, op);
            assert_consistent(&engine)?;
        }
    }

    /// Every return charges between zero and the per-book cap.
    #[test]
    fn each_return_fine_is_capped(
        types in prop::collection::vec(arb_member_type(), MEMBERS),
        ops in prop::collection::vec(arb_op(), 1..80),
    ) {
        let (clock, engine) = make_library(&types);
        for op in &ops {
            apply(&clock, &engine, op);
        }

        for transaction in engine.transactions() {
            prop_assert!(transaction.fine_amount() >= Decimal::ZERO);
            if transaction.kind() == TransactionKind::Return {
                prop_assert!(transaction.fine_amount() <= MAX_FINE_PER_BOOK);
            }
        }
    }

    /// Transaction ids increase strictly in log order.
    #[test]
    fn transaction_ids_strictly_increase(
        types in prop::collection::vec(arb_member_type(), MEMBERS),
        ops in prop::collection::vec(arb_op(), 1..80),
    ) {
        let (clock, engine) = make_library(&types);
        for op in &ops {
            apply(&clock, &engine, op);
        }

        let ids: Vec<u32> = engine.transactions().iter().map(|t| t.id().sequence()).collect();
        prop_assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        if let Some(first) = ids.first() {
            prop_assert_eq!(*first, 1);
        }
    }

    /// Fines accrued minus payments equal the outstanding balances.
    #[test]
    fn fines_balance_against_the_log(
        types in prop::collection::vec(arb_member_type(), MEMBERS),
        ops in prop::collection::vec(arb_op(), 1..80),
    ) {
        let (clock, engine) = make_library(&types);
        for op in &ops {
            apply(&clock, &engine, op);
        }

        for member in engine.members() {
            let balance = engine
                .member_transactions(member.id())
                .iter()
                .fold(Decimal::ZERO, |acc, t| match t.kind() {
                    TransactionKind::Return => acc + t.fine_amount(),
                    TransactionKind::FinePaid => acc - t.fine_amount(),
                    _ => acc,
                });
            prop_assert_eq!(balance, member.fine_amount());
        }
    }

    /// Borrowing then returning leaves the book on the shelf and the member
    /// with one fewer loan, whatever the delay.
    #[test]
    fn borrow_then_return_restores_availability(
        member_type in arb_member_type(),
        hours in 0i64..24 * 120,
    ) {
        let (clock, engine) = make_library(&[member_type]);
        let (member, book) = (member_id(0), book_id(0));

        let borrowed = engine.borrow_book(&member, &book).unwrap();
        clock.advance(Duration::hours(hours));
        let returned = engine.return_book(&member, &book).unwrap();

        prop_assert!(engine.book(&book).unwrap().is_available());
        prop_assert_eq!(engine.member(&member).unwrap().borrowed_books_count(), 0);

        let expected_days = (engine.now() - borrowed.due_date).num_days().max(0);
        prop_assert_eq!(returned.days_overdue, expected_days);
        prop_assert_eq!(returned.fine, fine_for(expected_days));
    }
}

// =============================================================================
// Fine Schedule Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// The fine grows by one per day until it reaches the cap.
    #[test]
    fn fine_schedule_is_monotonic_and_capped(days in 0i64..10_000) {
        let fine = fine_for(days);
        prop_assert!(fine >= Decimal::ZERO);
        prop_assert!(fine <= MAX_FINE_PER_BOOK);
        prop_assert!(fine_for(days + 1) >= fine);
        if days <= 50 {
            prop_assert_eq!(fine, Decimal::from(days));
        }
    }
}
