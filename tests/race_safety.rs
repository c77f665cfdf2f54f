//! Concurrent writers racing for the same slot: one wins, the rest get
//! `Conflict`.

#![allow(clippy::panic)]

mod common;

use std::sync::Arc;

use common::{Harness, range};
use market_booking::clock::Clock;
use market_booking::domain::{BookingKind, SlotCapability, SlotId, SlotLock, UserId};
use market_booking::error::BookingError;
use market_booking::service::PeriodRequest;
use market_booking::store::DocumentStore;

const CONTENDERS: usize = 8;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_direct_creates_admit_exactly_one() {
    let h = Harness::new();
    let market = h.market(&[("S1", SlotCapability::Both)]).await;
    let service = Arc::new(h.service);

    let mut tasks = Vec::new();
    for i in 0..CONTENDERS {
        let service = Arc::clone(&service);
        let market_id = market.id;
        tasks.push(tokio::spawn(async move {
            let user = UserId::new(format!("user-{i}"));
            let period = PeriodRequest::Daily {
                from: Some(format!("2024-05-{:02}", 1 + i % 3)),
                to: Some("2024-05-05".to_string()),
            };
            service
                .create_booking_direct(&user, market_id, SlotId::from("S1"), &period)
                .await
        }));
    }

    let mut wins = 0;
    for task in tasks {
        let Ok(outcome) = task.await else {
            panic!("task joined");
        };
        match outcome {
            Ok(_) => wins += 1,
            Err(BookingError::Conflict(_)) => {}
            Err(other) => panic!("unexpected failure: {other}"),
        }
    }
    assert_eq!(wins, 1);

    let Ok(bookings) = service.bookings_by_market(market.id, true).await else {
        panic!("listing");
    };
    assert_eq!(bookings.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_confirms_of_overlapping_holds_admit_at_most_one() {
    let h = Harness::new();
    let market = h.market(&[("S1", SlotCapability::Both)]).await;
    let now = h.clock.now();

    // Overlapping live holds seeded directly.
    let alice = UserId::from("alice");
    let bob = UserId::from("bob");
    let a = SlotLock::new(
        market.id,
        SlotId::from("S1"),
        alice.clone(),
        range("2024-05-01", "2024-05-05"),
        now,
    );
    let b = SlotLock::new(
        market.id,
        SlotId::from("S1"),
        bob.clone(),
        range("2024-05-04", "2024-05-08"),
        now,
    );
    let Ok(mut tx) = h.store.begin().await else {
        panic!("begin");
    };
    let Ok(()) = tx.put_lock(a.clone()).await else {
        panic!("seed first hold");
    };
    let Ok(()) = tx.put_lock(b.clone()).await else {
        panic!("seed second hold");
    };
    let Ok(()) = tx.commit().await else {
        panic!("commit seed");
    };

    let service = Arc::new(h.service);
    let first = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .confirm_booking(&alice, &a.id, BookingKind::Daily, None)
                .await
        })
    };
    let second = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .confirm_booking(&bob, &b.id, BookingKind::Daily, None)
                .await
        })
    };
    let (Ok(first), Ok(second)) = (first.await, second.await) else {
        panic!("tasks joined");
    };

    let outcomes = [first, second];
    let wins = outcomes.iter().filter(|o| o.is_ok()).count();
    assert!(wins <= 1);
    for outcome in &outcomes {
        if let Err(err) = outcome {
            assert!(matches!(err, BookingError::Conflict(_)), "got {err}");
        }
    }
}
