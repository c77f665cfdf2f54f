//! Property: whatever sequence of requests arrives, surviving bookings on
//! one slot never overlap.

#![allow(clippy::panic)]

mod common;

use chrono::{Days, NaiveDate};
use common::Harness;
use market_booking::domain::{Booking, SlotCapability, SlotId, UserId};
use market_booking::error::BookingError;
use market_booking::service::PeriodRequest;
use proptest::prelude::*;

fn day(offset: u64) -> String {
    let base = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_default();
    base.checked_add_days(Days::new(offset))
        .unwrap_or(base)
        .format("%Y-%m-%d")
        .to_string()
}

/// Runs every request through the engine in order; returns the listing.
fn run_requests(requests: &[(u64, u64, bool, bool)]) -> Vec<Booking> {
    tokio_test::block_on(async {
        let h = Harness::new();
        let market = h
            .market(&[("A1", SlotCapability::Both), ("A2", SlotCapability::Both)])
            .await;
        for (n, &(start, len, second_slot, cancel)) in requests.iter().enumerate() {
            let user = UserId::new(format!("user-{n}"));
            let slot = if second_slot { "A2" } else { "A1" };
            let period = PeriodRequest::Daily {
                from: Some(day(start)),
                to: Some(day(start + len)),
            };
            match h
                .service
                .create_booking_direct(&user, market.id, SlotId::from(slot), &period)
                .await
            {
                Ok(booking) if cancel => {
                    let Ok(_) = h.service.cancel_booking(&user, booking.id).await else {
                        panic!("requester cancels a pending booking");
                    };
                }
                Ok(_) | Err(BookingError::Conflict(_)) => {}
                Err(other) => panic!("unexpected failure: {other}"),
            }
        }
        let Ok(bookings) = h.service.bookings_by_market(market.id, true).await else {
            panic!("listing");
        };
        bookings
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn active_bookings_never_overlap(
        requests in prop::collection::vec((0u64..45, 0u64..7, any::<bool>(), any::<bool>()), 1..24)
    ) {
        let bookings = run_requests(&requests);
        for (i, a) in bookings.iter().enumerate() {
            prop_assert!(a.is_active());
            for b in bookings.iter().skip(i + 1) {
                if a.slot_id == b.slot_id {
                    prop_assert!(
                        !a.range().overlaps(&b.range()),
                        "{} and {} overlap on {}",
                        a.range(),
                        b.range(),
                        a.slot_id
                    );
                }
            }
        }
    }
}
