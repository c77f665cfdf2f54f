//! Shared fixture for integration tests.

#![allow(dead_code, clippy::panic)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use market_booking::blob::MemoryBlobStore;
use market_booking::clock::ManualClock;
use market_booking::domain::{
    DateRange, EventBus, Market, SlotCapability, SlotDefinition, SlotId, UserId, UserProfile,
};
use market_booking::service::{BookingService, NewMarket};
use market_booking::store::MemoryStore;

/// A service over in-memory collaborators with a hand-driven clock.
pub struct Harness {
    pub service: BookingService,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub blobs: Arc<MemoryBlobStore>,
    pub owner: UserId,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let Some(start) = Utc.with_ymd_and_hms(2024, 4, 20, 9, 0, 0).single() else {
            panic!("valid start instant");
        };
        let clock = Arc::new(ManualClock::new(start));
        let blobs = Arc::new(MemoryBlobStore::new("https://blobs.test"));
        let service = BookingService::new(
            Arc::<MemoryStore>::clone(&store),
            Arc::<ManualClock>::clone(&clock),
            Arc::<MemoryBlobStore>::clone(&blobs),
            EventBus::new(64),
        );
        Self {
            service,
            store,
            clock,
            blobs,
            owner: UserId::from("owner"),
        }
    }

    /// Creates a market owned by `self.owner` with the given slots.
    pub async fn market(&self, slots: &[(&str, SlotCapability)]) -> Market {
        let layout = slots
            .iter()
            .map(|(id, capability)| SlotDefinition {
                slot_id: SlotId::from(*id),
                position: Default::default(),
                capability: *capability,
                price_daily: Some(150),
                price_monthly: Some(3000),
            })
            .collect();
        let new = NewMarket {
            name: "Riverside night market".to_string(),
            layout,
            ..NewMarket::default()
        };
        let Ok(market) = self.service.create_market(&self.owner, new).await else {
            panic!("market created");
        };
        market
    }

    pub async fn profile(&self, user: &UserId, name: &str) {
        let profile = UserProfile {
            name: name.to_string(),
            phone: "555-0100".to_string(),
            address: "1 Quay Street".to_string(),
        };
        let Ok(_) = self.service.save_profile(user, profile).await else {
            panic!("profile saved");
        };
    }
}

pub fn range(from: &str, to: &str) -> DateRange {
    let Ok(range) = DateRange::parse(from, to) else {
        panic!("valid range {from}..{to}");
    };
    range
}
