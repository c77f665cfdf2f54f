//! Short-lived holds on a slot and day range.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::conflict_checker::ensure_free;
use crate::clock::Clock;
use crate::domain::{DateRange, LockId, MarketId, SlotId, SlotLock, UserId};
use crate::error::BookingError;
use crate::store::{DocumentStore, Transaction, TransactionBody, run_transaction};

/// Result of a successful hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldReceipt {
    /// Deterministic id of the new hold.
    pub lock_id: LockId,
    /// Confirmation deadline.
    pub expires_at: DateTime<Utc>,
}

/// Creates holds and purges stale ones.
///
/// Expiry is never swept for correctness; every reader compares
/// `expires_at` against the clock itself.
#[derive(Debug, Clone)]
pub struct SlotLockManager {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

struct HoldSlot {
    market_id: MarketId,
    slot_id: SlotId,
    range: DateRange,
    user_id: UserId,
    now: DateTime<Utc>,
}

#[async_trait]
impl TransactionBody for HoldSlot {
    type Output = SlotLock;

    async fn run(&self, tx: &mut dyn Transaction) -> Result<SlotLock, BookingError> {
        let market = tx
            .market(self.market_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("market {}", self.market_id)))?;
        market.require_slot(&self.slot_id)?;

        let lock = SlotLock::new(
            self.market_id,
            self.slot_id.clone(),
            self.user_id.clone(),
            self.range,
            self.now,
        );
        if let Some(existing) = tx.lock(&lock.id).await?
            && existing.is_live(self.now)
        {
            return Err(BookingError::AlreadyHeld(existing.id.to_string()));
        }

        ensure_free(tx, self.market_id, &self.slot_id, &self.range, self.now, None).await?;
        tx.put_lock(lock.clone()).await?;
        Ok(lock)
    }
}

impl SlotLockManager {
    /// Creates a manager over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Places a hold on `range` of the slot for `user_id`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the market or slot does not exist.
    /// - `AlreadyHeld` if the caller holds this exact slot and range.
    /// - `Conflict` if an active booking or another live hold overlaps.
    pub async fn hold_slot(
        &self,
        market_id: MarketId,
        slot_id: SlotId,
        range: DateRange,
        user_id: &UserId,
    ) -> Result<HoldReceipt, BookingError> {
        let body = HoldSlot {
            market_id,
            slot_id,
            range,
            user_id: user_id.clone(),
            now: self.clock.now(),
        };
        let lock = run_transaction(self.store.as_ref(), &body).await?;
        tracing::info!(
            lock_id = %lock.id,
            %market_id,
            user = %user_id,
            expires_at = %lock.expires_at,
            "slot held"
        );
        Ok(HoldReceipt {
            lock_id: lock.id,
            expires_at: lock.expires_at,
        })
    }

    /// Deletes holds that can no longer be confirmed.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn purge_expired(&self) -> Result<u64, BookingError> {
        let removed = self.store.delete_expired_locks(self.clock.now()).await?;
        if removed > 0 {
            tracing::info!(removed, "expired holds purged");
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::clock::ManualClock;
    use crate::domain::{Market, SlotCapability, SlotDefinition};
    use crate::store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        manager: SlotLockManager,
        market_id: MarketId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let now = clock.now();
        let market = Market {
            id: MarketId::new(),
            name: "Night market".to_string(),
            description: String::new(),
            location: String::new(),
            owner_id: UserId::from("owner"),
            layout: vec![SlotDefinition {
                slot_id: SlotId::from("S1"),
                position: Default::default(),
                capability: SlotCapability::Both,
                price_daily: Some(100),
                price_monthly: None,
            }],
            created_at: now,
            updated_at: now,
        };
        let Ok(()) = store.put_market(&market).await else {
            panic!("seed market");
        };
        let manager = SlotLockManager::new(
            Arc::<MemoryStore>::clone(&store),
            Arc::<ManualClock>::clone(&clock),
        );
        Fixture {
            store,
            clock,
            manager,
            market_id: market.id,
        }
    }

    fn may(from: u32, to: u32) -> DateRange {
        let (Some(a), Some(b)) = (
            NaiveDate::from_ymd_opt(2024, 5, from),
            NaiveDate::from_ymd_opt(2024, 5, to),
        ) else {
            panic!("valid dates");
        };
        DateRange { start: a, end: b }
    }

    #[tokio::test]
    async fn hold_expires_ten_minutes_after_creation() {
        let f = fixture().await;
        let Ok(receipt) = f
            .manager
            .hold_slot(f.market_id, SlotId::from("S1"), may(1, 5), &UserId::from("alice"))
            .await
        else {
            panic!("hold should succeed");
        };
        assert_eq!(
            receipt.lock_id.as_str(),
            format!("{}_S1_2024-05-01_2024-05-05_alice", f.market_id)
        );
        assert_eq!(receipt.expires_at - f.clock.now(), Duration::minutes(10));
    }

    #[tokio::test]
    async fn overlapping_hold_by_other_user_conflicts() {
        let f = fixture().await;
        let slot = SlotId::from("S1");
        let Ok(_) = f
            .manager
            .hold_slot(f.market_id, slot.clone(), may(1, 5), &UserId::from("alice"))
            .await
        else {
            panic!("first hold");
        };
        let result = f
            .manager
            .hold_slot(f.market_id, slot, may(3, 4), &UserId::from("bob"))
            .await;
        assert!(matches!(result, Err(BookingError::Conflict(_))));
    }

    #[tokio::test]
    async fn duplicate_hold_is_already_held_until_it_lapses() {
        let f = fixture().await;
        let slot = SlotId::from("S1");
        let alice = UserId::from("alice");
        let Ok(_) = f
            .manager
            .hold_slot(f.market_id, slot.clone(), may(1, 5), &alice)
            .await
        else {
            panic!("first hold");
        };
        let again = f
            .manager
            .hold_slot(f.market_id, slot.clone(), may(1, 5), &alice)
            .await;
        assert!(matches!(again, Err(BookingError::AlreadyHeld(_))));

        f.clock.advance(Duration::minutes(11));
        let renewed = f.manager.hold_slot(f.market_id, slot, may(1, 5), &alice).await;
        assert!(renewed.is_ok());
    }

    #[tokio::test]
    async fn same_slot_name_in_two_markets_holds_independently() {
        let f = fixture().await;
        let Ok(Some(mut twin)) = f.store.get_market(f.market_id).await else {
            panic!("seeded market");
        };
        twin.id = MarketId::new();
        let Ok(()) = f.store.put_market(&twin).await else {
            panic!("seed twin market");
        };
        let alice = UserId::from("alice");
        let Ok(first) = f
            .manager
            .hold_slot(f.market_id, SlotId::from("S1"), may(1, 5), &alice)
            .await
        else {
            panic!("hold in first market");
        };
        let Ok(second) = f
            .manager
            .hold_slot(twin.id, SlotId::from("S1"), may(1, 5), &alice)
            .await
        else {
            panic!("hold in second market");
        };
        assert_ne!(first.lock_id, second.lock_id);

        let Ok(mut tx) = f.store.begin().await else {
            panic!("begin");
        };
        let Ok(Some(kept)) = tx.lock(&first.lock_id).await else {
            panic!("first hold still stored");
        };
        assert_eq!(kept.market_id, f.market_id);
    }

    #[tokio::test]
    async fn unknown_market_or_slot_is_not_found() {
        let f = fixture().await;
        let alice = UserId::from("alice");
        let missing_market = f
            .manager
            .hold_slot(MarketId::new(), SlotId::from("S1"), may(1, 5), &alice)
            .await;
        assert!(matches!(missing_market, Err(BookingError::NotFound(_))));
        let missing_slot = f
            .manager
            .hold_slot(f.market_id, SlotId::from("S9"), may(1, 5), &alice)
            .await;
        assert!(matches!(missing_slot, Err(BookingError::NotFound(_))));
    }

    #[tokio::test]
    async fn purge_drops_lapsed_holds() {
        let f = fixture().await;
        let Ok(_) = f
            .manager
            .hold_slot(f.market_id, SlotId::from("S1"), may(1, 5), &UserId::from("alice"))
            .await
        else {
            panic!("hold");
        };
        assert_eq!(f.manager.purge_expired().await.ok(), Some(0));
        f.clock.advance(Duration::minutes(10));
        assert_eq!(f.manager.purge_expired().await.ok(), Some(0));
        f.clock.advance(Duration::minutes(1));
        assert_eq!(f.manager.purge_expired().await.ok(), Some(1));
        let Ok(mut tx) = f.store.begin().await else {
            panic!("begin");
        };
        let Ok(left) = tx.locks_for_slot(f.market_id, &SlotId::from("S1")).await else {
            panic!("query");
        };
        assert!(left.is_empty());
    }
}
