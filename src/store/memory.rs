//! In-memory document store with optimistic concurrency control.
//!
//! Every document and every `(market, slot)` contention domain carries a
//! version counter. A [`MemoryTransaction`] remembers the version of each
//! key it reads and buffers its writes; commit takes the write lock,
//! aborts if any remembered version moved, then applies the writes and
//! bumps the versions they touch. Slot queries observe the domain key, so
//! two transactions that both checked the same slot and then write to it
//! cannot both commit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{DocumentStore, StoreError, Transaction};
use crate::domain::{
    Booking, BookingId, LockId, Market, MarketId, Notification, NotificationId, SlotId, SlotLock,
    UserId, UserProfile,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum VersionKey {
    Market(MarketId),
    Profile(UserId),
    Lock(LockId),
    Booking(BookingId),
    Slot(MarketId, SlotId),
}

#[derive(Debug)]
enum Write {
    Lock(SlotLock),
    Booking(Booking),
}

#[derive(Debug, Default)]
struct State {
    markets: HashMap<MarketId, Market>,
    profiles: HashMap<UserId, UserProfile>,
    locks: HashMap<LockId, SlotLock>,
    bookings: HashMap<BookingId, Booking>,
    notifications: Vec<Notification>,
    versions: HashMap<VersionKey, u64>,
}

impl State {
    fn version(&self, key: &VersionKey) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    fn bump(&mut self, key: VersionKey) {
        let v = self.versions.entry(key).or_insert(0);
        *v = v.saturating_add(1);
    }

    fn apply(&mut self, write: Write) {
        match write {
            Write::Lock(lock) => {
                self.bump(VersionKey::Lock(lock.id.clone()));
                self.bump(VersionKey::Slot(lock.market_id, lock.slot_id.clone()));
                self.locks.insert(lock.id.clone(), lock);
            }
            Write::Booking(booking) => {
                self.bump(VersionKey::Booking(booking.id));
                self.bump(VersionKey::Slot(booking.market_id, booking.slot_id.clone()));
                self.bookings.insert(booking.id, booking);
            }
        }
    }
}

/// Process-local [`DocumentStore`]. Cloning shares the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Transaction over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTransaction {
    state: Arc<RwLock<State>>,
    observed: HashMap<VersionKey, u64>,
    writes: Vec<Write>,
}

fn observe(observed: &mut HashMap<VersionKey, u64>, state: &State, key: VersionKey) {
    let version = state.version(&key);
    observed.entry(key).or_insert(version);
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn market(&mut self, id: MarketId) -> Result<Option<Market>, StoreError> {
        let shared = Arc::clone(&self.state);
        let state = shared.read().await;
        observe(&mut self.observed, &state, VersionKey::Market(id));
        Ok(state.markets.get(&id).cloned())
    }

    async fn profile(&mut self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        let shared = Arc::clone(&self.state);
        let state = shared.read().await;
        observe(&mut self.observed, &state, VersionKey::Profile(user_id.clone()));
        Ok(state.profiles.get(user_id).cloned())
    }

    async fn lock(&mut self, id: &LockId) -> Result<Option<SlotLock>, StoreError> {
        let shared = Arc::clone(&self.state);
        let state = shared.read().await;
        observe(&mut self.observed, &state, VersionKey::Lock(id.clone()));
        Ok(state.locks.get(id).cloned())
    }

    async fn booking(&mut self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        let shared = Arc::clone(&self.state);
        let state = shared.read().await;
        observe(&mut self.observed, &state, VersionKey::Booking(id));
        Ok(state.bookings.get(&id).cloned())
    }

    async fn bookings_for_slot(
        &mut self,
        market_id: MarketId,
        slot_id: &SlotId,
    ) -> Result<Vec<Booking>, StoreError> {
        let shared = Arc::clone(&self.state);
        let state = shared.read().await;
        observe(
            &mut self.observed,
            &state,
            VersionKey::Slot(market_id, slot_id.clone()),
        );
        Ok(state
            .bookings
            .values()
            .filter(|b| b.market_id == market_id && &b.slot_id == slot_id)
            .cloned()
            .collect())
    }

    async fn locks_for_slot(
        &mut self,
        market_id: MarketId,
        slot_id: &SlotId,
    ) -> Result<Vec<SlotLock>, StoreError> {
        let shared = Arc::clone(&self.state);
        let state = shared.read().await;
        observe(
            &mut self.observed,
            &state,
            VersionKey::Slot(market_id, slot_id.clone()),
        );
        Ok(state
            .locks
            .values()
            .filter(|l| l.market_id == market_id && &l.slot_id == slot_id)
            .cloned()
            .collect())
    }

    async fn put_lock(&mut self, lock: SlotLock) -> Result<(), StoreError> {
        self.writes.push(Write::Lock(lock));
        Ok(())
    }

    async fn put_booking(&mut self, booking: Booking) -> Result<(), StoreError> {
        self.writes.push(Write::Booking(booking));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        let mut state = this.state.write().await;
        if this
            .observed
            .iter()
            .any(|(key, seen)| state.version(key) != *seen)
        {
            return Err(StoreError::Aborted);
        }
        for write in this.writes {
            state.apply(write);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        Ok(Box::new(MemoryTransaction {
            state: Arc::clone(&self.state),
            observed: HashMap::new(),
            writes: Vec::new(),
        }))
    }

    async fn get_market(&self, id: MarketId) -> Result<Option<Market>, StoreError> {
        Ok(self.state.read().await.markets.get(&id).cloned())
    }

    async fn list_markets(&self) -> Result<Vec<Market>, StoreError> {
        let state = self.state.read().await;
        let mut markets: Vec<Market> = state.markets.values().cloned().collect();
        markets.sort_by_key(|m| m.created_at);
        Ok(markets)
    }

    async fn put_market(&self, market: &Market) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.bump(VersionKey::Market(market.id));
        state.markets.insert(market.id, market.clone());
        Ok(())
    }

    async fn get_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.state.read().await.profiles.get(user_id).cloned())
    }

    async fn put_profile(
        &self,
        user_id: &UserId,
        profile: &UserProfile,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.bump(VersionKey::Profile(user_id.clone()));
        state.profiles.insert(user_id.clone(), profile.clone());
        Ok(())
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        Ok(self.state.read().await.bookings.get(&id).cloned())
    }

    async fn bookings_by_market(&self, market_id: MarketId) -> Result<Vec<Booking>, StoreError> {
        let state = self.state.read().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.market_id == market_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.created_at);
        Ok(bookings)
    }

    async fn bookings_by_user(&self, user_id: &UserId) -> Result<Vec<Booking>, StoreError> {
        let state = self.state.read().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| &b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn add_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(())
    }

    async fn get_notification(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, StoreError> {
        let state = self.state.read().await;
        Ok(state.notifications.iter().find(|n| n.id == id).cloned())
    }

    async fn notifications_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Notification>, StoreError> {
        let state = self.state.read().await;
        let mut found: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| &n.to_user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn mark_notification_read(&self, id: NotificationId) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        match state.notifications.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_expired_locks(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let stale: Vec<SlotLock> = state
            .locks
            .values()
            .filter(|l| l.is_purgeable_at(now))
            .cloned()
            .collect();
        for lock in &stale {
            state.locks.remove(&lock.id);
            state.bump(VersionKey::Lock(lock.id.clone()));
            state.bump(VersionKey::Slot(lock.market_id, lock.slot_id.clone()));
        }
        Ok(u64::try_from(stale.len()).unwrap_or(u64::MAX))
    }
}
