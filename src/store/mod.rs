//! Storage layer: transactional document store abstraction.
//!
//! The engine never talks to a database directly. It sees a
//! [`DocumentStore`] offering plain reads and writes plus
//! [`DocumentStore::begin`], which opens a [`Transaction`] whose commit
//! fails with [`StoreError::Aborted`] when anything it read was changed
//! by a concurrent commit. [`run_transaction`] retries such aborts a
//! bounded number of times, re-running the whole body so that every
//! conflict re-check observes the winner's write.
//!
//! Two backends ship with the crate: [`MemoryStore`] (optimistic
//! versioning, the default and the test fake) and [`PostgresStore`]
//! (JSONB documents under SERIALIZABLE isolation).

pub mod memory;
pub mod postgres;

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Booking, BookingId, LockId, Market, MarketId, Notification, NotificationId, SlotId, SlotLock,
    UserId, UserProfile,
};
use crate::error::BookingError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// How many times a transaction body runs before contention is reported.
pub const MAX_TRANSACTION_ATTEMPTS: u32 = 5;

/// Storage backend failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A concurrent commit invalidated this transaction's reads.
    #[error("transaction aborted by a concurrent write")]
    Aborted,
    /// The backend itself failed.
    #[error("backend failure: {0}")]
    Backend(String),
    /// A stored document could not be decoded.
    #[error("corrupt document: {0}")]
    Corrupt(String),
}

/// Reads and buffered writes performed atomically.
///
/// Reads observe committed state only; a body never needs to read back
/// its own writes. Dropping a transaction without committing discards it.
#[async_trait]
pub trait Transaction: Send {
    /// Reads a market.
    async fn market(&mut self, id: MarketId) -> Result<Option<Market>, StoreError>;

    /// Reads a user's profile.
    async fn profile(&mut self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError>;

    /// Reads a hold by id.
    async fn lock(&mut self, id: &LockId) -> Result<Option<SlotLock>, StoreError>;

    /// Reads a booking by id.
    async fn booking(&mut self, id: BookingId) -> Result<Option<Booking>, StoreError>;

    /// Queries every booking on `(market, slot)`, whatever its status.
    async fn bookings_for_slot(
        &mut self,
        market_id: MarketId,
        slot_id: &SlotId,
    ) -> Result<Vec<Booking>, StoreError>;

    /// Queries every hold on `(market, slot)`, whatever its status.
    async fn locks_for_slot(
        &mut self,
        market_id: MarketId,
        slot_id: &SlotId,
    ) -> Result<Vec<SlotLock>, StoreError>;

    /// Inserts or replaces a hold.
    async fn put_lock(&mut self, lock: SlotLock) -> Result<(), StoreError>;

    /// Inserts or replaces a booking.
    async fn put_booking(&mut self, booking: Booking) -> Result<(), StoreError>;

    /// Atomically applies the buffered writes.
    ///
    /// Fails with [`StoreError::Aborted`] on contention.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Document store consumed by the booking engine.
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    /// Opens a transaction.
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError>;

    /// Reads a market.
    async fn get_market(&self, id: MarketId) -> Result<Option<Market>, StoreError>;

    /// Lists all markets, oldest first.
    async fn list_markets(&self) -> Result<Vec<Market>, StoreError>;

    /// Inserts or replaces a market.
    async fn put_market(&self, market: &Market) -> Result<(), StoreError>;

    /// Reads a user's profile.
    async fn get_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError>;

    /// Inserts or replaces a user's profile.
    async fn put_profile(&self, user_id: &UserId, profile: &UserProfile)
    -> Result<(), StoreError>;

    /// Reads a booking.
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError>;

    /// Lists bookings of a market, oldest first.
    async fn bookings_by_market(&self, market_id: MarketId) -> Result<Vec<Booking>, StoreError>;

    /// Lists bookings requested by a user, newest first.
    async fn bookings_by_user(&self, user_id: &UserId) -> Result<Vec<Booking>, StoreError>;

    /// Appends a notification.
    async fn add_notification(&self, notification: &Notification) -> Result<(), StoreError>;

    /// Reads a notification.
    async fn get_notification(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, StoreError>;

    /// Lists notifications addressed to a user, newest first.
    async fn notifications_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Notification>, StoreError>;

    /// Flips the read flag. Returns `false` if no such notification.
    async fn mark_notification_read(&self, id: NotificationId) -> Result<bool, StoreError>;

    /// Deletes holds that are no longer live at `now` and were never
    /// consumed. Returns how many were removed.
    async fn delete_expired_locks(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Body of a transaction, re-run from scratch on every attempt.
#[async_trait]
pub trait TransactionBody: Send + Sync {
    /// Value produced by a successful run.
    type Output: Send;

    /// Performs reads, checks and buffered writes against `tx`.
    async fn run(&self, tx: &mut dyn Transaction) -> Result<Self::Output, BookingError>;
}

/// Runs `body` in a transaction, retrying on [`StoreError::Aborted`].
///
/// # Errors
///
/// Returns the body's own error (the transaction is rolled back), or
/// [`BookingError::Store`] if the store fails or contention persists for
/// [`MAX_TRANSACTION_ATTEMPTS`] attempts.
pub async fn run_transaction<B: TransactionBody>(
    store: &dyn DocumentStore,
    body: &B,
) -> Result<B::Output, BookingError> {
    let mut attempt = 1;
    loop {
        let mut tx = store.begin().await?;
        let outcome = match body.run(tx.as_mut()).await {
            Ok(output) => tx.commit().await.map(|()| output).map_err(BookingError::from),
            Err(err) => Err(err),
        };
        match outcome {
            Err(BookingError::Store(StoreError::Aborted)) if attempt < MAX_TRANSACTION_ATTEMPTS => {
                tracing::warn!(attempt, "transaction aborted by contention, retrying");
                attempt += 1;
            }
            other => return other,
        }
    }
}
