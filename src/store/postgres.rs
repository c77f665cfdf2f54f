//! PostgreSQL implementation of the document store.
//!
//! Each collection is a table holding the serialized record in a `doc`
//! JSONB column next to the handful of columns the engine filters on.
//! Transactions run at SERIALIZABLE isolation; serialization failures
//! and deadlocks surface as [`StoreError::Aborted`] so that
//! [`super::run_transaction`] re-runs the body.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};

use super::{DocumentStore, StoreError, Transaction};
use crate::config::ServiceConfig;
use crate::domain::{
    Booking, BookingId, LockId, LockStatus, Market, MarketId, Notification, NotificationId,
    SlotId, SlotLock, UserId, UserProfile,
};

/// Writes a hold, refreshing every filtered column when the id already exists.
const UPSERT_LOCK: &str = "INSERT INTO slot_locks \
     (id, market_id, slot_id, user_id, status, expires_at, doc) \
     VALUES ($1, $2, $3, $4, $5, $6, $7) \
     ON CONFLICT (id) DO UPDATE SET market_id = EXCLUDED.market_id, \
     slot_id = EXCLUDED.slot_id, user_id = EXCLUDED.user_id, \
     status = EXCLUDED.status, expires_at = EXCLUDED.expires_at, doc = EXCLUDED.doc";

/// Drops unconsumed holds whose deadline is strictly in the past.
const DELETE_EXPIRED_LOCKS: &str = "DELETE FROM slot_locks \
     WHERE status <> $1 AND (status <> $2 OR expires_at < $3)";

/// Maps sqlx errors, turning contention SQLSTATEs into `Aborted`.
fn map_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err
        && matches!(db.code().as_deref(), Some("40001" | "40P01"))
    {
        return StoreError::Aborted;
    }
    StoreError::Backend(err.to_string())
}

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the pool settings in `config` and applies the
    /// schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the database is unreachable or
    /// a migration fails.
    pub async fn connect(config: &ServiceConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(map_err)?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        tracing::info!("postgres store ready");
        Ok(Self::new(pool))
    }
}

/// Transaction over a [`PostgresStore`].
pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

impl std::fmt::Debug for PgTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgTransaction").finish_non_exhaustive()
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn market(&mut self, id: MarketId) -> Result<Option<Market>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Market>>("SELECT doc FROM markets WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_err)?;
        Ok(row.map(|Json(m)| m))
    }

    async fn profile(&mut self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<UserProfile>>(
            "SELECT doc FROM profiles WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_err)?;
        Ok(row.map(|Json(p)| p))
    }

    async fn lock(&mut self, id: &LockId) -> Result<Option<SlotLock>, StoreError> {
        let row =
            sqlx::query_scalar::<_, Json<SlotLock>>("SELECT doc FROM slot_locks WHERE id = $1")
                .bind(id.as_str())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(map_err)?;
        Ok(row.map(|Json(l)| l))
    }

    async fn booking(&mut self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Booking>>("SELECT doc FROM bookings WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_err)?;
        Ok(row.map(|Json(b)| b))
    }

    async fn bookings_for_slot(
        &mut self,
        market_id: MarketId,
        slot_id: &SlotId,
    ) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_scalar::<_, Json<Booking>>(
            "SELECT doc FROM bookings WHERE market_id = $1 AND slot_id = $2",
        )
        .bind(market_id.as_uuid())
        .bind(slot_id.as_str())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_err)?;
        Ok(rows.into_iter().map(|Json(b)| b).collect())
    }

    async fn locks_for_slot(
        &mut self,
        market_id: MarketId,
        slot_id: &SlotId,
    ) -> Result<Vec<SlotLock>, StoreError> {
        let rows = sqlx::query_scalar::<_, Json<SlotLock>>(
            "SELECT doc FROM slot_locks WHERE market_id = $1 AND slot_id = $2",
        )
        .bind(market_id.as_uuid())
        .bind(slot_id.as_str())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_err)?;
        Ok(rows.into_iter().map(|Json(l)| l).collect())
    }

    async fn put_lock(&mut self, lock: SlotLock) -> Result<(), StoreError> {
        sqlx::query(UPSERT_LOCK)
            .bind(lock.id.as_str())
            .bind(lock.market_id.as_uuid())
            .bind(lock.slot_id.as_str())
            .bind(lock.user_id.as_str())
            .bind(lock.status.as_str())
            .bind(lock.expires_at)
            .bind(Json(&lock))
            .execute(&mut *self.tx)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn put_booking(&mut self, booking: Booking) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO bookings (id, market_id, slot_id, user_id, status, created_at, doc) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status, doc = EXCLUDED.doc",
        )
        .bind(booking.id.as_uuid())
        .bind(booking.market_id.as_uuid())
        .bind(booking.slot_id.as_str())
        .bind(booking.user_id.as_str())
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .bind(Json(&booking))
        .execute(&mut *self.tx)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_err)
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn get_market(&self, id: MarketId) -> Result<Option<Market>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Market>>("SELECT doc FROM markets WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(row.map(|Json(m)| m))
    }

    async fn list_markets(&self) -> Result<Vec<Market>, StoreError> {
        let rows =
            sqlx::query_scalar::<_, Json<Market>>("SELECT doc FROM markets ORDER BY created_at")
                .fetch_all(&self.pool)
                .await
                .map_err(map_err)?;
        Ok(rows.into_iter().map(|Json(m)| m).collect())
    }

    async fn put_market(&self, market: &Market) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO markets (id, owner_id, created_at, doc) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET owner_id = EXCLUDED.owner_id, doc = EXCLUDED.doc",
        )
        .bind(market.id.as_uuid())
        .bind(market.owner_id.as_str())
        .bind(market.created_at)
        .bind(Json(market))
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn get_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<UserProfile>>(
            "SELECT doc FROM profiles WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(row.map(|Json(p)| p))
    }

    async fn put_profile(
        &self,
        user_id: &UserId,
        profile: &UserProfile,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO profiles (user_id, doc) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET doc = EXCLUDED.doc",
        )
        .bind(user_id.as_str())
        .bind(Json(profile))
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Booking>>("SELECT doc FROM bookings WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(row.map(|Json(b)| b))
    }

    async fn bookings_by_market(&self, market_id: MarketId) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_scalar::<_, Json<Booking>>(
            "SELECT doc FROM bookings WHERE market_id = $1 ORDER BY created_at ASC",
        )
        .bind(market_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(rows.into_iter().map(|Json(b)| b).collect())
    }

    async fn bookings_by_user(&self, user_id: &UserId) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_scalar::<_, Json<Booking>>(
            "SELECT doc FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(rows.into_iter().map(|Json(b)| b).collect())
    }

    async fn add_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO notifications (id, to_user_id, read, created_at, doc) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(notification.id.as_uuid())
        .bind(notification.to_user_id.as_str())
        .bind(notification.read)
        .bind(notification.created_at)
        .bind(Json(notification))
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn get_notification(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Notification>>(
            "SELECT doc FROM notifications WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(row.map(|Json(n)| n))
    }

    async fn notifications_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query_scalar::<_, Json<Notification>>(
            "SELECT doc FROM notifications WHERE to_user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(rows.into_iter().map(|Json(n)| n).collect())
    }

    async fn mark_notification_read(&self, id: NotificationId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE, doc = jsonb_set(doc, '{read}', 'true') \
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_locks(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(DELETE_EXPIRED_LOCKS)
            .bind(LockStatus::Consumed.as_str())
            .bind(LockStatus::Active.as_str())
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_upsert_rewrites_filtered_columns() {
        for column in ["market_id", "slot_id", "user_id", "status", "expires_at", "doc"] {
            assert!(
                UPSERT_LOCK.contains(&format!("{column} = EXCLUDED.{column}")),
                "{column} is left stale on conflict"
            );
        }
    }

    #[test]
    fn purge_keeps_holds_at_their_deadline() {
        assert!(DELETE_EXPIRED_LOCKS.contains("expires_at < $3"));
        assert!(!DELETE_EXPIRED_LOCKS.contains("<="));
    }
}
