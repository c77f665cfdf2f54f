//! Short-lived exclusive holds on a slot and day range.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{DateRange, LockId, MarketId, SlotId, UserId};

/// Fixed length of a hold.
pub const HOLD_WINDOW_MINUTES: i64 = 10;

/// Returns the hold window as a [`Duration`].
#[must_use]
pub fn hold_window() -> Duration {
    Duration::minutes(HOLD_WINDOW_MINUTES)
}

/// Stored lifecycle state of a hold.
///
/// `Expired` is mostly logical: an `Active` hold past its deadline is
/// treated as expired wherever it is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LockStatus {
    /// Holding the range.
    Active,
    /// Converted into a booking.
    Consumed,
    /// Lapsed without confirmation.
    Expired,
}

impl LockStatus {
    /// Lowercase name as used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Consumed => "consumed",
            Self::Expired => "expired",
        }
    }
}

/// A temporary claim on `(market, slot, range)` by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotLock {
    /// Deterministic id, see [`LockId::derive`].
    pub id: LockId,
    /// Market of the slot.
    pub market_id: MarketId,
    /// Held slot.
    pub slot_id: SlotId,
    /// Holder.
    pub user_id: UserId,
    /// Held days.
    pub range: DateRange,
    /// Stored status.
    pub status: LockStatus,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Deadline for confirmation.
    pub expires_at: DateTime<Utc>,
}

impl SlotLock {
    /// Creates an active hold expiring one hold window after `now`.
    #[must_use]
    pub fn new(
        market_id: MarketId,
        slot_id: SlotId,
        user_id: UserId,
        range: DateRange,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LockId::derive(market_id, &slot_id, range.start, range.end, &user_id),
            market_id,
            slot_id,
            user_id,
            range,
            status: LockStatus::Active,
            created_at: now,
            expires_at: now + hold_window(),
        }
    }

    /// Whether this hold still blocks others at `now`.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.status == LockStatus::Active && self.expires_at > now
    }

    /// Whether confirmation at `now` is past the deadline.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether the record may be deleted at `now`.
    ///
    /// Consumed holds are kept as history. An active hold survives until its
    /// deadline has strictly passed, since it can still be confirmed at
    /// exactly `expires_at`.
    #[must_use]
    pub fn is_purgeable_at(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            LockStatus::Consumed => false,
            LockStatus::Active => self.is_expired_at(now),
            LockStatus::Expired => true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn lock(now: DateTime<Utc>) -> SlotLock {
        let (Some(a), Some(b)) = (
            NaiveDate::from_ymd_opt(2024, 5, 1),
            NaiveDate::from_ymd_opt(2024, 5, 5),
        ) else {
            panic!("valid dates");
        };
        SlotLock::new(
            MarketId::new(),
            SlotId::from("S1"),
            UserId::from("alice"),
            DateRange { start: a, end: b },
            now,
        )
    }

    #[test]
    fn new_lock_expires_after_window() {
        let now = Utc::now();
        let l = lock(now);
        assert_eq!(l.status, LockStatus::Active);
        assert_eq!(l.expires_at - l.created_at, Duration::minutes(10));
        assert_eq!(
            l.id.as_str(),
            format!("{}_S1_2024-05-01_2024-05-05_alice", l.market_id)
        );
    }

    #[test]
    fn liveness_and_expiry() {
        let now = Utc::now();
        let mut l = lock(now);
        assert!(l.is_live(now + Duration::minutes(9)));
        assert!(!l.is_live(now + Duration::minutes(10)));
        assert!(!l.is_expired_at(now + Duration::minutes(10)));
        assert!(l.is_expired_at(now + Duration::minutes(11)));

        l.status = LockStatus::Consumed;
        assert!(!l.is_live(now));
    }

    #[test]
    fn active_hold_is_kept_through_its_deadline() {
        let now = Utc::now();
        let mut l = lock(now);
        assert!(!l.is_purgeable_at(l.expires_at));
        assert!(l.is_purgeable_at(l.expires_at + Duration::milliseconds(1)));

        l.status = LockStatus::Consumed;
        assert!(!l.is_purgeable_at(l.expires_at + Duration::hours(1)));
        l.status = LockStatus::Expired;
        assert!(l.is_purgeable_at(now));
    }
}
