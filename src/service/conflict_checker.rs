//! Overlap detection against bookings and live holds on one slot.
//!
//! The checker is read-only. It runs inside the same [`Transaction`] that
//! performs the subsequent write, so the slot reads it makes are part of
//! that transaction's conflict footprint: a concurrent commit touching the
//! slot aborts the writer and the retry sees the winner.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::domain::{Booking, BookingId, DateRange, LockId, MarketId, SlotId, SlotLock};
use crate::error::BookingError;
use crate::store::{StoreError, Transaction};

/// The record standing in the way of a requested range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blocker {
    /// An active booking.
    Booking(BookingId),
    /// A live hold.
    Hold(LockId),
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Booking(id) => write!(f, "booking {id}"),
            Self::Hold(id) => write!(f, "hold {id}"),
        }
    }
}

/// Finds the first active booking or live hold overlapping `range`.
///
/// Rejected and cancelled bookings are ignored, as are holds that are
/// consumed, expired, past their deadline at `now`, or whose id equals
/// `ignore_lock`.
#[must_use]
pub fn first_overlap(
    bookings: &[Booking],
    locks: &[SlotLock],
    range: &DateRange,
    now: DateTime<Utc>,
    ignore_lock: Option<&LockId>,
) -> Option<Blocker> {
    let booked = bookings
        .iter()
        .filter(|b| b.is_active())
        .find(|b| b.range().overlaps(range))
        .map(|b| Blocker::Booking(b.id));
    if booked.is_some() {
        return booked;
    }
    locks
        .iter()
        .filter(|l| l.is_live(now) && Some(&l.id) != ignore_lock)
        .find(|l| l.range.overlaps(range))
        .map(|l| Blocker::Hold(l.id.clone()))
}

/// Looks up the slot inside `tx` and reports the first blocker, if any.
///
/// # Errors
///
/// Propagates store failures.
pub async fn find_conflict(
    tx: &mut dyn Transaction,
    market_id: MarketId,
    slot_id: &SlotId,
    range: &DateRange,
    now: DateTime<Utc>,
    ignore_lock: Option<&LockId>,
) -> Result<Option<Blocker>, StoreError> {
    let bookings = tx.bookings_for_slot(market_id, slot_id).await?;
    let locks = tx.locks_for_slot(market_id, slot_id).await?;
    let blocker = first_overlap(&bookings, &locks, range, now, ignore_lock);
    tracing::debug!(
        %market_id,
        %slot_id,
        %range,
        bookings = bookings.len(),
        locks = locks.len(),
        blocker = ?blocker,
        "conflict check"
    );
    Ok(blocker)
}

/// Returns `true` if `range` on the slot overlaps an active booking or a
/// live hold.
///
/// # Errors
///
/// Propagates store failures.
pub async fn has_conflict(
    tx: &mut dyn Transaction,
    market_id: MarketId,
    slot_id: &SlotId,
    range: &DateRange,
    now: DateTime<Utc>,
) -> Result<bool, StoreError> {
    Ok(find_conflict(tx, market_id, slot_id, range, now, None)
        .await?
        .is_some())
}

/// Fails with [`BookingError::Conflict`] if the range is taken.
///
/// # Errors
///
/// Returns `Conflict` naming the blocker, or a store error.
pub async fn ensure_free(
    tx: &mut dyn Transaction,
    market_id: MarketId,
    slot_id: &SlotId,
    range: &DateRange,
    now: DateTime<Utc>,
    ignore_lock: Option<&LockId>,
) -> Result<(), BookingError> {
    match find_conflict(tx, market_id, slot_id, range, now, ignore_lock).await? {
        Some(blocker) => Err(BookingError::Conflict(format!(
            "slot {slot_id} is taken for {range} by {blocker}; pick a different time"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::domain::{
        BookingPeriod, BookingStatus, ContactSnapshot, LockStatus, PaymentStatus, PriceSnapshot,
        UserId,
    };

    fn day(m: u32, d: u32) -> NaiveDate {
        let Some(date) = NaiveDate::from_ymd_opt(2024, m, d) else {
            panic!("valid date");
        };
        date
    }

    fn range(from: NaiveDate, to: NaiveDate) -> DateRange {
        DateRange {
            start: from,
            end: to,
        }
    }

    fn booking(period: BookingPeriod, status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id: BookingId::new(),
            market_id: MarketId::new(),
            slot_id: SlotId::from("S1"),
            user_id: UserId::from("alice"),
            period,
            status,
            payment_status: PaymentStatus::None,
            contact: ContactSnapshot::default(),
            price: PriceSnapshot::default(),
            payment_evidence: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn hold(user: &str, r: DateRange, now: DateTime<Utc>) -> SlotLock {
        SlotLock::new(MarketId::new(), SlotId::from("S1"), UserId::from(user), r, now)
    }

    #[test]
    fn touching_endpoints_overlap() {
        let now = Utc::now();
        let existing = booking(
            BookingPeriod::Daily {
                from: day(5, 1),
                to: day(5, 5),
            },
            BookingStatus::Pending,
        );
        let wanted = range(day(5, 5), day(5, 8));
        assert_eq!(
            first_overlap(&[existing.clone()], &[], &wanted, now, None),
            Some(Blocker::Booking(existing.id))
        );
        let after = range(day(5, 6), day(5, 8));
        assert_eq!(first_overlap(&[existing], &[], &after, now, None), None);
    }

    #[test]
    fn inactive_bookings_never_block() {
        let now = Utc::now();
        let period = BookingPeriod::Daily {
            from: day(5, 1),
            to: day(5, 5),
        };
        let bookings = [
            booking(period, BookingStatus::Rejected),
            booking(period, BookingStatus::Cancelled),
        ];
        let wanted = range(day(5, 2), day(5, 3));
        assert_eq!(first_overlap(&bookings, &[], &wanted, now, None), None);
    }

    #[test]
    fn monthly_booking_blocks_its_whole_span() {
        let now = Utc::now();
        let existing = booking(
            BookingPeriod::Monthly {
                start_month: day(3, 1),
                months: 2,
            },
            BookingStatus::Approved,
        );
        let late_april = range(day(4, 30), day(5, 2));
        assert!(first_overlap(&[existing.clone()], &[], &late_april, now, None).is_some());
        let may = range(day(5, 1), day(5, 31));
        assert!(first_overlap(&[existing], &[], &may, now, None).is_none());
    }

    #[test]
    fn only_live_holds_block() {
        let now = Utc::now();
        let r = range(day(5, 1), day(5, 5));
        let stale = hold("bob", r, now - Duration::minutes(11));
        let mut consumed = hold("carol", r, now);
        consumed.status = LockStatus::Consumed;
        assert_eq!(
            first_overlap(&[], &[stale, consumed], &r, now, None),
            None
        );

        let live = hold("dave", r, now);
        assert_eq!(
            first_overlap(&[], &[live.clone()], &r, now, None),
            Some(Blocker::Hold(live.id.clone()))
        );
        assert_eq!(first_overlap(&[], &[live.clone()], &r, now, Some(&live.id)), None);
    }

    #[test]
    fn malformed_stored_ranges_are_ignored() {
        let now = Utc::now();
        let corrupt = booking(
            BookingPeriod::Daily {
                from: day(5, 9),
                to: day(5, 1),
            },
            BookingStatus::Pending,
        );
        let wanted = range(day(5, 1), day(5, 31));
        assert_eq!(first_overlap(&[corrupt], &[], &wanted, now, None), None);
    }
}
