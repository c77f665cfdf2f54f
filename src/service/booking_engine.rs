//! Booking creation: hold confirmation and the direct path.
//!
//! Both entry points re-run the conflict check inside the transaction
//! that inserts the booking. Notifications go out after commit and never
//! affect the outcome.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use super::conflict_checker::{ensure_free, find_conflict};
use super::notifier::{Notifier, booking_payload, notify_best_effort};
use crate::clock::Clock;
use crate::domain::{
    Booking, BookingId, BookingKind, BookingPeriod, BookingStatus, ContactSnapshot, DateRange,
    LockId, LockStatus, Market, MarketId, Notification, NotificationKind, PaymentEvidence,
    PaymentStatus, PriceSnapshot, SlotDefinition, SlotId, UserId,
};
use crate::error::BookingError;
use crate::store::{DocumentStore, Transaction, TransactionBody, run_transaction};

/// Unparsed period of a direct booking request.
///
/// Fields are optional so that a missing one is reported as
/// `InvalidArgument` rather than a deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PeriodRequest {
    /// Explicit day range, `YYYY-MM-DD` inclusive on both ends.
    Daily {
        /// First day.
        from: Option<String>,
        /// Last day.
        to: Option<String>,
    },
    /// Consecutive calendar months.
    Monthly {
        /// First month, `YYYY-MM`.
        start_month: Option<String>,
        /// Number of months, at least 1.
        months: Option<i64>,
    },
}

impl PeriodRequest {
    /// Validates and converts into a [`BookingPeriod`].
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidArgument`] for missing fields,
    /// unparseable dates, `to < from`, or a month count below 1.
    pub fn resolve(&self) -> Result<BookingPeriod, BookingError> {
        match self {
            Self::Daily { from, to } => {
                let from = from
                    .as_deref()
                    .ok_or_else(|| missing("daily booking needs `from`"))?;
                let to = to
                    .as_deref()
                    .ok_or_else(|| missing("daily booking needs `to`"))?;
                let range = DateRange::parse(from, to)?;
                Ok(BookingPeriod::Daily {
                    from: range.start,
                    to: range.end,
                })
            }
            Self::Monthly {
                start_month,
                months,
            } => {
                let start = start_month
                    .as_deref()
                    .ok_or_else(|| missing("monthly booking needs `start_month`"))?;
                let count = months.ok_or_else(|| missing("monthly booking needs `months`"))?;
                let months = u32::try_from(count)
                    .ok()
                    .filter(|m| *m >= 1)
                    .ok_or_else(|| {
                        BookingError::InvalidArgument(format!(
                            "month count must be at least 1, got {count}"
                        ))
                    })?;
                let range = DateRange::from_months(start, months)?;
                Ok(BookingPeriod::Monthly {
                    start_month: range.start,
                    months,
                })
            }
        }
    }
}

fn missing(what: &str) -> BookingError {
    BookingError::InvalidArgument(what.to_string())
}

fn check_capability(slot: &SlotDefinition, kind: BookingKind) -> Result<(), BookingError> {
    if slot.capability.supports(kind) {
        Ok(())
    } else {
        Err(BookingError::InvalidArgument(format!(
            "slot {} does not take {} bookings",
            slot.slot_id,
            kind.as_str()
        )))
    }
}

/// Shapes a held range into the period of the requested kind.
fn period_for(kind: BookingKind, range: DateRange) -> Result<BookingPeriod, BookingError> {
    match kind {
        BookingKind::Daily => Ok(BookingPeriod::Daily {
            from: range.start,
            to: range.end,
        }),
        BookingKind::Monthly => range
            .whole_months()
            .map(|months| BookingPeriod::Monthly {
                start_month: range.start,
                months,
            })
            .ok_or_else(|| {
                BookingError::InvalidArgument(format!(
                    "held range {range} is not a run of whole calendar months"
                ))
            }),
    }
}

/// Everything a new booking snapshots at creation time.
struct Draft<'a> {
    id: BookingId,
    user_id: &'a UserId,
    slot: &'a SlotDefinition,
    period: BookingPeriod,
    evidence: Option<PaymentEvidence>,
    now: DateTime<Utc>,
}

async fn insert_booking(
    tx: &mut dyn Transaction,
    market: &Market,
    draft: Draft<'_>,
) -> Result<Booking, BookingError> {
    let contact: ContactSnapshot = tx.profile(draft.user_id).await?.unwrap_or_default().into();
    let payment_status = if draft.evidence.is_some() {
        PaymentStatus::Waiting
    } else {
        PaymentStatus::None
    };
    let booking = Booking {
        id: draft.id,
        market_id: market.id,
        slot_id: draft.slot.slot_id.clone(),
        user_id: draft.user_id.clone(),
        period: draft.period,
        status: BookingStatus::Pending,
        payment_status,
        contact,
        price: PriceSnapshot::from(draft.slot),
        payment_evidence: draft.evidence,
        created_at: draft.now,
        updated_at: draft.now,
    };
    tx.put_booking(booking.clone()).await?;
    Ok(booking)
}

struct ConfirmHold {
    caller: UserId,
    lock_id: LockId,
    kind: BookingKind,
    evidence: Option<PaymentEvidence>,
    booking_id: BookingId,
    now: DateTime<Utc>,
}

#[async_trait]
impl TransactionBody for ConfirmHold {
    type Output = (Booking, Market);

    async fn run(&self, tx: &mut dyn Transaction) -> Result<(Booking, Market), BookingError> {
        let mut lock = tx
            .lock(&self.lock_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("hold {}", self.lock_id)))?;
        if lock.user_id != self.caller {
            return Err(BookingError::PermissionDenied(format!(
                "hold {} belongs to another user",
                lock.id
            )));
        }
        if lock.status != LockStatus::Active {
            return Err(BookingError::FailedPrecondition(format!(
                "hold {} is {}",
                lock.id,
                lock.status.as_str()
            )));
        }
        if lock.is_expired_at(self.now) {
            return Err(BookingError::DeadlineExceeded(format!(
                "hold {} expired at {}",
                lock.id, lock.expires_at
            )));
        }

        let market = tx
            .market(lock.market_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("market {}", lock.market_id)))?;
        let slot = market.require_slot(&lock.slot_id)?;
        check_capability(slot, self.kind)?;
        let period = period_for(self.kind, lock.range)?;

        if let Some(blocker) = find_conflict(
            tx,
            lock.market_id,
            &lock.slot_id,
            &lock.range,
            self.now,
            Some(&lock.id),
        )
        .await?
        {
            return Err(BookingError::Conflict(format!(
                "time just got taken: {blocker} overlaps {}",
                lock.range
            )));
        }

        let booking = insert_booking(
            tx,
            &market,
            Draft {
                id: self.booking_id,
                user_id: &self.caller,
                slot,
                period,
                evidence: self.evidence.clone(),
                now: self.now,
            },
        )
        .await?;
        lock.status = LockStatus::Consumed;
        tx.put_lock(lock).await?;
        Ok((booking, market))
    }
}

struct CreateDirect {
    caller: UserId,
    market_id: MarketId,
    slot_id: SlotId,
    period: BookingPeriod,
    booking_id: BookingId,
    now: DateTime<Utc>,
}

#[async_trait]
impl TransactionBody for CreateDirect {
    type Output = (Booking, Market);

    async fn run(&self, tx: &mut dyn Transaction) -> Result<(Booking, Market), BookingError> {
        let market = tx
            .market(self.market_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("market {}", self.market_id)))?;
        let slot = market.require_slot(&self.slot_id)?;
        check_capability(slot, self.period.kind())?;
        let range = self.period.effective_range();
        ensure_free(tx, self.market_id, &self.slot_id, &range, self.now, None).await?;
        let booking = insert_booking(
            tx,
            &market,
            Draft {
                id: self.booking_id,
                user_id: &self.caller,
                slot,
                period: self.period,
                evidence: None,
                now: self.now,
            },
        )
        .await?;
        Ok((booking, market))
    }
}

/// Turns holds and direct requests into pending bookings.
#[derive(Debug, Clone)]
pub struct BookingEngine {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl BookingEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
        }
    }

    /// Converts the caller's live hold into a `pending` booking and marks
    /// the hold consumed, atomically.
    ///
    /// # Errors
    ///
    /// In check order: `NotFound` (no such hold), `PermissionDenied`
    /// (someone else's hold), `FailedPrecondition` (hold not active),
    /// `DeadlineExceeded` (past `expires_at`), `InvalidArgument` (slot
    /// does not take `kind`, or a monthly booking on a range that is not
    /// whole months), `Conflict` (the range was taken in the meantime).
    pub async fn confirm_booking(
        &self,
        caller: &UserId,
        lock_id: &LockId,
        kind: BookingKind,
        evidence: Option<PaymentEvidence>,
    ) -> Result<Booking, BookingError> {
        let body = ConfirmHold {
            caller: caller.clone(),
            lock_id: lock_id.clone(),
            kind,
            evidence,
            booking_id: BookingId::new(),
            now: self.clock.now(),
        };
        let (booking, market) = run_transaction(self.store.as_ref(), &body).await?;
        tracing::info!(
            booking_id = %booking.id,
            %lock_id,
            user = %caller,
            "hold confirmed"
        );
        self.announce(&booking, &market).await;
        Ok(booking)
    }

    /// Books a slot without going through a hold. Same validation and
    /// conflict rules as [`BookingEngine::confirm_booking`].
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a malformed period or unsupported kind,
    /// `NotFound` for an unknown market or slot, `Conflict` if the range
    /// overlaps an active booking or live hold.
    pub async fn create_booking_direct(
        &self,
        caller: &UserId,
        market_id: MarketId,
        slot_id: SlotId,
        period: &PeriodRequest,
    ) -> Result<Booking, BookingError> {
        let body = CreateDirect {
            caller: caller.clone(),
            market_id,
            slot_id,
            period: period.resolve()?,
            booking_id: BookingId::new(),
            now: self.clock.now(),
        };
        let (booking, market) = run_transaction(self.store.as_ref(), &body).await?;
        tracing::info!(
            booking_id = %booking.id,
            %market_id,
            user = %caller,
            "booking created directly"
        );
        self.announce(&booking, &market).await;
        Ok(booking)
    }

    /// Lists a market's bookings, oldest first, optionally only active
    /// ones.
    ///
    /// # Errors
    ///
    /// `NotFound` if the market does not exist.
    pub async fn bookings_by_market(
        &self,
        market_id: MarketId,
        active_only: bool,
    ) -> Result<Vec<Booking>, BookingError> {
        if self.store.get_market(market_id).await?.is_none() {
            return Err(BookingError::NotFound(format!("market {market_id}")));
        }
        let mut bookings = self.store.bookings_by_market(market_id).await?;
        if active_only {
            bookings.retain(Booking::is_active);
        }
        Ok(bookings)
    }

    /// Lists bookings requested by `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn bookings_for_user(&self, user_id: &UserId) -> Result<Vec<Booking>, BookingError> {
        Ok(self.store.bookings_by_user(user_id).await?)
    }

    async fn announce(&self, booking: &Booking, market: &Market) {
        let now = self.clock.now();
        let range = booking.range();
        notify_best_effort(
            self.notifier.as_ref(),
            Notification::new(
                market.owner_id.clone(),
                NotificationKind::BookingCreated,
                "New booking request",
                format!(
                    "{} requested slot {} at {} for {range}",
                    booking.user_id, booking.slot_id, market.name
                ),
                booking_payload(booking),
                now,
            ),
        )
        .await;
        let mut data = booking_payload(booking);
        if let Some(fields) = data.as_object_mut() {
            fields.insert("market_name".to_string(), json!(market.name));
        }
        notify_best_effort(
            self.notifier.as_ref(),
            Notification::new(
                booking.user_id.clone(),
                NotificationKind::BookingSubmitted,
                "Booking submitted",
                format!(
                    "Your request for slot {} at {} ({range}) is waiting for approval",
                    booking.slot_id, market.name
                ),
                data,
                now,
            ),
        )
        .await;
    }
}
