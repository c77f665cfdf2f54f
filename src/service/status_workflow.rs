//! Owner and requester driven changes to an existing booking.
//!
//! Every change is one transaction over the booking document. The
//! counterpart is notified afterwards; a failed notification is logged
//! and the committed change stands.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use super::notifier::{Notifier, booking_payload, notify_best_effort};
use crate::blob::BlobStore;
use crate::clock::Clock;
use crate::domain::status::{plan_evidence_upload, plan_payment_update, plan_status_update};
use crate::domain::{
    Booking, BookingId, BookingStatus, Market, Notification, NotificationKind, PaymentEvidence,
    PaymentStatus, UserId,
};
use crate::error::BookingError;
use crate::store::{DocumentStore, Transaction, TransactionBody, run_transaction};

#[derive(Debug, Clone)]
enum Change {
    Status(BookingStatus),
    Payment(PaymentStatus),
    Evidence(PaymentEvidence),
    Cancel,
}

/// Outcome of one committed change.
struct Applied {
    previous: BookingStatus,
    booking: Booking,
    market: Market,
}

struct ApplyChange {
    caller: UserId,
    booking_id: BookingId,
    change: Change,
    now: DateTime<Utc>,
}

fn require_requester(booking: &Booking, caller: &UserId) -> Result<(), BookingError> {
    if &booking.user_id == caller {
        Ok(())
    } else {
        Err(BookingError::PermissionDenied(format!(
            "booking {} belongs to another user",
            booking.id
        )))
    }
}

#[async_trait]
impl TransactionBody for ApplyChange {
    type Output = Applied;

    async fn run(&self, tx: &mut dyn Transaction) -> Result<Applied, BookingError> {
        let mut booking = tx
            .booking(self.booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", self.booking_id)))?;
        let market = tx
            .market(booking.market_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("market {}", booking.market_id)))?;

        let planned = match &self.change {
            Change::Status(next) => {
                market.require_owner(&self.caller)?;
                plan_status_update(booking.status, booking.payment_status, *next)?
            }
            Change::Payment(next) => {
                market.require_owner(&self.caller)?;
                plan_payment_update(booking.status, booking.payment_status, *next)?
            }
            Change::Evidence(_) => {
                require_requester(&booking, &self.caller)?;
                plan_evidence_upload(booking.status, booking.payment_status)?
            }
            Change::Cancel => {
                if booking.user_id != self.caller && market.owner_id != self.caller {
                    return Err(BookingError::PermissionDenied(format!(
                        "only the requester or the market owner may cancel booking {}",
                        booking.id
                    )));
                }
                plan_status_update(
                    booking.status,
                    booking.payment_status,
                    BookingStatus::Cancelled,
                )?
            }
        };

        let previous = booking.status;
        booking.status = planned.status;
        booking.payment_status = planned.payment_status;
        if let Change::Evidence(evidence) = &self.change {
            booking.payment_evidence = Some(evidence.clone());
        }
        booking.updated_at = self.now;
        tx.put_booking(booking.clone()).await?;
        Ok(Applied {
            previous,
            booking,
            market,
        })
    }
}

/// Drives booking and payment status after creation.
#[derive(Debug, Clone)]
pub struct StatusWorkflow {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    blobs: Arc<dyn BlobStore>,
}

impl StatusWorkflow {
    /// Creates a workflow.
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
            blobs,
        }
    }

    /// Moves a booking to `next`. Owner only.
    ///
    /// Approving a booking whose payment status is `none` sets it to
    /// `waiting`; marking it `paid` also marks payment `paid`.
    ///
    /// # Errors
    ///
    /// `NotFound`, `PermissionDenied`, or `FailedPrecondition` for a
    /// transition outside the state machine.
    pub async fn update_booking_status(
        &self,
        caller: &UserId,
        booking_id: BookingId,
        next: BookingStatus,
    ) -> Result<Booking, BookingError> {
        let applied = self.apply(caller, booking_id, Change::Status(next)).await?;
        tracing::info!(%booking_id, from = %applied.previous, to = %next, "booking status updated");
        self.notify_requester(&applied).await;
        Ok(applied.booking)
    }

    /// Moves payment status to `next`. Owner only.
    ///
    /// `paid` forces the booking to `approved`; `rejected` forces it to
    /// `rejected`.
    ///
    /// # Errors
    ///
    /// `NotFound`, `PermissionDenied`, or `FailedPrecondition` if the
    /// booking is terminal or the payment transition is illegal.
    pub async fn update_payment_status(
        &self,
        caller: &UserId,
        booking_id: BookingId,
        next: PaymentStatus,
    ) -> Result<Booking, BookingError> {
        let applied = self.apply(caller, booking_id, Change::Payment(next)).await?;
        tracing::info!(
            %booking_id,
            payment = %next,
            status = %applied.booking.status,
            "payment status updated"
        );
        self.notify_requester(&applied).await;
        Ok(applied.booking)
    }

    /// Cancels a pending or approved booking. Requester or owner.
    ///
    /// # Errors
    ///
    /// `NotFound`, `PermissionDenied`, or `FailedPrecondition` if the
    /// booking is already terminal.
    pub async fn cancel_booking(
        &self,
        caller: &UserId,
        booking_id: BookingId,
    ) -> Result<Booking, BookingError> {
        let applied = self.apply(caller, booking_id, Change::Cancel).await?;
        tracing::info!(%booking_id, by = %caller, "booking cancelled");
        if caller == &applied.booking.user_id {
            self.send(
                applied.market.owner_id.clone(),
                NotificationKind::BookingStatusChanged,
                &applied,
                "Booking cancelled",
                format!(
                    "{} cancelled their booking of slot {} at {}",
                    applied.booking.user_id, applied.booking.slot_id, applied.market.name
                ),
            )
            .await;
        }
        self.notify_requester(&applied).await;
        Ok(applied.booking)
    }

    /// Uploads a payment slip for the caller's booking and marks payment
    /// `waiting`.
    ///
    /// The slip is stored at
    /// `payment-slips/{user}/{booking}/{millis}_{file_name}`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty file or file name, `NotFound`,
    /// `PermissionDenied` if the caller is not the requester,
    /// `FailedPrecondition` if payment can no longer be evidenced, or a
    /// store error from the blob upload.
    pub async fn upload_payment_evidence(
        &self,
        caller: &UserId,
        booking_id: BookingId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Booking, BookingError> {
        let file_name = file_name
            .rsplit(['/', '\\'])
            .next()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| BookingError::InvalidArgument("file name is required".to_string()))?;
        if bytes.is_empty() {
            return Err(BookingError::InvalidArgument(
                "payment slip is empty".to_string(),
            ));
        }

        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("booking {booking_id}")))?;
        require_requester(&booking, caller)?;
        plan_evidence_upload(booking.status, booking.payment_status)?;

        let now = self.clock.now();
        let storage_path = format!(
            "payment-slips/{caller}/{booking_id}/{}_{file_name}",
            now.timestamp_millis()
        );
        let url = self.blobs.upload(&storage_path, bytes).await?;
        let evidence = PaymentEvidence { url, storage_path };

        let applied = self
            .apply(caller, booking_id, Change::Evidence(evidence))
            .await?;
        tracing::info!(%booking_id, user = %caller, "payment slip uploaded");
        let slip_url = applied
            .booking
            .payment_evidence
            .as_ref()
            .map_or("", |e| e.url.as_str());
        self.send(
            applied.market.owner_id.clone(),
            NotificationKind::PaymentSlipUploaded,
            &applied,
            "Payment slip uploaded",
            format!(
                "{} uploaded a payment slip for slot {} at {} ({slip_url})",
                caller, applied.booking.slot_id, applied.market.name
            ),
        )
        .await;
        self.notify_requester(&applied).await;
        Ok(applied.booking)
    }

    async fn apply(
        &self,
        caller: &UserId,
        booking_id: BookingId,
        change: Change,
    ) -> Result<Applied, BookingError> {
        let body = ApplyChange {
            caller: caller.clone(),
            booking_id,
            change,
            now: self.clock.now(),
        };
        run_transaction(self.store.as_ref(), &body).await
    }

    async fn notify_requester(&self, applied: &Applied) {
        let booking = &applied.booking;
        self.send(
            booking.user_id.clone(),
            NotificationKind::BookingStatusChanged,
            applied,
            format!("Booking {}", booking.status),
            format!(
                "Your booking of slot {} at {} is now {} (payment {})",
                booking.slot_id, applied.market.name, booking.status, booking.payment_status
            ),
        )
        .await;
    }

    async fn send(
        &self,
        to: UserId,
        kind: NotificationKind,
        applied: &Applied,
        title: impl Into<String> + Send,
        message: String,
    ) {
        let mut data = booking_payload(&applied.booking);
        if let Some(fields) = data.as_object_mut() {
            fields.insert("from".to_string(), json!(applied.previous));
            fields.insert("market_name".to_string(), json!(applied.market.name));
        }
        let notification =
            Notification::new(to, kind, title, message, data, self.clock.now());
        notify_best_effort(self.notifier.as_ref(), notification).await;
    }
}
