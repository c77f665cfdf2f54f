//! Booking DTOs for direct creation, status changes and listings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    Booking, BookingKind, BookingPeriod, BookingStatus, ContactSnapshot, MarketId,
    PaymentEvidence, PaymentStatus, PriceSnapshot,
};
use crate::service::PeriodRequest;

/// Request body for `POST /bookings`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DirectBookingRequest {
    /// Market of the slot.
    #[schema(value_type = String, format = Uuid)]
    pub market_id: MarketId,
    /// Slot to book.
    pub slot_id: String,
    /// Requested period.
    pub period: PeriodRequest,
}

/// Request body for `POST /bookings/{id}/status`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusUpdateRequest {
    /// Target booking status.
    pub status: BookingStatus,
}

/// Request body for `POST /bookings/{id}/payment-status`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentUpdateRequest {
    /// Target payment status.
    pub payment_status: PaymentStatus,
}

/// Query of `POST /bookings/{id}/payment-slip`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SlipUploadParams {
    /// Original file name of the slip.
    pub file_name: String,
}

/// Query of `GET /markets/{id}/bookings`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookingListParams {
    /// Only bookings that are neither rejected nor cancelled.
    #[serde(default)]
    pub active_only: bool,
}

/// A booking as returned by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct BookingDto {
    /// Booking id.
    #[schema(value_type = String, format = Uuid)]
    pub id: String,
    /// Market id.
    #[schema(value_type = String, format = Uuid)]
    pub market_id: String,
    /// Slot id.
    pub slot_id: String,
    /// Requesting user.
    pub user_id: String,
    /// Booking kind.
    pub kind: BookingKind,
    /// First booked day.
    pub from: NaiveDate,
    /// Last booked day.
    pub to: NaiveDate,
    /// First month, for monthly bookings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_month: Option<String>,
    /// Month count, for monthly bookings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub months: Option<u32>,
    /// Approval status.
    pub status: BookingStatus,
    /// Payment status.
    pub payment_status: PaymentStatus,
    /// Requester contact at creation time.
    pub contact: ContactSnapshot,
    /// Slot prices at creation time.
    pub price: PriceSnapshot,
    /// Uploaded payment slip.
    pub payment_evidence: Option<PaymentEvidence>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingDto {
    fn from(booking: Booking) -> Self {
        let range = booking.range();
        let (start_month, months) = match booking.period {
            BookingPeriod::Monthly {
                start_month,
                months,
            } => (Some(start_month.format("%Y-%m").to_string()), Some(months)),
            BookingPeriod::Daily { .. } => (None, None),
        };
        Self {
            id: booking.id.to_string(),
            market_id: booking.market_id.to_string(),
            slot_id: booking.slot_id.to_string(),
            user_id: booking.user_id.to_string(),
            kind: booking.period.kind(),
            from: range.start,
            to: range.end,
            start_month,
            months,
            status: booking.status,
            payment_status: booking.payment_status,
            contact: booking.contact,
            price: booking.price,
            payment_evidence: booking.payment_evidence,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

impl BookingDto {
    /// Strips the requester's personal details for non-owners.
    #[must_use]
    pub fn redacted(mut self) -> Self {
        self.contact = ContactSnapshot::default();
        self.payment_evidence = None;
        self
    }
}
