//! Hold DTOs: place a hold and confirm it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{BookingKind, MarketId, PaymentEvidence};
use crate::service::HoldReceipt;

/// Request body for `POST /holds`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct HoldRequest {
    /// Market of the slot.
    #[schema(value_type = String, format = Uuid)]
    pub market_id: MarketId,
    /// Slot to hold.
    pub slot_id: String,
    /// First day, `YYYY-MM-DD`.
    pub from: String,
    /// Last day, `YYYY-MM-DD`.
    pub to: String,
}

/// Response body for `POST /holds` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
pub struct HoldResponse {
    /// Id to pass to the confirm call.
    pub lock_id: String,
    /// Confirmation deadline.
    pub expires_at: DateTime<Utc>,
}

impl From<HoldReceipt> for HoldResponse {
    fn from(receipt: HoldReceipt) -> Self {
        Self {
            lock_id: receipt.lock_id.to_string(),
            expires_at: receipt.expires_at,
        }
    }
}

/// Request body for `POST /holds/{lock_id}/confirm`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmRequest {
    /// Booking kind; `monthly` needs a hold spanning whole months.
    pub kind: BookingKind,
    /// Payment slip already uploaded elsewhere.
    #[serde(default)]
    pub payment_evidence: Option<PaymentEvidence>,
}
