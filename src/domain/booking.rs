//! The durable booking record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::status::{BookingStatus, PaymentStatus};
use super::{BookingId, DateRange, MarketId, SlotDefinition, SlotId, UserId};

/// Whether a booking is for explicit days or whole months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookingKind {
    /// Explicit inclusive day range.
    Daily,
    /// Run of consecutive calendar months.
    Monthly,
}

impl BookingKind {
    /// Lowercase name as used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Monthly => "monthly",
        }
    }
}

/// The reserved period, shaped by booking kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BookingPeriod {
    /// `from..=to` days.
    Daily {
        /// First day.
        from: NaiveDate,
        /// Last day.
        to: NaiveDate,
    },
    /// `months` months starting at `start_month` (first day of month).
    Monthly {
        /// First day of the first month.
        start_month: NaiveDate,
        /// Number of consecutive months, at least 1.
        months: u32,
    },
}

impl BookingPeriod {
    /// Booking kind of this period.
    #[must_use]
    pub const fn kind(&self) -> BookingKind {
        match self {
            Self::Daily { .. } => BookingKind::Daily,
            Self::Monthly { .. } => BookingKind::Monthly,
        }
    }

    /// Effective closed day range used for overlap checks.
    ///
    /// A monthly period whose stored values cannot produce a range (zero
    /// months, misaligned start) yields a degenerate inverted range that
    /// overlaps nothing.
    #[must_use]
    pub fn effective_range(&self) -> DateRange {
        match *self {
            Self::Daily { from, to } => DateRange {
                start: from,
                end: to,
            },
            Self::Monthly {
                start_month,
                months,
            } => DateRange::months_from(start_month, months).unwrap_or(DateRange {
                start: start_month,
                end: start_month.pred_opt().unwrap_or(start_month),
            }),
        }
    }
}

/// Requester contact details copied at booking time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContactSnapshot {
    /// Display name.
    pub name: String,
    /// Phone number.
    pub phone: String,
    /// Postal address.
    pub address: String,
}

/// Slot prices copied at booking time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PriceSnapshot {
    /// Price per day.
    pub daily: Option<u64>,
    /// Price per month.
    pub monthly: Option<u64>,
}

impl From<&SlotDefinition> for PriceSnapshot {
    fn from(slot: &SlotDefinition) -> Self {
        Self {
            daily: slot.price_daily,
            monthly: slot.price_monthly,
        }
    }
}

/// Reference to an uploaded payment slip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentEvidence {
    /// Public URL returned by the blob store.
    pub url: String,
    /// Storage path inside the blob store.
    pub storage_path: String,
}

/// A reservation of one slot for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking identifier.
    pub id: BookingId,
    /// Market the slot belongs to.
    pub market_id: MarketId,
    /// Reserved slot.
    pub slot_id: SlotId,
    /// Requesting user.
    pub user_id: UserId,
    /// Reserved period.
    pub period: BookingPeriod,
    /// Approval status.
    pub status: BookingStatus,
    /// Payment status, tracked alongside `status`.
    pub payment_status: PaymentStatus,
    /// Requester contact details at creation time.
    pub contact: ContactSnapshot,
    /// Slot prices at creation time.
    pub price: PriceSnapshot,
    /// Uploaded payment slip, if any.
    pub payment_evidence: Option<PaymentEvidence>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Effective closed day range of this booking.
    #[must_use]
    pub fn range(&self) -> DateRange {
        self.period.effective_range()
    }

    /// Returns `true` unless the booking is rejected or cancelled.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Contact details a user keeps on file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Phone number.
    #[serde(default)]
    pub phone: String,
    /// Postal address.
    #[serde(default)]
    pub address: String,
}

impl From<UserProfile> for ContactSnapshot {
    fn from(profile: UserProfile) -> Self {
        Self {
            name: profile.name,
            phone: profile.phone,
            address: profile.address,
        }
    }
}
