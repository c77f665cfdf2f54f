//! Booking and payment status state machines.
//!
//! ```text
//! pending ──► approved ──► paid
//!    │  │        │  │
//!    │  └────────┼──┴──► cancelled
//!    └──────► rejected ◄─┘
//! ```
//!
//! Payment status runs alongside: `none → waiting → {paid, rejected}`.
//! Approving a booking defaults an unset payment status to `waiting`;
//! a `paid` payment forces the booking to `approved` and a `rejected`
//! payment forces it to `rejected`.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::BookingError;

/// Approval status of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Awaiting the owner's decision.
    Pending,
    /// Accepted by the owner, payment outstanding or confirmed.
    Approved,
    /// Fully settled.
    Paid,
    /// Declined by the owner, or payment rejected.
    Rejected,
    /// Withdrawn before settlement.
    Cancelled,
}

impl BookingStatus {
    /// Lowercase name as used on the wire and in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Paid => "paid",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal states admit no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Rejected | Self::Cancelled)
    }

    /// Active bookings take part in overlap checks.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Rejected | Self::Cancelled)
    }

    /// Whether `self → next` is a legal owner-driven transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Rejected | Self::Cancelled)
                | (Self::Approved, Self::Paid | Self::Rejected | Self::Cancelled)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status of a booking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Nothing requested or submitted yet.
    #[default]
    None,
    /// Payment expected or evidence under review.
    Waiting,
    /// Payment accepted.
    Paid,
    /// Payment refused.
    Rejected,
}

impl PaymentStatus {
    /// Lowercase name as used on the wire and in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Waiting => "waiting",
            Self::Paid => "paid",
            Self::Rejected => "rejected",
        }
    }

    /// Whether `self → next` is a legal owner-driven payment transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::None, Self::Waiting | Self::Paid | Self::Rejected)
                | (Self::Waiting, Self::Paid | Self::Rejected)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resulting pair of statuses after a planned transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    /// New booking status.
    pub status: BookingStatus,
    /// New payment status.
    pub payment_status: PaymentStatus,
}

/// Plans an owner-driven booking status transition.
///
/// # Errors
///
/// Returns [`BookingError::InvalidTransition`] if `current → next` is not
/// in the state machine.
pub fn plan_status_update(
    current: BookingStatus,
    payment: PaymentStatus,
    next: BookingStatus,
) -> Result<StatusChange, BookingError> {
    if !current.can_transition_to(next) {
        return Err(BookingError::InvalidTransition {
            from: current.to_string(),
            to: next.to_string(),
        });
    }
    let payment_status = match (next, payment) {
        (BookingStatus::Approved, PaymentStatus::None) => PaymentStatus::Waiting,
        (BookingStatus::Paid, _) => PaymentStatus::Paid,
        (_, unchanged) => unchanged,
    };
    Ok(StatusChange {
        status: next,
        payment_status,
    })
}

/// Plans an owner-driven payment status transition, including the forced
/// booking status it implies.
///
/// # Errors
///
/// Returns [`BookingError::InvalidTransition`] if the booking is already
/// terminal or the payment transition is illegal.
pub fn plan_payment_update(
    current: BookingStatus,
    payment: PaymentStatus,
    next: PaymentStatus,
) -> Result<StatusChange, BookingError> {
    if current.is_terminal() || !payment.can_transition_to(next) {
        return Err(BookingError::InvalidTransition {
            from: format!("{current}/{payment}"),
            to: format!("payment {next}"),
        });
    }
    let status = match next {
        PaymentStatus::Paid => BookingStatus::Approved,
        PaymentStatus::Rejected => BookingStatus::Rejected,
        PaymentStatus::None | PaymentStatus::Waiting => current,
    };
    Ok(StatusChange {
        status,
        payment_status: next,
    })
}

/// Plans the effect of a requester uploading payment evidence.
///
/// Evidence can be (re)submitted while the booking is live and payment
/// has not been decided.
///
/// # Errors
///
/// Returns [`BookingError::InvalidTransition`] otherwise.
pub fn plan_evidence_upload(
    current: BookingStatus,
    payment: PaymentStatus,
) -> Result<StatusChange, BookingError> {
    if current.is_terminal() || !matches!(payment, PaymentStatus::None | PaymentStatus::Waiting) {
        return Err(BookingError::InvalidTransition {
            from: format!("{current}/{payment}"),
            to: "payment evidence upload".to_string(),
        });
    }
    Ok(StatusChange {
        status: current,
        payment_status: PaymentStatus::Waiting,
    })
}
