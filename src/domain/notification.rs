//! Notification records addressed to a single user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{NotificationId, UserId};

/// Type tag of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Sent to a market owner when a booking request arrives.
    BookingCreated,
    /// Sent to the requester confirming their request was recorded.
    BookingSubmitted,
    /// Sent when a booking or its payment changes status.
    BookingStatusChanged,
    /// Sent to a market owner when a requester uploads a payment slip.
    PaymentSlipUploaded,
}

impl NotificationKind {
    /// Lowercase name as used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BookingCreated => "booking_created",
            Self::BookingSubmitted => "booking_submitted",
            Self::BookingStatusChanged => "booking_status_changed",
            Self::PaymentSlipUploaded => "payment_slip_uploaded",
        }
    }
}

/// An append-only message for one user. Only `read` ever changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification identifier.
    pub id: NotificationId,
    /// Recipient.
    pub to_user_id: UserId,
    /// Type tag.
    pub kind: NotificationKind,
    /// Short title.
    pub title: String,
    /// Human-readable body.
    pub message: String,
    /// Free-form payload; always carries `booking_id` and `status`.
    pub data: serde_json::Value,
    /// Whether the recipient has seen it.
    pub read: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Creates an unread notification.
    #[must_use]
    pub fn new(
        to_user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        data: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            to_user_id,
            kind,
            title: title.into(),
            message: message.into(),
            data,
            read: false,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_notification_is_unread() {
        let n = Notification::new(
            UserId::from("alice"),
            NotificationKind::BookingSubmitted,
            "Booking submitted",
            "pending",
            serde_json::json!({ "booking_id": "b1", "status": "pending" }),
            Utc::now(),
        );
        assert!(!n.read);
        assert_eq!(n.kind.as_str(), "booking_submitted");
        let json = serde_json::to_string(&n).unwrap_or_default();
        assert!(json.contains("\"kind\":\"booking_submitted\""));
    }
}
