//! Notification DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Notification, NotificationKind};

/// A notification as returned by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationDto {
    /// Notification id.
    #[schema(value_type = String, format = Uuid)]
    pub id: String,
    /// Type tag.
    pub kind: NotificationKind,
    /// Short title.
    pub title: String,
    /// Human-readable body.
    pub message: String,
    /// Related booking id, status and context.
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    /// Whether it has been read.
    pub read: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationDto {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id.to_string(),
            kind: n.kind,
            title: n.title,
            message: n.message,
            data: n.data,
            read: n.read,
            created_at: n.created_at,
        }
    }
}
