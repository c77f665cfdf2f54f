//! Markets and their slot layouts.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::booking::BookingKind;
use super::{MarketId, SlotId, UserId};
use crate::error::BookingError;

/// Which booking kinds a slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SlotCapability {
    /// Daily bookings only.
    Daily,
    /// Monthly bookings only.
    Monthly,
    /// Both daily and monthly bookings.
    Both,
}

impl SlotCapability {
    /// Returns `true` if a booking of `kind` may be placed on the slot.
    #[must_use]
    pub const fn supports(self, kind: BookingKind) -> bool {
        matches!(
            (self, kind),
            (Self::Both, _)
                | (Self::Daily, BookingKind::Daily)
                | (Self::Monthly, BookingKind::Monthly)
        )
    }
}

/// Grid placement of a slot in the market map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GridPosition {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Width in grid cells.
    pub w: u32,
    /// Height in grid cells.
    pub h: u32,
}

/// A rentable position in a market layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SlotDefinition {
    /// Stable id referenced by bookings.
    #[schema(value_type = String)]
    pub slot_id: SlotId,
    /// Placement on the market grid.
    #[serde(default)]
    pub position: GridPosition,
    /// Accepted booking kinds.
    pub capability: SlotCapability,
    /// Price per day, if daily bookings are offered.
    #[serde(default)]
    pub price_daily: Option<u64>,
    /// Price per month, if monthly bookings are offered.
    #[serde(default)]
    pub price_monthly: Option<u64>,
}

/// A market and its owner-defined layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    /// Market identifier.
    pub id: MarketId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Human-readable location.
    pub location: String,
    /// Owner who approves bookings.
    pub owner_id: UserId,
    /// Ordered slot definitions.
    pub layout: Vec<SlotDefinition>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Market {
    /// Looks up a slot by id.
    #[must_use]
    pub fn slot(&self, slot_id: &SlotId) -> Option<&SlotDefinition> {
        self.layout.iter().find(|s| &s.slot_id == slot_id)
    }

    /// Looks up a slot by id, failing with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] if the layout has no such slot.
    pub fn require_slot(&self, slot_id: &SlotId) -> Result<&SlotDefinition, BookingError> {
        self.slot(slot_id).ok_or_else(|| {
            BookingError::NotFound(format!("slot {slot_id} in market {}", self.id))
        })
    }

    /// Checks that `user` owns this market.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::PermissionDenied`] otherwise.
    pub fn require_owner(&self, user: &UserId) -> Result<(), BookingError> {
        if &self.owner_id == user {
            Ok(())
        } else {
            Err(BookingError::PermissionDenied(format!(
                "only the owner of market {} may do this",
                self.id
            )))
        }
    }
}

/// Validates a layout: slot ids must be non-empty and unique.
///
/// # Errors
///
/// Returns [`BookingError::InvalidArgument`] describing the first problem.
pub fn validate_layout(layout: &[SlotDefinition]) -> Result<(), BookingError> {
    let mut seen = HashSet::with_capacity(layout.len());
    for slot in layout {
        if slot.slot_id.as_str().trim().is_empty() {
            return Err(BookingError::InvalidArgument(
                "slot id must not be empty".to_string(),
            ));
        }
        if !seen.insert(&slot.slot_id) {
            return Err(BookingError::InvalidArgument(format!(
                "duplicate slot id {}",
                slot.slot_id
            )));
        }
    }
    Ok(())
}
