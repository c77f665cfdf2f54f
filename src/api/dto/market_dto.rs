//! Market DTOs: create, layout replacement, detail and availability.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Market, SlotDefinition};
use crate::service::NewMarket;

/// Request body for `POST /markets`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMarketRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Human-readable location.
    #[serde(default)]
    pub location: String,
    /// Initial layout.
    #[serde(default)]
    pub layout: Vec<SlotDefinition>,
}

impl From<CreateMarketRequest> for NewMarket {
    fn from(req: CreateMarketRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            location: req.location,
            layout: req.layout,
        }
    }
}

/// Request body for `PUT /markets/{id}/layout`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplaceLayoutRequest {
    /// New ordered slot definitions.
    pub layout: Vec<SlotDefinition>,
}

/// A market as returned by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct MarketDto {
    /// Market id.
    #[schema(value_type = String, format = Uuid)]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Human-readable location.
    pub location: String,
    /// Owner user id.
    pub owner_id: String,
    /// Ordered slot definitions.
    pub layout: Vec<SlotDefinition>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Market> for MarketDto {
    fn from(market: Market) -> Self {
        Self {
            id: market.id.to_string(),
            name: market.name,
            description: market.description,
            location: market.location,
            owner_id: market.owner_id.to_string(),
            layout: market.layout,
            created_at: market.created_at,
            updated_at: market.updated_at,
        }
    }
}

/// Query of `GET /markets/{id}/availability`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityParams {
    /// Slot to check.
    pub slot_id: String,
    /// First day, `YYYY-MM-DD`.
    pub from: String,
    /// Last day, `YYYY-MM-DD`.
    pub to: String,
}

/// Response body for `GET /markets/{id}/availability`.
#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityResponse {
    /// Checked slot.
    pub slot_id: String,
    /// First checked day.
    pub from: NaiveDate,
    /// Last checked day.
    pub to: NaiveDate,
    /// `false` if an active booking or live hold overlaps.
    pub available: bool,
}
