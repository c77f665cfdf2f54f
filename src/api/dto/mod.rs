//! Data Transfer Objects for REST request/response serialization.
//!
//! Dates travel as `YYYY-MM-DD` strings, months as `YYYY-MM`, instants as
//! RFC 3339 timestamps.

pub mod booking_dto;
pub mod hold_dto;
pub mod market_dto;
pub mod notification_dto;

pub use booking_dto::*;
pub use hold_dto::*;
pub use market_dto::*;
pub use notification_dto::*;
