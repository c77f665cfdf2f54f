//! REST endpoint handlers organized by resource.

pub mod bookings;
pub mod holds;
pub mod markets;
pub mod notifications;
pub mod profile;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(markets::routes())
        .merge(holds::routes())
        .merge(bookings::routes())
        .merge(notifications::routes())
        .merge(profile::routes())
}
