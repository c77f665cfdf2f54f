//! Profile handlers. The profile is what bookings snapshot as contact.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::extract::{Caller, JsonBody};
use crate::app_state::AppState;
use crate::domain::UserProfile;
use crate::error::{BookingError, ErrorResponse};

/// `GET /profile`: The caller's profile; empty fields if never saved.
///
/// # Errors
///
/// `Unauthenticated` without a caller.
#[utoipa::path(
    get,
    path = "/api/v1/profile",
    tag = "Profile",
    summary = "Get my profile",
    responses(
        (status = 200, description = "Caller's profile", body = UserProfile),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Caller(user): Caller,
) -> Result<impl IntoResponse, BookingError> {
    Ok(Json(state.booking_service.profile(&user).await?))
}

/// `PUT /profile`: Replace the caller's profile.
///
/// Existing bookings keep the contact they were created with.
///
/// # Errors
///
/// `Unauthenticated` without a caller.
#[utoipa::path(
    put,
    path = "/api/v1/profile",
    tag = "Profile",
    summary = "Save my profile",
    request_body = UserProfile,
    responses(
        (status = 200, description = "Saved profile", body = UserProfile),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
    )
)]
pub async fn put_profile(
    State(state): State<AppState>,
    Caller(user): Caller,
    JsonBody(profile): JsonBody<UserProfile>,
) -> Result<impl IntoResponse, BookingError> {
    Ok(Json(state.booking_service.save_profile(&user, profile).await?))
}

/// Profile routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(put_profile))
}
