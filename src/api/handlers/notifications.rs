//! Notification inbox handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::NotificationDto;
use crate::api::extract::{Caller, PathParam};
use crate::app_state::AppState;
use crate::domain::NotificationId;
use crate::error::{BookingError, ErrorResponse};

/// `GET /notifications`: The caller's inbox, newest first.
///
/// # Errors
///
/// `Unauthenticated` without a caller.
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    tag = "Notifications",
    summary = "List my notifications",
    responses(
        (status = 200, description = "Caller's notifications", body = Vec<NotificationDto>),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Caller(user): Caller,
) -> Result<impl IntoResponse, BookingError> {
    let notifications = state.booking_service.notifications(&user).await?;
    let body: Vec<NotificationDto> = notifications
        .into_iter()
        .map(NotificationDto::from)
        .collect();
    Ok(Json(body))
}

/// `POST /notifications/{id}/read`: Mark one notification read.
///
/// # Errors
///
/// `NotFound`, or `PermissionDenied` for someone else's notification.
#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    tag = "Notifications",
    summary = "Mark a notification read",
    params(
        ("id" = uuid::Uuid, Path, description = "Notification UUID"),
    ),
    responses(
        (status = 204, description = "Marked read"),
        (status = 403, description = "Addressed to another user", body = ErrorResponse),
        (status = 404, description = "Notification not found", body = ErrorResponse),
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    Caller(user): Caller,
    PathParam(id): PathParam<uuid::Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    state
        .booking_service
        .mark_notification_read(&user, NotificationId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Notification routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}/read", post(mark_read))
}
