//! Hold handlers: place a hold, confirm it into a booking.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{BookingDto, ConfirmRequest, HoldRequest, HoldResponse};
use crate::api::extract::{Caller, JsonBody, PathParam};
use crate::app_state::AppState;
use crate::domain::{DateRange, LockId, SlotId};
use crate::error::{BookingError, ErrorResponse};

/// `POST /holds`: Hold a slot for ten minutes.
///
/// # Errors
///
/// `InvalidArgument` on bad dates, `NotFound` for an unknown market or
/// slot, `AlreadyHeld` or `Conflict` when the range is taken.
#[utoipa::path(
    post,
    path = "/api/v1/holds",
    tag = "Holds",
    summary = "Hold a slot",
    description = "Places a ten-minute hold on a slot for an inclusive day range. The hold blocks overlapping holds and bookings until it is confirmed or expires.",
    request_body = HoldRequest,
    responses(
        (status = 201, description = "Hold placed", body = HoldResponse),
        (status = 400, description = "Invalid date range", body = ErrorResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
        (status = 404, description = "Market or slot not found", body = ErrorResponse),
        (status = 409, description = "Range already held or booked", body = ErrorResponse),
    )
)]
pub async fn hold_slot(
    State(state): State<AppState>,
    Caller(user): Caller,
    JsonBody(req): JsonBody<HoldRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let range = DateRange::parse(&req.from, &req.to)?;
    let receipt = state
        .booking_service
        .hold_slot(&user, req.market_id, SlotId::new(req.slot_id), range)
        .await?;
    Ok((StatusCode::CREATED, Json(HoldResponse::from(receipt))))
}

/// `POST /holds/{lock_id}/confirm`: Turn a live hold into a booking.
///
/// # Errors
///
/// `NotFound`, `PermissionDenied`, `FailedPrecondition` for a consumed
/// hold, `DeadlineExceeded` once the hold lapsed, `Conflict` if the time
/// was taken meanwhile.
#[utoipa::path(
    post,
    path = "/api/v1/holds/{lock_id}/confirm",
    tag = "Holds",
    summary = "Confirm a hold",
    description = "Creates a pending booking from the caller's live hold. The overlap check is repeated atomically with the insert.",
    params(
        ("lock_id" = String, Path, description = "Hold id returned by POST /holds"),
    ),
    request_body = ConfirmRequest,
    responses(
        (status = 201, description = "Booking created", body = BookingDto),
        (status = 400, description = "Kind does not fit the hold or slot", body = ErrorResponse),
        (status = 403, description = "Hold belongs to another user", body = ErrorResponse),
        (status = 404, description = "Hold not found", body = ErrorResponse),
        (status = 409, description = "Time just got taken", body = ErrorResponse),
        (status = 410, description = "Hold expired", body = ErrorResponse),
        (status = 412, description = "Hold no longer active", body = ErrorResponse),
    )
)]
pub async fn confirm_hold(
    State(state): State<AppState>,
    Caller(user): Caller,
    PathParam(lock_id): PathParam<String>,
    JsonBody(req): JsonBody<ConfirmRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state
        .booking_service
        .confirm_booking(&user, &LockId::new(lock_id), req.kind, req.payment_evidence)
        .await?;
    Ok((StatusCode::CREATED, Json(BookingDto::from(booking))))
}

/// Hold routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/holds", post(hold_slot))
        .route("/holds/{lock_id}/confirm", post(confirm_hold))
}
