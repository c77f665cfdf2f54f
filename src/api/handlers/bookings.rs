//! Booking handlers: direct creation, reads and the approval workflow.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    BookingDto, DirectBookingRequest, PaymentUpdateRequest, SlipUploadParams, StatusUpdateRequest,
};
use crate::api::extract::{Caller, JsonBody, PathParam, QueryParams};
use crate::app_state::AppState;
use crate::domain::{BookingId, SlotId};
use crate::error::{BookingError, ErrorResponse};

/// `POST /bookings`: Create a booking without a prior hold.
///
/// # Errors
///
/// `InvalidArgument` on a malformed period, `NotFound` for an unknown
/// market or slot, `Conflict` when the range is taken.
#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    tag = "Bookings",
    summary = "Create a booking directly",
    description = "Validates the period, checks for overlapping bookings and holds, and inserts a pending booking in one transaction.",
    request_body = DirectBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = BookingDto),
        (status = 400, description = "Invalid period", body = ErrorResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
        (status = 404, description = "Market or slot not found", body = ErrorResponse),
        (status = 409, description = "Range already booked or held", body = ErrorResponse),
    )
)]
pub async fn create_booking(
    State(state): State<AppState>,
    Caller(user): Caller,
    JsonBody(req): JsonBody<DirectBookingRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state
        .booking_service
        .create_booking_direct(&user, req.market_id, SlotId::new(req.slot_id), &req.period)
        .await?;
    Ok((StatusCode::CREATED, Json(BookingDto::from(booking))))
}

/// `GET /bookings/mine`: The caller's bookings, newest first.
///
/// # Errors
///
/// `Unauthenticated` without a caller.
#[utoipa::path(
    get,
    path = "/api/v1/bookings/mine",
    tag = "Bookings",
    summary = "List my bookings",
    responses(
        (status = 200, description = "Caller's bookings", body = Vec<BookingDto>),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
    )
)]
pub async fn my_bookings(
    State(state): State<AppState>,
    Caller(user): Caller,
) -> Result<impl IntoResponse, BookingError> {
    let bookings = state.booking_service.my_bookings(&user).await?;
    let body: Vec<BookingDto> = bookings.into_iter().map(BookingDto::from).collect();
    Ok(Json(body))
}

/// `GET /bookings/{id}`: One booking, for its requester or the market owner.
///
/// # Errors
///
/// `NotFound`, or `PermissionDenied` for anyone else.
#[utoipa::path(
    get,
    path = "/api/v1/bookings/{id}",
    tag = "Bookings",
    summary = "Get a booking",
    params(
        ("id" = uuid::Uuid, Path, description = "Booking UUID"),
    ),
    responses(
        (status = 200, description = "Booking details", body = BookingDto),
        (status = 403, description = "Not the requester or owner", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
    )
)]
pub async fn get_booking(
    State(state): State<AppState>,
    Caller(user): Caller,
    PathParam(id): PathParam<uuid::Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state
        .booking_service
        .booking(&user, BookingId::from_uuid(id))
        .await?;
    Ok(Json(BookingDto::from(booking)))
}

/// `POST /bookings/{id}/status`: Owner approves or rejects; `paid` settles.
///
/// # Errors
///
/// `PermissionDenied` for non-owners, `InvalidTransition` for moves the
/// status machine forbids.
#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/status",
    tag = "Bookings",
    summary = "Update booking status",
    description = "Applies a status transition. Approving a booking without payment information sets payment to waiting; marking it paid also settles the payment.",
    params(
        ("id" = uuid::Uuid, Path, description = "Booking UUID"),
    ),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Updated booking", body = BookingDto),
        (status = 403, description = "Not the market owner", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 412, description = "Transition not allowed", body = ErrorResponse),
    )
)]
pub async fn update_status(
    State(state): State<AppState>,
    Caller(user): Caller,
    PathParam(id): PathParam<uuid::Uuid>,
    JsonBody(req): JsonBody<StatusUpdateRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state
        .booking_service
        .update_booking_status(&user, BookingId::from_uuid(id), req.status)
        .await?;
    Ok(Json(BookingDto::from(booking)))
}

/// `POST /bookings/{id}/payment-status`: Owner records a payment outcome.
///
/// # Errors
///
/// `PermissionDenied` for non-owners, `InvalidTransition` for forbidden
/// payment moves or a terminal booking.
#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/payment-status",
    tag = "Bookings",
    summary = "Update payment status",
    description = "Applies a payment transition. A paid payment approves the booking; a rejected payment rejects it.",
    params(
        ("id" = uuid::Uuid, Path, description = "Booking UUID"),
    ),
    request_body = PaymentUpdateRequest,
    responses(
        (status = 200, description = "Updated booking", body = BookingDto),
        (status = 403, description = "Not the market owner", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 412, description = "Transition not allowed", body = ErrorResponse),
    )
)]
pub async fn update_payment_status(
    State(state): State<AppState>,
    Caller(user): Caller,
    PathParam(id): PathParam<uuid::Uuid>,
    JsonBody(req): JsonBody<PaymentUpdateRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state
        .booking_service
        .update_payment_status(&user, BookingId::from_uuid(id), req.payment_status)
        .await?;
    Ok(Json(BookingDto::from(booking)))
}

/// `POST /bookings/{id}/payment-slip`: Requester uploads a payment slip.
///
/// The request body is the raw file.
///
/// # Errors
///
/// `InvalidArgument` for an empty file or name, `PermissionDenied` for
/// anyone but the requester, `FailedPrecondition` once settled.
#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/payment-slip",
    tag = "Bookings",
    summary = "Upload a payment slip",
    description = "Stores the slip, attaches its URL to the booking and moves payment to waiting. The market owner is notified.",
    params(
        ("id" = uuid::Uuid, Path, description = "Booking UUID"),
        SlipUploadParams,
    ),
    request_body(content = String, content_type = "application/octet-stream", description = "Slip file contents"),
    responses(
        (status = 200, description = "Updated booking", body = BookingDto),
        (status = 400, description = "Empty file or name", body = ErrorResponse),
        (status = 403, description = "Not the requester", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 412, description = "Payment already settled", body = ErrorResponse),
    )
)]
pub async fn upload_payment_slip(
    State(state): State<AppState>,
    Caller(user): Caller,
    PathParam(id): PathParam<uuid::Uuid>,
    QueryParams(params): QueryParams<SlipUploadParams>,
    body: Bytes,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state
        .booking_service
        .upload_payment_evidence(&user, BookingId::from_uuid(id), &params.file_name, body.to_vec())
        .await?;
    Ok(Json(BookingDto::from(booking)))
}

/// `POST /bookings/{id}/cancel`: Requester or owner withdraws a booking.
///
/// # Errors
///
/// `PermissionDenied` for third parties, `InvalidTransition` once the
/// booking is paid, rejected or cancelled.
#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/cancel",
    tag = "Bookings",
    summary = "Cancel a booking",
    params(
        ("id" = uuid::Uuid, Path, description = "Booking UUID"),
    ),
    responses(
        (status = 200, description = "Cancelled booking", body = BookingDto),
        (status = 403, description = "Not the requester or owner", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 412, description = "Booking can no longer be cancelled", body = ErrorResponse),
    )
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    Caller(user): Caller,
    PathParam(id): PathParam<uuid::Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state
        .booking_service
        .cancel_booking(&user, BookingId::from_uuid(id))
        .await?;
    Ok(Json(BookingDto::from(booking)))
}

/// Booking routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/mine", get(my_bookings))
        .route("/bookings/{id}", get(get_booking))
        .route("/bookings/{id}/status", post(update_status))
        .route("/bookings/{id}/payment-status", post(update_payment_status))
        .route("/bookings/{id}/payment-slip", post(upload_payment_slip))
        .route("/bookings/{id}/cancel", post(cancel_booking))
}
