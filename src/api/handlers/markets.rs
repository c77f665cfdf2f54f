//! Market handlers: create, layout, listings and availability.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::api::dto::{
    AvailabilityParams, AvailabilityResponse, BookingDto, BookingListParams, CreateMarketRequest,
    MarketDto, ReplaceLayoutRequest,
};
use crate::api::extract::{Caller, JsonBody, PathParam, QueryParams};
use crate::app_state::AppState;
use crate::domain::{DateRange, MarketId, SlotId};
use crate::error::{BookingError, ErrorResponse};

/// `POST /markets`: Create a market owned by the caller.
///
/// # Errors
///
/// `InvalidArgument` for a blank name or an invalid layout.
#[utoipa::path(
    post,
    path = "/api/v1/markets",
    tag = "Markets",
    summary = "Create a market",
    request_body = CreateMarketRequest,
    responses(
        (status = 201, description = "Market created", body = MarketDto),
        (status = 400, description = "Invalid name or layout", body = ErrorResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
    )
)]
pub async fn create_market(
    State(state): State<AppState>,
    Caller(user): Caller,
    JsonBody(req): JsonBody<CreateMarketRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let market = state
        .booking_service
        .create_market(&user, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(MarketDto::from(market))))
}

/// `GET /markets`: All markets.
///
/// # Errors
///
/// Store failures only.
#[utoipa::path(
    get,
    path = "/api/v1/markets",
    tag = "Markets",
    summary = "List markets",
    responses(
        (status = 200, description = "All markets", body = Vec<MarketDto>),
    )
)]
pub async fn list_markets(State(state): State<AppState>) -> Result<impl IntoResponse, BookingError> {
    let markets = state.booking_service.list_markets().await?;
    let body: Vec<MarketDto> = markets.into_iter().map(MarketDto::from).collect();
    Ok(Json(body))
}

/// `GET /markets/{id}`: One market with its layout.
///
/// # Errors
///
/// `NotFound` for an unknown market.
#[utoipa::path(
    get,
    path = "/api/v1/markets/{id}",
    tag = "Markets",
    summary = "Get a market",
    params(
        ("id" = uuid::Uuid, Path, description = "Market UUID"),
    ),
    responses(
        (status = 200, description = "Market details", body = MarketDto),
        (status = 404, description = "Market not found", body = ErrorResponse),
    )
)]
pub async fn get_market(
    State(state): State<AppState>,
    PathParam(id): PathParam<uuid::Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let market = state.booking_service.market(MarketId::from_uuid(id)).await?;
    Ok(Json(MarketDto::from(market)))
}

/// `PUT /markets/{id}/layout`: Owner replaces the slot layout.
///
/// # Errors
///
/// `NotFound`, `PermissionDenied` for non-owners, `InvalidArgument` for
/// an invalid layout.
#[utoipa::path(
    put,
    path = "/api/v1/markets/{id}/layout",
    tag = "Markets",
    summary = "Replace market layout",
    description = "Replaces the ordered slot definitions. Existing bookings keep their slot ids even if a slot is removed.",
    params(
        ("id" = uuid::Uuid, Path, description = "Market UUID"),
    ),
    request_body = ReplaceLayoutRequest,
    responses(
        (status = 200, description = "Updated market", body = MarketDto),
        (status = 400, description = "Invalid layout", body = ErrorResponse),
        (status = 403, description = "Not the market owner", body = ErrorResponse),
        (status = 404, description = "Market not found", body = ErrorResponse),
    )
)]
pub async fn replace_layout(
    State(state): State<AppState>,
    Caller(user): Caller,
    PathParam(id): PathParam<uuid::Uuid>,
    JsonBody(req): JsonBody<ReplaceLayoutRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let market = state
        .booking_service
        .replace_layout(&user, MarketId::from_uuid(id), req.layout)
        .await?;
    Ok(Json(MarketDto::from(market)))
}

/// `GET /markets/{id}/bookings`: Bookings of a market in creation order.
///
/// Readable anonymously so clients can render occupied slots. Contact
/// details and payment slips are only shown to the market owner.
///
/// # Errors
///
/// `NotFound` for an unknown market.
#[utoipa::path(
    get,
    path = "/api/v1/markets/{id}/bookings",
    tag = "Markets",
    summary = "List market bookings",
    params(
        ("id" = uuid::Uuid, Path, description = "Market UUID"),
        BookingListParams,
    ),
    responses(
        (status = 200, description = "Market bookings", body = Vec<BookingDto>),
        (status = 404, description = "Market not found", body = ErrorResponse),
    )
)]
pub async fn market_bookings(
    State(state): State<AppState>,
    caller: Option<Caller>,
    PathParam(id): PathParam<uuid::Uuid>,
    QueryParams(params): QueryParams<BookingListParams>,
) -> Result<impl IntoResponse, BookingError> {
    let market_id = MarketId::from_uuid(id);
    let market = state.booking_service.market(market_id).await?;
    let is_owner = caller.is_some_and(|Caller(user)| user == market.owner_id);
    let bookings = state
        .booking_service
        .bookings_by_market(market_id, params.active_only)
        .await?;
    let body: Vec<BookingDto> = bookings
        .into_iter()
        .map(|b| {
            let dto = BookingDto::from(b);
            if is_owner { dto } else { dto.redacted() }
        })
        .collect();
    Ok(Json(body))
}

/// `GET /markets/{id}/availability`: Whether a slot range is free.
///
/// Advisory only; holding is the authoritative check.
///
/// # Errors
///
/// `InvalidArgument` on bad dates.
#[utoipa::path(
    get,
    path = "/api/v1/markets/{id}/availability",
    tag = "Markets",
    summary = "Check slot availability",
    params(
        ("id" = uuid::Uuid, Path, description = "Market UUID"),
        AvailabilityParams,
    ),
    responses(
        (status = 200, description = "Availability of the range", body = AvailabilityResponse),
        (status = 400, description = "Invalid date range", body = ErrorResponse),
    )
)]
pub async fn availability(
    State(state): State<AppState>,
    PathParam(id): PathParam<uuid::Uuid>,
    QueryParams(params): QueryParams<AvailabilityParams>,
) -> Result<impl IntoResponse, BookingError> {
    let range = DateRange::parse(&params.from, &params.to)?;
    let slot_id = SlotId::new(params.slot_id);
    let taken = state
        .booking_service
        .has_conflict(MarketId::from_uuid(id), &slot_id, &range)
        .await?;
    Ok(Json(AvailabilityResponse {
        slot_id: slot_id.to_string(),
        from: range.start,
        to: range.end,
        available: !taken,
    }))
}

/// Market routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/markets", post(create_market).get(list_markets))
        .route("/markets/{id}", get(get_market))
        .route("/markets/{id}/layout", put(replace_layout))
        .route("/markets/{id}/bookings", get(market_bookings))
        .route("/markets/{id}/availability", get(availability))
}
