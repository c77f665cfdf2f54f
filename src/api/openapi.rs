//! OpenAPI document for every REST endpoint.

use utoipa::OpenApi;

use crate::api::dto::{
    AvailabilityResponse, BookingDto, ConfirmRequest, CreateMarketRequest, DirectBookingRequest,
    HoldRequest, HoldResponse, MarketDto, NotificationDto, PaymentUpdateRequest,
    ReplaceLayoutRequest, StatusUpdateRequest,
};
use crate::api::handlers::{bookings, holds, markets, notifications, profile, system};
use crate::domain::{
    BookingKind, BookingStatus, ContactSnapshot, GridPosition, NotificationKind, PaymentEvidence,
    PaymentStatus, PriceSnapshot, SlotCapability, SlotDefinition, UserProfile,
};
use crate::error::{ErrorBody, ErrorResponse};
use crate::service::PeriodRequest;

/// Generated API description, served at `/api-docs/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "market-booking",
        description = "Stall booking for market layouts: holds, conflict-free reservations and the owner approval workflow. Callers are identified by the `x-user-id` header."
    ),
    paths(
        system::health_handler,
        markets::create_market,
        markets::list_markets,
        markets::get_market,
        markets::replace_layout,
        markets::market_bookings,
        markets::availability,
        holds::hold_slot,
        holds::confirm_hold,
        bookings::create_booking,
        bookings::my_bookings,
        bookings::get_booking,
        bookings::update_status,
        bookings::update_payment_status,
        bookings::upload_payment_slip,
        bookings::cancel_booking,
        notifications::list_notifications,
        notifications::mark_read,
        profile::get_profile,
        profile::put_profile,
    ),
    components(schemas(
        AvailabilityResponse,
        BookingDto,
        BookingKind,
        BookingStatus,
        ConfirmRequest,
        ContactSnapshot,
        CreateMarketRequest,
        DirectBookingRequest,
        ErrorBody,
        ErrorResponse,
        GridPosition,
        HoldRequest,
        HoldResponse,
        MarketDto,
        NotificationDto,
        NotificationKind,
        PaymentEvidence,
        PaymentStatus,
        PaymentUpdateRequest,
        PeriodRequest,
        PriceSnapshot,
        ReplaceLayoutRequest,
        SlotCapability,
        SlotDefinition,
        StatusUpdateRequest,
        UserProfile,
    )),
    tags(
        (name = "Markets", description = "Markets and their slot layouts"),
        (name = "Holds", description = "Ten-minute slot holds"),
        (name = "Bookings", description = "Bookings and the approval workflow"),
        (name = "Notifications", description = "Per-user inbox"),
        (name = "Profile", description = "Contact details snapshotted into bookings"),
        (name = "System", description = "Operational endpoints"),
    )
)]
pub struct ApiDoc;
