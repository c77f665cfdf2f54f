//! Booking error types with HTTP status code mapping.
//!
//! [`BookingError`] is the central error type. Every variant belongs to one
//! [`ErrorKind`] of the public failure taxonomy, carries a distinct numeric
//! code, and renders as a structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::store::StoreError;

/// Structured JSON error response body.
///
/// ```json
/// {
///   "error": {
///     "code": 2006,
///     "kind": "deadline_exceeded",
///     "message": "hold 9b2c6f0e-3d1a-4c57-8e2f-5a7d0c1b4e93_S1_2024-05-01_2024-05-05_alice expired at 2024-04-20T10:10:00Z"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code, kind and message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Taxonomy kind, stable for clients to branch on.
    pub kind: ErrorKind,
    /// Human-readable error message.
    pub message: String,
}

/// Failure taxonomy exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller identity missing on a mutating call.
    Unauthenticated,
    /// Malformed or missing input.
    InvalidArgument,
    /// Overlap with an existing booking or hold, or a duplicate hold.
    Conflict,
    /// Referenced entity does not exist.
    NotFound,
    /// Caller does not own the entity acted on.
    PermissionDenied,
    /// Entity is not in a state that allows the operation.
    FailedPrecondition,
    /// Hold confirmed after its deadline.
    DeadlineExceeded,
    /// Storage failure.
    Internal,
}

/// Error enum for every booking operation.
///
/// # Error Code Ranges
///
/// | Range     | Category            | HTTP Status          |
/// |-----------|---------------------|----------------------|
/// | 1000–1999 | Caller / input      | 400 / 401 / 403      |
/// | 2000–2999 | Booking state       | 404 / 409 / 410 / 412 |
/// | 3000–3999 | Storage             | 500 / 503            |
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    /// No authenticated caller on a mutating request.
    #[error("login required")]
    Unauthenticated,

    /// Request validation failed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested range overlaps an active booking or hold.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller already holds exactly this slot and range.
    #[error("you already hold this time (hold {0})")]
    AlreadyHeld(String),

    /// Referenced lock, booking, market or slot is missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller is not allowed to act on the entity.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Entity is in the wrong state for the operation.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// Requested status change is not part of the workflow.
    #[error("illegal transition from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: String,
        /// Requested state.
        to: String,
    },

    /// Hold confirmation attempted after the deadline.
    #[error("hold expired: {0}")]
    DeadlineExceeded(String),

    /// Storage backend failure.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl BookingError {
    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Conflict(_) | Self::AlreadyHeld(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::FailedPrecondition(_) | Self::InvalidTransition { .. } => {
                ErrorKind::FailedPrecondition
            }
            Self::DeadlineExceeded(_) => ErrorKind::DeadlineExceeded,
            Self::Store(_) => ErrorKind::Internal,
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidArgument(_) => 1001,
            Self::Unauthenticated => 1002,
            Self::PermissionDenied(_) => 1003,
            Self::NotFound(_) => 2001,
            Self::Conflict(_) => 2002,
            Self::AlreadyHeld(_) => 2003,
            Self::FailedPrecondition(_) => 2004,
            Self::InvalidTransition { .. } => 2005,
            Self::DeadlineExceeded(_) => 2006,
            Self::Store(StoreError::Aborted) => 3001,
            Self::Store(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::AlreadyHeld(_) => StatusCode::CONFLICT,
            Self::FailedPrecondition(_) | Self::InvalidTransition { .. } => {
                StatusCode::PRECONDITION_FAILED
            }
            Self::DeadlineExceeded(_) => StatusCode::GONE,
            Self::Store(StoreError::Aborted) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                kind: self.kind(),
                message: self.to_string(),
            },
        };
        (status, axum::Json(body)).into_response()
    }
}
