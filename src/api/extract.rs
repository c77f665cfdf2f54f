//! Request extractors: caller identity, JSON bodies, path segments and
//! query strings.
//!
//! Authentication happens upstream. The auth proxy forwards the verified
//! user id in the `x-user-id` header; handlers never accept an acting
//! user id from the request body.

use axum::Json;
use axum::extract::{
    FromRequest, FromRequestParts, OptionalFromRequestParts, Path, Query, Request,
};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::domain::UserId;
use crate::error::BookingError;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller.
///
/// Rejects with `Unauthenticated` when the header is missing or blank.
/// Use `Option<Caller>` on endpoints that are readable anonymously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub UserId);

fn caller_from(parts: &Parts) -> Option<Caller> {
    parts
        .headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Caller(UserId::from(s)))
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = BookingError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_from(parts).ok_or(BookingError::Unauthenticated)
    }
}

impl<S> OptionalFromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = BookingError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(caller_from(parts))
    }
}

/// JSON body whose rejections render as `InvalidArgument`.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = BookingError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| BookingError::InvalidArgument(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Path segments whose rejections render as `InvalidArgument`.
#[derive(Debug, Clone)]
pub struct PathParam<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParam<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = BookingError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = <Path<T> as FromRequestParts<S>>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| BookingError::InvalidArgument(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string whose rejections render as `InvalidArgument`.
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = BookingError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| BookingError::InvalidArgument(rejection.body_text()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::http::Request as HttpRequest;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = HttpRequest::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let Ok(request) = builder.body(()) else {
            panic!("request");
        };
        request.into_parts().0
    }

    #[derive(Debug, serde::Deserialize)]
    struct Window {
        from: String,
    }

    #[tokio::test]
    async fn malformed_query_is_invalid_argument() {
        let Ok(request) = HttpRequest::builder().uri("/?to=2024-05-01").body(()) else {
            panic!("request");
        };
        let mut p = request.into_parts().0;
        let result =
            <QueryParams<Window> as FromRequestParts<()>>::from_request_parts(&mut p, &()).await;
        assert!(matches!(result, Err(BookingError::InvalidArgument(_))));

        let Ok(request) = HttpRequest::builder().uri("/?from=2024-05-01").body(()) else {
            panic!("request");
        };
        let mut p = request.into_parts().0;
        let Ok(QueryParams(window)) =
            <QueryParams<Window> as FromRequestParts<()>>::from_request_parts(&mut p, &()).await
        else {
            panic!("query extracted");
        };
        assert_eq!(window.from, "2024-05-01");
    }

    #[tokio::test]
    async fn missing_or_blank_header_is_unauthenticated() {
        for header in [None, Some("   ")] {
            let mut p = parts(header);
            let result = <Caller as FromRequestParts<()>>::from_request_parts(&mut p, &()).await;
            assert!(matches!(result, Err(BookingError::Unauthenticated)));
        }
    }

    #[tokio::test]
    async fn header_value_becomes_caller() {
        let mut p = parts(Some(" alice "));
        let Ok(Caller(user)) =
            <Caller as FromRequestParts<()>>::from_request_parts(&mut p, &()).await
        else {
            panic!("caller extracted");
        };
        assert_eq!(user.as_str(), "alice");

        let mut anonymous = parts(None);
        let Ok(None) =
            <Caller as OptionalFromRequestParts<()>>::from_request_parts(&mut anonymous, &()).await
        else {
            panic!("optional caller is none");
        };
    }
}
