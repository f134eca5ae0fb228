//! Caller identity as resolved by the upstream auth gateway.
//!
//! Authentication happens before requests reach this service. The gateway
//! forwards the authenticated user id in `x-user-id`; a request without it is
//! anonymous.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;

use crate::error::AppError;

pub const CALLER_HEADER: &str = "x-user-id";

pub(crate) fn caller_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CALLER_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Authenticated caller; rejects anonymous requests with 401
#[derive(Debug, Clone)]
pub struct Caller(pub String);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_id(&parts.headers)
            .map(Caller)
            .ok_or(AppError::Unauthenticated)
    }
}

/// Caller if known, for endpoints anonymous viewers may also use
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<String>);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(caller_id(&parts.headers)))
    }
}
