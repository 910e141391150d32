//! Request handlers.

use axum::{http::StatusCode, Extension, Json};
use serde::Serialize;

use crate::security::ResolvedIdentity;

/// Body returned by the identity endpoints.
#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub identity: String,
    pub source: &'static str,
}

/// Echo the identity the rate limiter keyed this request under.
pub async fn identity_handler(
    Extension(resolved): Extension<ResolvedIdentity>,
) -> Json<IdentityResponse> {
    Json(IdentityResponse {
        identity: resolved.identity,
        source: resolved.source.as_str(),
    })
}

pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
