//! Request handlers.
//!
//! The gateway's own surface is deliberately small: a health probe, an
//! identity echo, and a catch-all upstream stand-in for everything the
//! routing layer (out of scope here) would forward to.

use axum::{Json, body::Body, http::Request};
use serde::Serialize;

use crate::auth::{AuthResult, KEYCLOAK_ID_HEADER};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint. Typically allowlisted via `public_paths`.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Identity echo response.
#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

/// Echo the gate's decision for this request.
pub async fn whoami(result: AuthResult) -> Json<WhoamiResponse> {
    Json(WhoamiResponse {
        authenticated: result.is_verified(),
        subject: result.subject().map(str::to_string),
    })
}

/// What the next stage of request handling observed.
#[derive(Debug, Serialize)]
pub struct UpstreamResponse {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keycloak_id: Option<String>,
}

/// Catch-all stand-in for the routed backend.
///
/// Reports the request path and the identity header exactly as they arrived
/// past the gate, which is also what the integration tests assert on.
pub async fn upstream(req: Request<Body>) -> Json<UpstreamResponse> {
    let keycloak_id = req
        .headers()
        .get(KEYCLOAK_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    Json(UpstreamResponse {
        path: req.uri().path().to_string(),
        keycloak_id,
    })
}
