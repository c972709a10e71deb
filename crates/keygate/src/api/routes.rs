//! Router construction: the explicit composition root.
//!
//! The middleware chain is assembled here in order: trace (outermost),
//! authentication gate, then handlers. The gate wraps the whole router;
//! public paths are exempted inside the gate by pattern, not by separate
//! route groups, because the allowlist is configuration-driven.

use axum::{Router, middleware, routing::get};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::auth_gate;

use super::handlers;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let auth_state = state.auth.clone();

    Router::new()
        .route("/health", get(handlers::health))
        .route("/whoami", get(handlers::whoami))
        .fallback(handlers::upstream)
        .layer(middleware::from_fn_with_state(auth_state, auth_gate))
        .layer(trace_layer)
        .with_state(state)
}
