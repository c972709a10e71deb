//! Application state shared across handlers.

use crate::auth::AuthState;

/// Shared state for the router. Cheap to clone; everything inside is
/// reference-counted and read-only after startup.
#[derive(Clone)]
pub struct AppState {
    /// Authentication gate state (allowlist + verifier).
    pub auth: AuthState,
}

impl AppState {
    pub fn new(auth: AuthState) -> Self {
        Self { auth }
    }
}
