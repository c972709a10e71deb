//! Authentication module.
//!
//! The gate intercepts every request: public paths pass through, everything
//! else requires a valid bearer token verified against the configured
//! issuer.

mod claims;
mod config;
mod error;
mod middleware;
mod paths;
mod verifier;

pub use claims::{AuthResult, Claims};
pub use config::{AuthConfig, AuthMode, ConfigValidationError};
pub use error::AuthError;
pub use middleware::{AuthState, KEYCLOAK_ID_HEADER, auth_gate};
pub use paths::{PatternError, PublicPathSet};
pub use verifier::{HsVerifier, JwksVerifier, TokenVerifier, VerifyError};
