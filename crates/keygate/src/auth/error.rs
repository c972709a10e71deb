//! Authentication errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use super::verifier::VerifyError;

/// Errors produced by the authentication gate.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No authorization header on a non-public path.
    #[error("missing authorization header")]
    MissingAuthHeader,

    /// Authorization header present but not a well-formed bearer credential.
    #[error("invalid authorization header format")]
    InvalidAuthHeader,

    /// Token failed verification (signature, issuer, audience, malformed).
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Token expired.
    #[error("token expired")]
    TokenExpired,

    /// The verification collaborator (key service) could not be reached.
    /// Deliberately distinct from `InvalidToken`: the caller did nothing
    /// wrong.
    #[error("token verification unavailable: {0}")]
    VerifierUnavailable(String),

    /// Internal error.
    #[error("internal auth error: {0}")]
    Internal(String),
}

impl From<VerifyError> for AuthError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Expired => AuthError::TokenExpired,
            VerifyError::Invalid(reason) => AuthError::InvalidToken(reason),
            VerifyError::Unavailable(reason) => AuthError::VerifierUnavailable(reason),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub error: String,
    pub error_code: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            AuthError::MissingAuthHeader => (StatusCode::UNAUTHORIZED, "missing_auth_header"),
            AuthError::InvalidAuthHeader => (StatusCode::UNAUTHORIZED, "invalid_auth_header"),
            AuthError::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "token_expired"),
            AuthError::VerifierUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "verifier_unavailable")
            }
            AuthError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(AuthErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        let err = AuthError::MissingAuthHeader;
        assert_eq!(err.to_string(), "missing authorization header");

        let err = AuthError::InvalidToken("bad".to_string());
        assert_eq!(err.to_string(), "invalid token: bad");
    }

    #[test]
    fn test_status_mapping() {
        let resp = AuthError::TokenExpired.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = AuthError::VerifierUnavailable("jwks down".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_verify_error_conversion() {
        assert!(matches!(
            AuthError::from(VerifyError::Expired),
            AuthError::TokenExpired
        ));
        assert!(matches!(
            AuthError::from(VerifyError::Unavailable("x".into())),
            AuthError::VerifierUnavailable(_)
        ));
    }
}
