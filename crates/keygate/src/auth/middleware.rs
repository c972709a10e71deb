//! The authentication gate.
//!
//! One middleware, one decision per request: requests matching the
//! public-path allowlist pass through untouched; everything else must carry
//! a valid bearer token. Verified requests are forwarded with the subject
//! claim in the `X-keycloak-id` header, overwriting any caller-supplied
//! value.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, State},
    http::{HeaderValue, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use log::debug;

use super::claims::AuthResult;
use super::error::AuthError;
use super::paths::PublicPathSet;
use super::verifier::TokenVerifier;

/// Header carrying the verified subject to downstream services.
pub const KEYCLOAK_ID_HEADER: &str = "x-keycloak-id";

/// Extract a bearer token from an Authorization header value.
fn bearer_token_from_header(header_value: &str) -> Result<&str, AuthError> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::InvalidAuthHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }

    let token = parts.next().ok_or(AuthError::InvalidAuthHeader)?;
    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }

    if parts.next().is_some() {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(token)
}

/// Authentication state shared across requests.
///
/// Both members are write-once at startup and read-only per request, so no
/// locking is needed on the request path.
#[derive(Clone)]
pub struct AuthState {
    public_paths: Arc<PublicPathSet>,
    verifier: Arc<dyn TokenVerifier>,
}

impl AuthState {
    pub fn new(public_paths: PublicPathSet, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            public_paths: Arc::new(public_paths),
            verifier,
        }
    }

    /// Whether the path is exempt from authentication.
    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.matches(path)
    }
}

/// The gate itself.
///
/// Decision order:
/// 1. Public path: forward as received, no verification. A caller-supplied
///    `X-keycloak-id` passes through on this branch (matching the system
///    this replaces; see DESIGN.md).
/// 2. Missing or malformed Authorization header: 401, not forwarded.
/// 3. Verifier rejects the token: 401 (or 503 when the key service itself
///    is unreachable), not forwarded.
/// 4. Valid token: set `X-keycloak-id` to the subject claim, overwriting any
///    caller value, and forward.
pub async fn auth_gate(
    State(auth): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AuthError> {
    if auth.is_public(req.uri().path()) {
        debug!("public path {}, skipping verification", req.uri().path());
        req.extensions_mut().insert(AuthResult::Anonymous);
        return Ok(next.run(req).await);
    }

    let token = {
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingAuthHeader)?;
        bearer_token_from_header(header)?.to_string()
    };

    let claims = auth.verifier.verify(&token).await?;

    let subject = HeaderValue::from_str(&claims.sub)
        .map_err(|_| AuthError::Internal("subject claim is not header-safe".to_string()))?;
    req.headers_mut().insert(KEYCLOAK_ID_HEADER, subject);
    req.extensions_mut().insert(AuthResult::Verified(claims));

    Ok(next.run(req).await)
}

/// Extractor for the gate's decision.
///
/// Present on every request that passed the gate; handlers never re-inspect
/// principals or headers.
impl<S> FromRequestParts<S> for AuthResult
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthResult>()
            .cloned()
            .ok_or_else(|| AuthError::Internal("authentication gate not installed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_from_header_valid() {
        assert_eq!(
            bearer_token_from_header("Bearer abc.def.ghi").unwrap(),
            "abc.def.ghi"
        );
        assert_eq!(
            bearer_token_from_header("bearer   token123").unwrap(),
            "token123"
        );
        assert_eq!(
            bearer_token_from_header("   Bearer\tmixed-case ").unwrap(),
            "mixed-case"
        );
    }

    #[test]
    fn test_bearer_token_from_header_invalid() {
        let cases = [
            "",
            "Bearer",
            "Bearer ",
            "Token something",
            "Bearer token extra",
            "bear token",
        ];

        for case in cases {
            assert!(
                bearer_token_from_header(case).is_err(),
                "{case} should fail"
            );
        }
    }

    #[test]
    fn test_is_public() {
        use super::super::paths::PublicPathSet;
        use super::super::verifier::{TokenVerifier, VerifyError};
        use crate::auth::claims::Claims;
        use async_trait::async_trait;

        struct NeverVerifier;

        #[async_trait]
        impl TokenVerifier for NeverVerifier {
            async fn verify(&self, _token: &str) -> Result<Claims, VerifyError> {
                Err(VerifyError::Invalid("never".to_string()))
            }
        }

        let paths = PublicPathSet::compile(&["/health/**"]).unwrap();
        let state = AuthState::new(paths, Arc::new(NeverVerifier));

        assert!(state.is_public("/health/live"));
        assert!(!state.is_public("/orders/42"));
    }
}
