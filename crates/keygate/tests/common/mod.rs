//! Shared test fixtures.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;

use keygate::api::{AppState, create_router};
use keygate::auth::{AuthState, Claims, HsVerifier, PublicPathSet, TokenVerifier, VerifyError};

pub const SECRET: &str = "integration-test-secret-at-least-32-chars";

/// Mint an HS256 token for the shared test secret.
pub fn make_token(sub: &str, exp_offset_secs: i64) -> String {
    let claims = json!({
        "sub": sub,
        "exp": Utc::now().timestamp() + exp_offset_secs,
        "iat": Utc::now().timestamp(),
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("encoding test token")
}

/// Mint a token signed with the wrong secret.
pub fn make_foreign_token(sub: &str) -> String {
    let claims = json!({
        "sub": sub,
        "exp": Utc::now().timestamp() + 3600,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"some-other-secret-that-is-32-chars-long"),
    )
    .expect("encoding test token")
}

/// Build an app with the given allowlist and verifier.
pub fn app_with_verifier(public_paths: &[&str], verifier: Arc<dyn TokenVerifier>) -> Router {
    let paths = PublicPathSet::compile(public_paths).expect("test patterns should compile");
    create_router(AppState::new(AuthState::new(paths, verifier)))
}

/// Default test app: HS256 verifier, `/health/**` public.
pub fn test_app() -> Router {
    app_with_verifier(
        &["/health/**"],
        Arc::new(HsVerifier::new(SECRET, None, None)),
    )
}

/// Wraps a verifier and counts how often it is consulted.
pub struct CountingVerifier {
    inner: Arc<dyn TokenVerifier>,
    calls: Arc<AtomicUsize>,
}

impl CountingVerifier {
    pub fn new(inner: Arc<dyn TokenVerifier>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl TokenVerifier for CountingVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(token).await
    }
}

/// Simulates an unreachable key service.
pub struct UnavailableVerifier;

#[async_trait]
impl TokenVerifier for UnavailableVerifier {
    async fn verify(&self, _token: &str) -> Result<Claims, VerifyError> {
        Err(VerifyError::Unavailable(
            "key service unreachable".to_string(),
        ))
    }
}
