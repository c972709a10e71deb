//! Token verification collaborators.
//!
//! The gate itself never inspects token internals; it hands the raw bearer
//! string to a [`TokenVerifier`] and consumes the resulting claims. Two
//! implementations are provided: HS256 shared-secret validation for
//! development and tests, and RS256 validation against the issuer's JWKS
//! endpoint for production.

use std::collections::HashMap;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;

use super::claims::Claims;

/// Verification failures.
///
/// `Unavailable` is kept distinct from `Invalid`: an unreachable key service
/// is a service-level failure, not a caller error.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("{0}")]
    Invalid(String),

    #[error("token expired")]
    Expired,

    #[error("{0}")]
    Unavailable(String),
}

/// A bearer-token verification collaborator.
///
/// Verification is async end to end so a key fetch never blocks a worker.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, VerifyError>;
}

fn build_validation(
    algorithm: Algorithm,
    issuer: Option<&str>,
    audience: Option<&str>,
) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = true;
    validation.validate_nbf = false;

    match issuer {
        Some(iss) => validation.set_issuer(&[iss]),
        None => {
            validation.required_spec_claims.remove("iss");
        }
    }
    match audience {
        Some(aud) => validation.set_audience(&[aud]),
        None => validation.validate_aud = false,
    }

    validation
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> VerifyError {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => VerifyError::Expired,
        _ => VerifyError::Invalid(err.to_string()),
    }
}

/// HS256 shared-secret verifier.
pub struct HsVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl HsVerifier {
    pub fn new(secret: &str, issuer: Option<&str>, audience: Option<&str>) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: build_validation(Algorithm::HS256, issuer, audience),
        }
    }
}

#[async_trait]
impl TokenVerifier for HsVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            debug!("token rejected: {e}");
            map_jwt_error(e)
        })?;
        Ok(data.claims)
    }
}

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    #[serde(default)]
    kid: Option<String>,
    kty: String,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
    #[serde(default, rename = "use")]
    usage: Option<String>,
}

fn keys_from_jwks(doc: JwksDocument) -> HashMap<String, DecodingKey> {
    let mut keys = HashMap::new();
    for jwk in doc.keys {
        if jwk.kty != "RSA" {
            continue;
        }
        // Keycloak publishes "enc" keys alongside "sig" keys; skip them.
        if matches!(jwk.usage.as_deref(), Some(usage) if usage != "sig") {
            continue;
        }
        let (Some(kid), Some(n), Some(e)) = (jwk.kid, jwk.n, jwk.e) else {
            continue;
        };
        match DecodingKey::from_rsa_components(&n, &e) {
            Ok(key) => {
                keys.insert(kid, key);
            }
            Err(err) => warn!("skipping unusable jwk '{kid}': {err}"),
        }
    }
    keys
}

/// RS256 verifier backed by the issuer's JWKS endpoint.
///
/// Keys are fetched lazily on first use and cached for the process lifetime;
/// an unknown `kid` triggers one refetch before the token is rejected, which
/// covers issuer key rotation without a background task.
pub struct JwksVerifier {
    http: reqwest::Client,
    jwks_url: String,
    validation: Validation,
    keys: RwLock<HashMap<String, DecodingKey>>,
}

impl JwksVerifier {
    /// Build a verifier for the given issuer. The JWKS endpoint follows the
    /// Keycloak convention: `{issuer}/protocol/openid-connect/certs`.
    pub fn new(http: reqwest::Client, issuer: &str, audience: Option<&str>) -> Self {
        let jwks_url = format!(
            "{}/protocol/openid-connect/certs",
            issuer.trim_end_matches('/')
        );
        Self {
            http,
            jwks_url,
            validation: build_validation(Algorithm::RS256, Some(issuer), audience),
            keys: RwLock::new(HashMap::new()),
        }
    }

    async fn refresh_keys(&self) -> Result<(), VerifyError> {
        let doc: JwksDocument = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| VerifyError::Unavailable(format!("fetching jwks: {e}")))?
            .error_for_status()
            .map_err(|e| VerifyError::Unavailable(format!("fetching jwks: {e}")))?
            .json()
            .await
            .map_err(|e| VerifyError::Unavailable(format!("parsing jwks: {e}")))?;

        let keys = keys_from_jwks(doc);
        if keys.is_empty() {
            return Err(VerifyError::Unavailable(
                "jwks contained no usable signing keys".to_string(),
            ));
        }

        debug!("loaded {} signing key(s) from {}", keys.len(), self.jwks_url);
        *self.keys.write().await = keys;
        Ok(())
    }

    async fn key_for(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        if let Some(key) = self.keys.read().await.get(kid) {
            return Ok(key.clone());
        }

        // Unknown kid: the issuer may have rotated keys since our last fetch.
        self.refresh_keys().await?;

        self.keys
            .read()
            .await
            .get(kid)
            .cloned()
            .ok_or_else(|| VerifyError::Invalid(format!("unknown signing key id '{kid}'")))
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        let header = decode_header(token).map_err(map_jwt_error)?;
        let kid = header
            .kid
            .ok_or_else(|| VerifyError::Invalid("token header has no key id".to_string()))?;

        let key = self.key_for(&kid).await?;
        let data = decode::<Claims>(token, &key, &self.validation).map_err(|e| {
            debug!("token rejected: {e}");
            map_jwt_error(e)
        })?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    fn make_token(secret: &str, sub: &str, iss: Option<&str>, exp_offset_secs: i64) -> String {
        let claims = json!({
            "sub": sub,
            "iss": iss,
            "exp": Utc::now().timestamp() + exp_offset_secs,
            "iat": Utc::now().timestamp(),
        });
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encoding test token")
    }

    const SECRET: &str = "test-secret-for-unit-tests-minimum-32-chars";

    #[tokio::test]
    async fn test_hs_verify_valid_token() {
        let verifier = HsVerifier::new(SECRET, None, None);
        let token = make_token(SECRET, "user-123", None, 3600);

        let claims = verifier.verify(&token).await.expect("token should verify");
        assert_eq!(claims.sub, "user-123");
    }

    #[tokio::test]
    async fn test_hs_verify_expired_token() {
        let verifier = HsVerifier::new(SECRET, None, None);
        let token = make_token(SECRET, "user-123", None, -3600);

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, VerifyError::Expired));
    }

    #[tokio::test]
    async fn test_hs_verify_wrong_secret() {
        let verifier = HsVerifier::new(SECRET, None, None);
        let token = make_token("another-secret-also-32-chars-long-xx", "user-123", None, 3600);

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, VerifyError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_hs_verify_issuer_mismatch() {
        let verifier = HsVerifier::new(SECRET, Some("https://issuer.example"), None);
        let token = make_token(SECRET, "user-123", Some("https://other.example"), 3600);

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, VerifyError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_hs_verify_garbage_token() {
        let verifier = HsVerifier::new(SECRET, None, None);
        let err = verifier.verify("not.a.jwt").await.unwrap_err();
        assert!(matches!(err, VerifyError::Invalid(_)));
    }

    #[test]
    fn test_keys_from_jwks_filters_unusable_entries() {
        let doc: JwksDocument = serde_json::from_value(json!({
            "keys": [
                {"kid": "rsa-sig", "kty": "RSA", "use": "sig", "n": "AQAB", "e": "AQAB"},
                {"kid": "rsa-enc", "kty": "RSA", "use": "enc", "n": "AQAB", "e": "AQAB"},
                {"kid": "ec-key", "kty": "EC", "use": "sig"},
                {"kty": "RSA", "use": "sig", "n": "AQAB", "e": "AQAB"},
            ]
        }))
        .unwrap();

        let keys = keys_from_jwks(doc);
        assert_eq!(keys.len(), 1);
        assert!(keys.contains_key("rsa-sig"));
    }

    #[test]
    fn test_jwks_url_from_issuer() {
        let verifier = JwksVerifier::new(
            reqwest::Client::new(),
            "https://kc.example.com/realms/main/",
            None,
        );
        assert_eq!(
            verifier.jwks_url,
            "https://kc.example.com/realms/main/protocol/openid-connect/certs"
        );
    }
}
