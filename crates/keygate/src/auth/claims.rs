//! Verified-token claims and the per-request authentication result.

use serde::{Deserialize, Serialize};

/// Claims carried by a validated access token.
///
/// `sub` is the only claim this gateway acts on; the rest are kept for
/// downstream consumers reading the request extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,

    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audience. Keycloak emits either a string or an array here, so this
    /// stays an untyped value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,

    /// Expiration (Unix timestamp).
    pub exp: i64,

    /// Issued-at (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Preferred username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Outcome of the authentication gate for one request.
///
/// Produced exactly once by the gate and inserted into request extensions;
/// handlers consume it without any further type inspection.
#[derive(Debug, Clone)]
pub enum AuthResult {
    /// Request matched the public-path allowlist; no verification performed.
    Anonymous,
    /// Request carried a valid bearer token.
    Verified(Claims),
}

impl AuthResult {
    /// Subject of the verified identity, if any.
    pub fn subject(&self) -> Option<&str> {
        match self {
            AuthResult::Anonymous => None,
            AuthResult::Verified(claims) => Some(claims.sub.as_str()),
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, AuthResult::Verified(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_deserialize_minimal() {
        let claims: Claims = serde_json::from_str(r#"{"sub":"user-123","exp":1700000000}"#)
            .expect("minimal claims should parse");
        assert_eq!(claims.sub, "user-123");
        assert!(claims.iss.is_none());
    }

    #[test]
    fn test_claims_aud_string_or_array() {
        let single: Claims =
            serde_json::from_str(r#"{"sub":"a","exp":1,"aud":"account"}"#).unwrap();
        assert!(single.aud.is_some());

        let multi: Claims =
            serde_json::from_str(r#"{"sub":"a","exp":1,"aud":["account","gateway"]}"#).unwrap();
        assert!(multi.aud.unwrap().is_array());
    }

    #[test]
    fn test_auth_result_subject() {
        assert_eq!(AuthResult::Anonymous.subject(), None);

        let claims: Claims = serde_json::from_str(r#"{"sub":"user-123","exp":1}"#).unwrap();
        let result = AuthResult::Verified(claims);
        assert_eq!(result.subject(), Some("user-123"));
        assert!(result.is_verified());
    }
}
