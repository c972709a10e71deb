//! Authentication configuration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::paths::{PatternError, PublicPathSet};
use super::verifier::{HsVerifier, JwksVerifier, TokenVerifier};

/// Token verification mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// RS256 against the issuer's JWKS endpoint (production).
    #[default]
    Jwks,
    /// HS256 shared secret (development and tests).
    Secret,
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Paths exempt from authentication. Ant-style globs: `*` matches one
    /// segment, `**` matches any number of segments.
    pub public_paths: Vec<String>,

    /// Verification mode.
    pub mode: AuthMode,

    /// Expected token issuer. REQUIRED in jwks mode.
    pub issuer: Option<String>,

    /// Expected token audience. When unset, audience is not checked.
    pub audience: Option<String>,

    /// HS256 secret for secret mode. Supports `env:VAR_NAME` indirection.
    pub jwt_secret: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            public_paths: vec!["/health/**".to_string()],
            mode: AuthMode::default(),
            issuer: None,
            audience: None,
            jwt_secret: None,
        }
    }
}

impl AuthConfig {
    /// Resolve the JWT secret, expanding `env:VAR_NAME` syntax.
    pub fn resolve_jwt_secret(&self) -> Result<Option<String>, ConfigValidationError> {
        match &self.jwt_secret {
            None => Ok(None),
            Some(value) => {
                if let Some(var_name) = value.strip_prefix("env:") {
                    match std::env::var(var_name) {
                        Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
                        Ok(_) => Err(ConfigValidationError::EnvVarEmpty(var_name.to_string())),
                        Err(_) => Err(ConfigValidationError::EnvVarNotFound(var_name.to_string())),
                    }
                } else {
                    Ok(Some(value.clone()))
                }
            }
        }
    }

    /// Validate the configuration. Errors here are fatal at startup.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        PublicPathSet::compile(&self.public_paths)?;

        match self.mode {
            AuthMode::Jwks => {
                if self.issuer.as_deref().is_none_or(|s| s.is_empty()) {
                    return Err(ConfigValidationError::MissingIssuer);
                }
            }
            AuthMode::Secret => {
                let secret = self
                    .resolve_jwt_secret()?
                    .ok_or(ConfigValidationError::MissingJwtSecret)?;
                if secret.len() < 32 {
                    return Err(ConfigValidationError::JwtSecretTooShort);
                }
            }
        }

        Ok(())
    }

    /// Compile the public-path allowlist.
    pub fn compile_public_paths(&self) -> Result<PublicPathSet, ConfigValidationError> {
        Ok(PublicPathSet::compile(&self.public_paths)?)
    }

    /// Construct the verifier for the configured mode. Call [`validate`]
    /// first; this re-checks only what it needs to proceed.
    ///
    /// [`validate`]: AuthConfig::validate
    pub fn build_verifier(&self) -> Result<Arc<dyn TokenVerifier>, ConfigValidationError> {
        match self.mode {
            AuthMode::Jwks => {
                let issuer = self
                    .issuer
                    .as_deref()
                    .ok_or(ConfigValidationError::MissingIssuer)?;
                let http = reqwest::Client::builder()
                    .build()
                    .map_err(|e| ConfigValidationError::HttpClient(e.to_string()))?;
                Ok(Arc::new(JwksVerifier::new(
                    http,
                    issuer,
                    self.audience.as_deref(),
                )))
            }
            AuthMode::Secret => {
                let secret = self
                    .resolve_jwt_secret()?
                    .ok_or(ConfigValidationError::MissingJwtSecret)?;
                Ok(Arc::new(HsVerifier::new(
                    &secret,
                    self.issuer.as_deref(),
                    self.audience.as_deref(),
                )))
            }
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error(transparent)]
    InvalidPublicPath(#[from] PatternError),

    #[error("auth.issuer is required in jwks mode")]
    MissingIssuer,

    #[error(
        "auth.jwt_secret is required in secret mode; set it in config or via env: indirection"
    )]
    MissingJwtSecret,

    #[error("auth.jwt_secret must be at least 32 characters")]
    JwtSecretTooShort,

    #[error("environment variable '{0}' not found (referenced via env:{0} in config)")]
    EnvVarNotFound(String),

    #[error("environment variable '{0}' is empty (referenced via env:{0} in config)")]
    EnvVarEmpty(String),

    #[error("building http client: {0}")]
    HttpClient(String),
}
