//! Keygate: an authentication gateway.
//!
//! Every inbound request is either allowlisted by path or required to carry
//! a valid bearer token. Verified requests are forwarded with the subject
//! claim in the `X-keycloak-id` header.

pub mod api;
pub mod auth;
pub mod config;
