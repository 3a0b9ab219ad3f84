//! HTTP middleware for the webhook listener
//!
//! Only HMAC authentication lives here; tracing and timeouts are plain
//! tower-http layers added in [`crate::http::server`].

pub mod auth;

pub use auth::{SignatureVerifier, VerifiedBody, hmac_auth_middleware};
