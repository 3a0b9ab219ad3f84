//! HMAC authentication middleware for webhook signature verification
//!
//! The request body is buffered (up to the configured limit), the
//! `X-Hub-Signature-256` header is checked against `HMAC-SHA256(secret, body)`
//! and only then is the request passed on. The handler receives the exact
//! bytes that were verified through the [`VerifiedBody`] extension, so nothing
//! downstream can interpret a body that failed authentication.

use axum::{
    body::{Body, Bytes, to_bytes},
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use constant_time_eq::constant_time_eq;
use http_body_util::LengthLimitError;
use ring::hmac;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{http::handlers::AppState, secrets::SecretString, types::Error};

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Request body that passed signature verification
#[derive(Debug, Clone)]
pub struct VerifiedBody(pub Bytes);

/// Result of checking a signature header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    Valid,
    Missing,
    /// Header present but without the `sha256=` prefix
    Malformed,
    Mismatch,
}

/// Signs and verifies request bodies with the shared webhook secret
#[derive(Clone)]
pub struct SignatureVerifier {
    key: hmac::Key,
}

impl SignatureVerifier {
    pub fn new(secret: &SecretString) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret.expose()),
        }
    }

    /// `sha256=` followed by the lowercase hex HMAC of `body`
    pub fn sign(&self, body: &[u8]) -> String {
        let tag = hmac::sign(&self.key, body);
        format!("{}{}", SIGNATURE_PREFIX, hex::encode(tag.as_ref()))
    }

    /// Compare a signature header against the body.
    ///
    /// A length mismatch returns early since the expected length is public.
    /// Equal-length values are compared in constant time by `signatures_match`.
    pub fn verify(&self, body: &[u8], header: Option<&str>) -> SignatureCheck {
        let Some(provided) = header else {
            return SignatureCheck::Missing;
        };
        if !provided.starts_with(SIGNATURE_PREFIX) {
            return SignatureCheck::Malformed;
        }

        let expected = self.sign(body);
        if signatures_match(provided.as_bytes(), expected.as_bytes()) {
            SignatureCheck::Valid
        } else {
            SignatureCheck::Mismatch
        }
    }
}

/// Length check, then a comparison whose duration does not depend on where
/// the inputs differ
fn signatures_match(provided: &[u8], expected: &[u8]) -> bool {
    provided.len() == expected.len() && constant_time_eq(provided, expected)
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier").finish_non_exhaustive()
    }
}

/// Axum middleware for HMAC authentication
pub async fn hmac_auth_middleware(
    State(app_state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let limit = app_state.max_body_bytes;
    let body_bytes = match to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            if e.into_inner().is::<LengthLimitError>() {
                warn!(limit = limit, "Request body exceeds size limit");
                return Error::PayloadTooLarge { limit }.into_response();
            }
            warn!("Failed to read request body for HMAC verification");
            return Error::InvalidPayload("failed to read request body".to_string())
                .into_response();
        }
    };

    let header = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match app_state.verifier.verify(&body_bytes, header) {
        SignatureCheck::Valid => {
            debug!("HMAC signature validation successful");
        }
        failure => {
            let reason = match failure {
                SignatureCheck::Missing => "missing X-Hub-Signature-256 header",
                SignatureCheck::Malformed => "signature header lacks sha256= prefix",
                _ => "signature mismatch",
            };
            warn!(reason = reason, "Rejecting webhook with invalid signature");
            return Error::Authentication(reason.to_string()).into_response();
        }
    }

    parts.extensions.insert(VerifiedBody(body_bytes));
    let request = Request::from_parts(parts, Body::empty());
    next.run(request).await
}
