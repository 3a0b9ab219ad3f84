//! HTTP endpoint handlers for the webhook listener

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    config::WebhookConfig,
    deployment::Dispatcher,
    events::{Decision, PushPayload, classify},
    execution::ProcessLauncher,
    http::{
        middleware::{SignatureVerifier, VerifiedBody},
        responses::*,
    },
    secrets::SecretString,
    types::DeploymentRequest,
};

pub const EVENT_HEADER: &str = "x-github-event";
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// Application state shared across handlers. Built once at startup and
/// never mutated.
pub struct AppState {
    pub config: WebhookConfig,
    pub verifier: SignatureVerifier,
    pub dispatcher: Dispatcher,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(
        config: WebhookConfig,
        secret: &SecretString,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        Self {
            verifier: SignatureVerifier::new(secret),
            dispatcher: Dispatcher::new(&config.deploy, launcher),
            max_body_bytes: config.max_body_bytes(),
            config,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// POST /webhook/deploy - runs after signature verification
pub async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Extension(VerifiedBody(body)): Extension<VerifiedBody>,
) -> Response {
    let payload = match PushPayload::parse(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Rejecting webhook with malformed payload");
            return e.into_response();
        }
    };

    let event = header_str(&headers, EVENT_HEADER);
    let delivery_id = header_str(&headers, DELIVERY_HEADER);

    match classify(event, &payload, &state.config.deploy.protected_branches) {
        Decision::Ignored(reason) => {
            info!(event = ?event, reason = %reason.message(), "Ignoring webhook event");
            (StatusCode::OK, Json(IgnoredResponse::new(reason.message()))).into_response()
        }
        Decision::Accepted { branch, commit } => {
            let request = DeploymentRequest::new(branch, commit, delivery_id.map(str::to_string));

            info!(
                deploy_id = %request.deploy_id,
                branch = %request.branch,
                commit = %request.commit,
                "Push to protected branch accepted"
            );

            // The decision is already made; a failed start is only logged.
            match state.dispatcher.dispatch(&request) {
                Ok(dispatched) => debug!(
                    deploy_id = %request.deploy_id,
                    pid = ?dispatched.pid,
                    observed = dispatched.observer.is_some(),
                    "Deployment dispatched"
                ),
                Err(e) => warn!(
                    deploy_id = %request.deploy_id,
                    error = %e,
                    "Deployment could not be started"
                ),
            }

            (StatusCode::OK, Json(TriggeredResponse::from(&request))).into_response()
        }
    }
}

/// Fallback handler for 404 Not Found
pub async fn handle_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::not_found()))
}
