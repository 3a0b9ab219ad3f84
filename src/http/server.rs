//! HTTP server setup and configuration
//!
//! This module provides the main server startup logic, routing configuration,
//! and graceful shutdown handling for the webhook listener.

use axum::{
    Router, extract::Request, http::StatusCode, middleware::from_fn_with_state, routing::post,
};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, error, info, instrument, warn};

use crate::{
    config::WebhookConfig,
    execution::ProcessLauncher,
    http::{
        handlers::{AppState, DELIVERY_HEADER, handle_not_found, handle_webhook},
        middleware::hmac_auth_middleware,
    },
    logging,
    secrets::SecretString,
    types::Result,
};

/// The only route the listener serves
pub const WEBHOOK_PATH: &str = "/webhook/deploy";

/// Bind the configured address and serve until `shutdown_signal` resolves
#[instrument(skip_all)]
pub async fn start_server(
    config: WebhookConfig,
    secret: SecretString,
    launcher: Arc<dyn ProcessLauncher>,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = config.bind_address();

    if !config.binds_loopback() {
        warn!(
            host = %config.server.host,
            "Listener is reachable from other machines; requests are authenticated only by the shared secret"
        );
    }

    let app_state = Arc::new(AppState::new(config, &secret, launcher));
    drop(secret);

    info!(
        listen_addr = %addr,
        max_request_size = %app_state.config.server.max_request_size,
        request_timeout = app_state.config.server.request_timeout,
        app_dir = %app_state.config.deploy.app_dir,
        protected_branches = ?app_state.config.deploy.protected_branches,
        lifecycle = ?app_state.dispatcher.lifecycle(),
        "Starting HTTP server"
    );

    let listener = TcpListener::bind(addr.as_str()).await.map_err(|e| {
        error!(
            error = %e,
            addr = %addr,
            "Failed to bind to address"
        );
        crate::types::Error::Io(e)
    })?;

    serve(listener, app_state, shutdown_signal).await
}

/// Serve on an already bound listener
pub async fn serve(
    listener: TcpListener,
    app_state: Arc<AppState>,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    if let Ok(local_addr) = listener.local_addr() {
        info!(local_addr = %local_addr, path = WEBHOOK_PATH, "HTTP server listening");
    }

    let router = create_router(app_state);

    let server = axum::serve(listener, router).with_graceful_shutdown(async {
        shutdown_signal.await;
        info!("Shutdown signal received, starting graceful shutdown");
    });

    if let Err(e) = server.await {
        error!(error = %e, "HTTP server error");
        return Err(crate::types::Error::Io(e));
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Create the Axum router.
///
/// Signature checking is attached with `route_layer` on the POST handler only,
/// so other methods on the webhook path fall through to the 404 handler
/// without the body being read.
pub(crate) fn create_router(app_state: Arc<AppState>) -> Router {
    let request_timeout = Duration::from_secs(app_state.config.server.request_timeout);

    let webhook = post(handle_webhook)
        .route_layer(from_fn_with_state(app_state.clone(), hmac_auth_middleware))
        .fallback(handle_not_found);

    Router::new()
        .route(WEBHOOK_PATH, webhook)
        .fallback(handle_not_found)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    logging::request_span(
                        request.method().as_str(),
                        request.uri().path(),
                        request
                            .headers()
                            .get(DELIVERY_HEADER)
                            .and_then(|v| v.to_str().ok()),
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(app_state)
}
