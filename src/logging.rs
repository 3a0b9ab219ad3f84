//! Logging setup for the deploy webhook listener
//!
//! Output is either human-readable (`pretty`) or one JSON object per line
//! (`json`). The level comes from `RUST_LOG` when set, then the CLI, then the
//! `[logging]` config section.
//!
//! Two spans carry request context through the logs:
//! - `http_request`: method, path and GitHub delivery id (created by the HTTP layer)
//! - `deployment`: the deploy id, from acceptance until the process exits

use tracing::{Span, info_span};
use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use crate::config::WebhookConfig;
use crate::types::Result;

/// Create a deployment context span
pub fn deployment_span(deploy_id: &str) -> Span {
    info_span!("deployment", deploy_id = deploy_id)
}

/// Create the span wrapping one HTTP request
pub fn request_span(method: &str, path: &str, delivery_id: Option<&str>) -> Span {
    info_span!(
        "http_request",
        method = method,
        path = path,
        delivery_id = delivery_id.unwrap_or("-")
    )
}

/// Log level enum values as strings for configuration
pub mod level {
    pub const TRACE: &str = "trace";
    pub const DEBUG: &str = "debug";
    pub const INFO: &str = "info";
    pub const WARN: &str = "warn";
    pub const ERROR: &str = "error";

    pub const ALL: [&str; 5] = [TRACE, DEBUG, INFO, WARN, ERROR];
}

/// Log format enum values as strings for configuration
pub mod format {
    pub const JSON: &str = "json";
    pub const PRETTY: &str = "pretty";

    pub const ALL: [&str; 2] = [JSON, PRETTY];
}

/// Initialize the global tracing subscriber.
///
/// CLI overrides win over the config file, which wins over the defaults
/// (`info`, `pretty`).
pub fn init(
    log_level_override: Option<&str>,
    log_format_override: Option<&str>,
    config: Option<&WebhookConfig>,
) -> Result<()> {
    let log_level = log_level_override
        .or(config.map(|c| c.logging.level.as_str()))
        .unwrap_or(level::INFO);

    let log_format = log_format_override
        .or(config.map(|c| c.logging.format.as_str()))
        .unwrap_or(format::PRETTY);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let timer = ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string());

    match log_format {
        format::JSON => {
            tracing_subscriber::fmt()
                .json()
                .with_timer(timer)
                .with_env_filter(env_filter)
                .with_target(false)
                .with_current_span(true)
                .with_span_list(true)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .pretty()
                .with_timer(timer)
                .with_env_filter(env_filter)
                .with_target(false)
                .with_file(false)
                .with_line_number(false)
                .init();
        }
    }

    Ok(())
}
