use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Request body too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Config file parse error: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Invalid value for environment variable {var}: {message}")]
    InvalidEnv { var: String, message: String },

    #[error("Webhook secret is not configured (checked: {checked})")]
    MissingSecret { checked: String },
}

/// Errors raised while starting the deployment command
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Deployment command is empty")]
    EmptyCommand,

    #[error("Command '{command}' could not be started: {source}")]
    StartFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

/// How the dispatcher treats a deployment process once it has been started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// Start the process and forget about it
    Detached,
    /// Start the process and log its exit from a background task
    #[default]
    Observed,
}

/// A push that passed authentication and filtering and is about to be deployed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentRequest {
    pub deploy_id: String,
    pub branch: String,
    pub commit: String,
    pub delivery_id: Option<String>,
    /// RFC 3339 acceptance time
    pub accepted_at: String,
}

impl DeploymentRequest {
    pub fn new(branch: String, commit: String, delivery_id: Option<String>) -> Self {
        Self {
            deploy_id: generate_deploy_id(),
            branch,
            commit,
            delivery_id,
            accepted_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Generate a deployment ID from the current time
pub fn generate_deploy_id() -> String {
    let now = chrono::Utc::now();
    format!(
        "deploy-{}-{:03}",
        now.format("%Y%m%d-%H%M%S"),
        now.timestamp_subsec_millis()
    )
}

/// Exit information reported by a finished deployment process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: Option<i32>,
    pub success: bool,
}

impl From<std::process::ExitStatus> for ProcessExit {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
            success: status.success(),
        }
    }
}
