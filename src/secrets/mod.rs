//! Webhook secret loading
//!
//! The shared secret is read once at startup from the configured sources
//! (environment variable, then a `key=value` secrets file by default) and kept
//! in a [`SecretString`]. A missing secret aborts startup.

pub mod loader;
pub mod manager;
pub mod storage;

pub use loader::{EnvVarSecretLoader, FileSecretLoader, SecretLoader};
pub use manager::SecretManager;
pub use storage::SecretString;

use crate::types::{ConfigError, Error};

/// Errors specific to secret loading operations
#[derive(thiserror::Error, Debug)]
pub enum SecretError {
    #[error("Secret source '{0}' is not available")]
    SourceNotAvailable(String),

    #[error("Failed to parse secrets file '{0}': {1}")]
    FileParseError(String, String),

    #[error("Secret has invalid encoding: {0}")]
    InvalidEncoding(String),
}

impl From<SecretError> for Error {
    fn from(err: SecretError) -> Self {
        Error::Config(ConfigError::Invalid {
            message: err.to_string(),
        })
    }
}

/// Mask secret value for logging purposes
pub fn mask_secret(value: &str) -> String {
    if value.is_empty() {
        "[empty]".to_string()
    } else {
        format!("[{} chars]", value.chars().count())
    }
}
