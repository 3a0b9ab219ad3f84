//! Secret loader implementations for different sources

use std::collections::HashMap;
use std::env;
use std::path::Path;
use tokio::fs;
use tracing::{debug, trace, warn};

use super::SecretError;
use crate::types::Result;

/// Trait for loading secrets from various sources
#[async_trait::async_trait]
pub trait SecretLoader: Send + Sync {
    /// Load a secret by key, returning None if not found
    async fn load_secret(&self, key: &str) -> Result<Option<String>>;

    /// Check if this loader source is available
    async fn is_available(&self) -> bool;

    /// Reload secrets from source (for file-based loaders)
    async fn reload(&mut self) -> Result<()>;

    /// Get the name of this loader for logging
    fn name(&self) -> &'static str;
}

/// Reads the secret from a single environment variable.
///
/// The variable name is fixed by configuration (`WEBHOOK_SECRET` by default);
/// the key passed to `load_secret` is ignored.
pub struct EnvVarSecretLoader {
    var_name: String,
}

impl EnvVarSecretLoader {
    pub fn new(var_name: String) -> Self {
        Self { var_name }
    }
}

#[async_trait::async_trait]
impl SecretLoader for EnvVarSecretLoader {
    async fn load_secret(&self, _key: &str) -> Result<Option<String>> {
        match env::var(&self.var_name) {
            Ok(value) => {
                trace!(var = %self.var_name, "Found secret in environment");
                Ok(Some(value))
            }
            Err(env::VarError::NotPresent) => {
                trace!(var = %self.var_name, "Secret not found in environment");
                Ok(None)
            }
            Err(env::VarError::NotUnicode(_)) => Err(SecretError::InvalidEncoding(format!(
                "Environment variable '{}' contains invalid UTF-8",
                self.var_name
            ))
            .into()),
        }
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn reload(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "env"
    }
}

/// File-based secret loader for key=value format
pub struct FileSecretLoader {
    file_path: String,
    secrets: HashMap<String, String>,
}

impl FileSecretLoader {
    pub fn new(file_path: String) -> Self {
        Self {
            file_path,
            secrets: HashMap::new(),
        }
    }

    /// Parse key=value file format with comment support
    async fn parse_secrets_file(&self) -> Result<HashMap<String, String>> {
        let content = fs::read_to_string(&self.file_path).await.map_err(|e| {
            SecretError::FileParseError(
                self.file_path.clone(),
                format!("Failed to read file: {}", e),
            )
        })?;

        let mut secrets = HashMap::new();

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim().to_string();
                let value = value.trim().to_string();

                if key.is_empty() {
                    warn!(
                        file = %self.file_path,
                        line = line_num + 1,
                        "Empty key found in secrets file"
                    );
                    continue;
                }

                secrets.insert(key, value);
            } else {
                // Never echo the line itself, it may be a bare secret
                warn!(
                    file = %self.file_path,
                    line = line_num + 1,
                    "Invalid line format in secrets file, expected key=value"
                );
            }
        }

        debug!(
            file = %self.file_path,
            count = secrets.len(),
            "Parsed secrets file"
        );
        Ok(secrets)
    }
}

#[async_trait::async_trait]
impl SecretLoader for FileSecretLoader {
    async fn load_secret(&self, key: &str) -> Result<Option<String>> {
        if let Some(value) = self.secrets.get(key) {
            trace!(key = %key, file = %self.file_path, "Found secret in file");
            Ok(Some(value.clone()))
        } else {
            trace!(key = %key, file = %self.file_path, "Secret not found in file");
            Ok(None)
        }
    }

    async fn is_available(&self) -> bool {
        Path::new(&self.file_path).is_file()
    }

    async fn reload(&mut self) -> Result<()> {
        if !self.is_available().await {
            return Err(SecretError::SourceNotAvailable(format!("file:{}", self.file_path)).into());
        }

        self.secrets = self.parse_secrets_file().await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
