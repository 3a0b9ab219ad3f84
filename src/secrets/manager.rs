//! Resolves the webhook secret from the configured sources at startup

use tracing::{debug, info, warn};

use super::{EnvVarSecretLoader, FileSecretLoader, SecretLoader, SecretString, mask_secret};
use crate::config::SecretsConfig;
use crate::types::{ConfigError, Result};

/// Walks the configured loaders in priority order and returns the first
/// non-empty secret
pub struct SecretManager {
    config: SecretsConfig,
    loaders: Vec<Box<dyn SecretLoader>>,
}

impl SecretManager {
    /// Create a SecretManager from configuration
    pub async fn new(config: SecretsConfig) -> Result<Self> {
        let loaders = Self::create_loaders(&config).await?;
        Ok(Self { config, loaders })
    }

    /// Create a SecretManager over an explicit set of loaders
    #[cfg(test)]
    pub fn with_loaders(config: SecretsConfig, loaders: Vec<Box<dyn SecretLoader>>) -> Self {
        Self { config, loaders }
    }

    /// Create loaders based on configuration
    async fn create_loaders(config: &SecretsConfig) -> Result<Vec<Box<dyn SecretLoader>>> {
        let mut loaders: Vec<Box<dyn SecretLoader>> = Vec::new();

        for source_name in &config.sources_priority {
            let loader: Box<dyn SecretLoader> = match source_name.as_str() {
                "env" => Box::new(EnvVarSecretLoader::new(config.env_var.clone())),
                "file" => {
                    let mut loader = FileSecretLoader::new(config.secrets_file.clone());
                    if loader.is_available().await {
                        loader.reload().await?;
                    }
                    Box::new(loader)
                }
                _ => {
                    warn!(source = %source_name, "Unknown secret source");
                    continue;
                }
            };

            if loader.is_available().await {
                debug!(loader = loader.name(), "Added secret loader");
                loaders.push(loader);
            } else {
                debug!(source = %source_name, "Secret loader is not available, skipping");
            }
        }

        Ok(loaders)
    }

    /// Names of the loaders that will be consulted, in order
    pub fn loader_names(&self) -> Vec<&'static str> {
        self.loaders.iter().map(|l| l.name()).collect()
    }

    /// Resolve the webhook secret. Absence is a fatal configuration error.
    pub async fn webhook_secret(&self) -> Result<SecretString> {
        for loader in &self.loaders {
            match loader.load_secret(&self.config.secret_key).await? {
                Some(value) if !value.is_empty() => {
                    info!(
                        source = loader.name(),
                        secret = %mask_secret(&value),
                        "Webhook secret loaded"
                    );
                    return Ok(SecretString::new(value));
                }
                Some(_) => {
                    warn!(source = loader.name(), "Webhook secret is empty, ignoring");
                }
                None => {
                    debug!(source = loader.name(), "Webhook secret not found in source");
                }
            }
        }

        Err(ConfigError::MissingSecret {
            checked: self.describe_sources(),
        }
        .into())
    }

    /// Human-readable list of checked locations, without any secret material
    fn describe_sources(&self) -> String {
        self.config
            .sources_priority
            .iter()
            .map(|source| match source.as_str() {
                "env" => format!("env:{}", self.config.env_var),
                "file" => format!("file:{}", self.config.secrets_file),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Error;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_with_file(path: &str, env_var: &str) -> SecretsConfig {
        SecretsConfig {
            sources_priority: vec!["env".to_string(), "file".to_string()],
            env_var: env_var.to_string(),
            secrets_file: path.to_string(),
            secret_key: "webhook_secret".to_string(),
        }
    }

    #[tokio::test]
    async fn test_secret_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "webhook_secret=from-file").unwrap();
        file.flush().unwrap();

        let config = config_with_file(
            &file.path().to_string_lossy(),
            "DEPLOY_WEBHOOK_TEST_MANAGER_UNSET",
        );
        let manager = SecretManager::new(config).await.unwrap();

        assert_eq!(manager.loader_names(), vec!["env", "file"]);
        let secret = manager.webhook_secret().await.unwrap();
        assert_eq!(secret.expose(), b"from-file");
    }

    #[tokio::test]
    async fn test_env_takes_priority_over_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "webhook_secret=from-file").unwrap();
        file.flush().unwrap();

        unsafe {
            std::env::set_var("DEPLOY_WEBHOOK_TEST_MANAGER_PRIORITY", "from-env");
        }

        let config = config_with_file(
            &file.path().to_string_lossy(),
            "DEPLOY_WEBHOOK_TEST_MANAGER_PRIORITY",
        );
        let manager = SecretManager::new(config).await.unwrap();
        let secret = manager.webhook_secret().await.unwrap();
        assert_eq!(secret.expose(), b"from-env");

        unsafe {
            std::env::remove_var("DEPLOY_WEBHOOK_TEST_MANAGER_PRIORITY");
        }
    }

    #[tokio::test]
    async fn test_empty_env_secret_falls_through() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "webhook_secret=from-file").unwrap();
        file.flush().unwrap();

        unsafe {
            std::env::set_var("DEPLOY_WEBHOOK_TEST_MANAGER_EMPTY", "");
        }

        let config = config_with_file(
            &file.path().to_string_lossy(),
            "DEPLOY_WEBHOOK_TEST_MANAGER_EMPTY",
        );
        let manager = SecretManager::new(config).await.unwrap();
        let secret = manager.webhook_secret().await.unwrap();
        assert_eq!(secret.expose(), b"from-file");

        unsafe {
            std::env::remove_var("DEPLOY_WEBHOOK_TEST_MANAGER_EMPTY");
        }
    }

    #[tokio::test]
    async fn test_missing_secret_is_config_error() {
        let config = config_with_file(
            "/nonexistent/deploy-webhook/secrets",
            "DEPLOY_WEBHOOK_TEST_MANAGER_MISSING",
        );
        let manager = SecretManager::new(config).await.unwrap();

        match manager.webhook_secret().await {
            Err(Error::Config(ConfigError::MissingSecret { checked })) => {
                assert!(checked.contains("env:DEPLOY_WEBHOOK_TEST_MANAGER_MISSING"));
                assert!(checked.contains("file:/nonexistent/deploy-webhook/secrets"));
            }
            other => panic!("Expected MissingSecret, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_with_no_loaders() {
        let manager = SecretManager::with_loaders(SecretsConfig::default(), Vec::new());
        assert!(manager.loader_names().is_empty());
        assert!(manager.webhook_secret().await.is_err());
    }
}
