use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{ConfigError, Lifecycle, Result};

/// Environment variable overriding `server.host`
pub const ENV_HOST: &str = "WEBHOOK_HOST";
/// Environment variable overriding `server.port`
pub const ENV_PORT: &str = "WEBHOOK_PORT";
/// Environment variable overriding `deploy.app_dir`
pub const ENV_APP_DIR: &str = "APP_DIR";

/// Complete service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WebhookConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub deploy: DeployConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Working directory of the deployment command
    #[serde(default = "default_app_dir")]
    pub app_dir: String,
    /// Program and arguments, run relative to `app_dir`
    #[serde(default = "default_command")]
    pub command: Vec<String>,
    /// Bare branch names (without `refs/heads/`) that trigger a deployment
    #[serde(default = "default_protected_branches")]
    pub protected_branches: Vec<String>,
    #[serde(default)]
    pub lifecycle: Lifecycle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    #[serde(default = "default_sources_priority")]
    pub sources_priority: Vec<String>,
    #[serde(default = "default_secret_env_var")]
    pub env_var: String,
    #[serde(default = "default_secrets_file")]
    pub secrets_file: String,
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
}

impl WebhookConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let content = std::fs::read_to_string(&path)
            .map_err(|_| ConfigError::FileNotFound { path: path_str })?;

        let config: WebhookConfig = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Load the file when it exists, otherwise start from defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `WEBHOOK_HOST`, `WEBHOOK_PORT` and `APP_DIR` overrides.
    ///
    /// `lookup` is `std::env::var(..).ok()` in production; tests pass a map.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST).filter(|v| !v.is_empty()) {
            self.server.host = host;
        }

        if let Some(port) = lookup(ENV_PORT).filter(|v| !v.is_empty()) {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_PORT.to_string(),
                message: format!("'{}' is not a valid port number", port),
            })?;
        }

        if let Some(app_dir) = lookup(ENV_APP_DIR).filter(|v| !v.is_empty()) {
            self.deploy.app_dir = app_dir;
        }

        Ok(())
    }

    /// `host:port` as passed to the TCP listener
    pub fn bind_address(&self) -> String {
        if self.server.host.contains(':') && !self.server.host.starts_with('[') {
            format!("[{}]:{}", self.server.host, self.server.port)
        } else {
            format!("{}:{}", self.server.host, self.server.port)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_request_size: default_max_request_size(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            app_dir: default_app_dir(),
            command: default_command(),
            protected_branches: default_protected_branches(),
            lifecycle: Lifecycle::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            sources_priority: default_sources_priority(),
            env_var: default_secret_env_var(),
            secrets_file: default_secrets_file(),
            secret_key: default_secret_key(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_max_request_size() -> String {
    "1MB".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_app_dir() -> String {
    "/opt/retralabs".to_string()
}

fn default_command() -> Vec<String> {
    vec!["/bin/bash".to_string(), "./deploy.sh".to_string()]
}

fn default_protected_branches() -> Vec<String> {
    vec!["main".to_string(), "master".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_sources_priority() -> Vec<String> {
    vec!["env".to_string(), "file".to_string()]
}

fn default_secret_env_var() -> String {
    "WEBHOOK_SECRET".to_string()
}

fn default_secrets_file() -> String {
    "/etc/deploy-webhook/secrets".to_string()
}

fn default_secret_key() -> String {
    "webhook_secret".to_string()
}
