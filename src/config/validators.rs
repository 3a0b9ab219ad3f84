use std::net::IpAddr;

use super::types::{SecretsConfig, WebhookConfig};
use crate::logging::{format, level};
use crate::types::Result;

// Validation helper functions

/// Validate the bind host: an IP literal or a plain hostname
pub(crate) fn validate_bind_host(host: &str) -> Result<()> {
    if host.is_empty() {
        return Err(crate::types::Error::Validation {
            field: "server.host".to_string(),
            message: "Bind host cannot be empty".to_string(),
        });
    }

    let trimmed = host.trim_start_matches('[').trim_end_matches(']');
    if trimmed.parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    let is_valid_char = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '.';
    if !host.chars().all(is_valid_char) {
        return Err(crate::types::Error::Validation {
            field: "server.host".to_string(),
            message: format!(
                "Invalid bind host '{}'. Expected an IP address or hostname (e.g., '127.0.0.1')",
                host
            ),
        });
    }

    Ok(())
}

/// Whether the host only accepts connections from the local machine
pub(crate) fn is_loopback_host(host: &str) -> bool {
    let trimmed = host.trim_start_matches('[').trim_end_matches(']');
    match trimmed.parse::<IpAddr>() {
        Ok(ip) => ip.is_loopback(),
        Err(_) => trimmed.eq_ignore_ascii_case("localhost"),
    }
}

/// Validate the bind port
pub(crate) fn validate_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(crate::types::Error::Validation {
            field: "server.port".to_string(),
            message: "Port must be between 1 and 65535".to_string(),
        });
    }
    Ok(())
}

/// Validate positive timeout value
pub(crate) fn validate_positive_timeout(value: u64, field: &str) -> Result<()> {
    if value == 0 {
        return Err(crate::types::Error::Validation {
            field: field.to_string(),
            message: "Timeout must be greater than 0".to_string(),
        });
    }
    Ok(())
}

/// Parse size string with units (KB, MB, GB) into bytes
pub(crate) fn parse_size_string(size: &str) -> Result<u64> {
    let size = size.trim().to_uppercase();

    let (number, multiplier) = if let Some(number) = size.strip_suffix("KB") {
        (number, 1024)
    } else if let Some(number) = size.strip_suffix("MB") {
        (number, 1024 * 1024)
    } else if let Some(number) = size.strip_suffix("GB") {
        (number, 1024 * 1024 * 1024)
    } else if let Some(number) = size.strip_suffix('B') {
        (number, 1)
    } else {
        (size.as_str(), 1)
    };

    let value = number
        .trim()
        .parse::<u64>()
        .map_err(|_| crate::types::Error::Validation {
            field: "size".to_string(),
            message: format!(
                "Invalid size format '{}'. Expected format: number + unit (KB/MB/GB) or plain bytes",
                size
            ),
        })?;

    value
        .checked_mul(multiplier)
        .ok_or_else(|| crate::types::Error::Validation {
            field: "size".to_string(),
            message: format!("Size '{}' is too large", size),
        })
}

/// Validate request size string and ensure reasonable limits
pub(crate) fn validate_request_size(size: &str, field: &str) -> Result<()> {
    let bytes = parse_size_string(size).map_err(|mut e| {
        if let crate::types::Error::Validation {
            field: ref mut field_ref,
            ..
        } = e
        {
            *field_ref = field.to_string();
        }
        e
    })?;

    const MIN_SIZE: u64 = 1024; // 1KB
    const MAX_SIZE: u64 = 100 * 1024 * 1024; // 100MB

    if bytes < MIN_SIZE {
        return Err(crate::types::Error::Validation {
            field: field.to_string(),
            message: format!(
                "Request size {} bytes is below minimum {} (1KB)",
                bytes, MIN_SIZE
            ),
        });
    }

    if bytes > MAX_SIZE {
        return Err(crate::types::Error::Validation {
            field: field.to_string(),
            message: format!(
                "Request size {} bytes exceeds maximum {} (100MB)",
                bytes, MAX_SIZE
            ),
        });
    }

    Ok(())
}

/// Validate the deployment command
pub(crate) fn validate_command(command: &[String]) -> Result<()> {
    match command.first() {
        Some(program) if !program.trim().is_empty() => Ok(()),
        _ => Err(crate::types::Error::Validation {
            field: "deploy.command".to_string(),
            message: "Deployment command cannot be empty".to_string(),
        }),
    }
}

/// Validate protected branch names (bare names, not full refs)
pub(crate) fn validate_protected_branches(branches: &[String]) -> Result<()> {
    if branches.is_empty() {
        return Err(crate::types::Error::Validation {
            field: "deploy.protected_branches".to_string(),
            message: "At least one protected branch is required".to_string(),
        });
    }

    for (i, branch) in branches.iter().enumerate() {
        let field = format!("deploy.protected_branches[{}]", i);

        if branch.trim().is_empty() {
            return Err(crate::types::Error::Validation {
                field,
                message: "Branch name cannot be empty".to_string(),
            });
        }

        if branch.starts_with("refs/") {
            return Err(crate::types::Error::Validation {
                field,
                message: format!(
                    "Branch '{}' must be a bare name (e.g., 'main'), not a full ref",
                    branch
                ),
            });
        }
    }

    Ok(())
}

/// Validate that the working directory exists and is a directory
async fn validate_directory(path: &str, field: &str) -> Result<()> {
    let metadata =
        tokio::fs::metadata(path)
            .await
            .map_err(|e| crate::types::Error::Validation {
                field: field.to_string(),
                message: format!("Cannot access path '{}': {}", path, e),
            })?;

    if !metadata.is_dir() {
        return Err(crate::types::Error::Validation {
            field: field.to_string(),
            message: format!("Path '{}' is not a directory", path),
        });
    }

    Ok(())
}

/// Validate secret source names and their settings
pub(crate) fn validate_secrets_config(secrets: &SecretsConfig) -> Result<()> {
    const VALID_SOURCES: &[&str] = &["env", "file"];

    if secrets.sources_priority.is_empty() {
        return Err(crate::types::Error::Validation {
            field: "secrets.sources_priority".to_string(),
            message: "At least one secret source is required".to_string(),
        });
    }

    for (i, source) in secrets.sources_priority.iter().enumerate() {
        if !VALID_SOURCES.contains(&source.as_str()) {
            return Err(crate::types::Error::Validation {
                field: format!("secrets.sources_priority[{}]", i),
                message: format!(
                    "Invalid secret source '{}'. Must be one of: {}",
                    source,
                    VALID_SOURCES.join(", ")
                ),
            });
        }
    }

    if secrets.env_var.trim().is_empty() {
        return Err(crate::types::Error::Validation {
            field: "secrets.env_var".to_string(),
            message: "Environment variable name cannot be empty".to_string(),
        });
    }

    if secrets.secret_key.trim().is_empty() {
        return Err(crate::types::Error::Validation {
            field: "secrets.secret_key".to_string(),
            message: "Secret key cannot be empty".to_string(),
        });
    }

    Ok(())
}

impl WebhookConfig {
    /// Validate the configuration
    pub async fn validate(&self) -> Result<()> {
        // Server
        validate_bind_host(&self.server.host)?;
        validate_port(self.server.port)?;
        validate_request_size(&self.server.max_request_size, "server.max_request_size")?;
        validate_positive_timeout(self.server.request_timeout, "server.request_timeout")?;

        // Deployment
        validate_command(&self.deploy.command)?;
        validate_protected_branches(&self.deploy.protected_branches)?;

        // Logging
        if !level::ALL.contains(&self.logging.level.as_str()) {
            return Err(crate::types::Error::Validation {
                field: "logging.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    level::ALL.join(", ")
                ),
            });
        }

        if !format::ALL.contains(&self.logging.format.as_str()) {
            return Err(crate::types::Error::Validation {
                field: "logging.format".to_string(),
                message: format!(
                    "Invalid log format '{}'. Must be one of: {}",
                    self.logging.format,
                    format::ALL.join(", ")
                ),
            });
        }

        validate_secrets_config(&self.secrets)?;

        Ok(())
    }

    /// Check that the application directory exists and is a directory.
    ///
    /// Not part of [`WebhookConfig::validate`]: the listener starts without it
    /// and a missing directory surfaces when a deployment is launched.
    pub async fn check_app_dir(&self) -> Result<()> {
        validate_directory(&self.deploy.app_dir, "deploy.app_dir").await
    }

    /// Request body limit in bytes
    pub fn max_body_bytes(&self) -> usize {
        parse_size_string(&self.server.max_request_size)
            .map(|bytes| bytes as usize)
            .unwrap_or(1024 * 1024)
    }

    /// Whether the listener is reachable only from this machine
    pub fn binds_loopback(&self) -> bool {
        is_loopback_host(&self.server.host)
    }
}
