use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, instrument, warn};

use crate::config::WebhookConfig;
use crate::execution::TokioProcessLauncher;
use crate::secrets::SecretManager;
use crate::types::Result;

#[derive(Parser)]
#[command(name = "deploy-webhook")]
#[command(about = "Signed push-webhook listener that triggers a local deployment script")]
#[command(long_about = "
Listens for GitHub push webhooks on POST /webhook/deploy, verifies the
X-Hub-Signature-256 HMAC against a shared secret and, for pushes to a
protected branch, starts the deployment script in the application directory.
")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path (defaults are used when the file does not exist)
    #[arg(short, long, default_value = "/etc/deploy-webhook/config.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run the webhook listener (default if no subcommand given)
    Run(RunArgs),
    /// Validate the configuration and check that the webhook secret resolves
    Validate,
    /// Show version and build information
    Version,
}

#[derive(Args, Clone, Default)]
pub struct RunArgs {
    /// Override the listen port
    #[arg(long)]
    pub port: Option<u16>,

    /// Override the bind address (e.g. "127.0.0.1")
    #[arg(long)]
    pub bind: Option<String>,

    /// Override the application directory the deploy command runs in
    #[arg(long)]
    pub app_dir: Option<String>,

    /// Set log format
    #[arg(long)]
    pub log_format: Option<LogFormat>,
}

impl RunArgs {
    /// Apply command-line overrides on top of file and environment settings
    pub fn apply_to(&self, config: &mut WebhookConfig) {
        if let Some(bind) = &self.bind {
            config.server.host = bind.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(app_dir) = &self.app_dir {
            config.deploy.app_dir = app_dir.clone();
        }
    }
}

impl Cli {
    /// Get effective log level considering verbose/quiet flags
    pub fn effective_log_level(&self) -> LogLevel {
        if self.verbose {
            LogLevel::Debug
        } else if self.quiet {
            LogLevel::Error
        } else {
            self.log_level.clone().unwrap_or(LogLevel::Info)
        }
    }

    /// Convert LogLevel enum to string for logging module
    pub fn log_level_to_str(&self) -> &'static str {
        match self.effective_log_level() {
            LogLevel::Trace => crate::logging::level::TRACE,
            LogLevel::Debug => crate::logging::level::DEBUG,
            LogLevel::Info => crate::logging::level::INFO,
            LogLevel::Warn => crate::logging::level::WARN,
            LogLevel::Error => crate::logging::level::ERROR,
        }
    }

    /// Log level from the command line, if any flag asked for one
    pub fn log_level_override(&self) -> Option<&'static str> {
        if self.log_level.is_some() || self.verbose || self.quiet {
            Some(self.log_level_to_str())
        } else {
            None
        }
    }

    /// Get log format override from CLI arguments
    pub fn log_format_override(&self) -> Option<&'static str> {
        match &self.command {
            Some(Commands::Run(args)) => args.log_format.as_ref().map(|fmt| match fmt {
                LogFormat::Json => crate::logging::format::JSON,
                LogFormat::Pretty => crate::logging::format::PRETTY,
            }),
            _ => None,
        }
    }
}

/// Build the effective configuration: file (or defaults), then environment,
/// then command-line overrides
pub fn load_config(cli: &Cli, args: &RunArgs) -> Result<WebhookConfig> {
    let mut config = WebhookConfig::load_or_default(&cli.config)?;
    config.apply_env_overrides(|name| std::env::var(name).ok())?;
    args.apply_to(&mut config);
    Ok(config)
}

/// Run the webhook listener
#[instrument(skip(cli, args))]
pub async fn run_server(cli: Cli, args: RunArgs) -> Result<()> {
    info!(config_path = %cli.config.display(), "Loading configuration...");
    let config = load_config(&cli, &args)?;

    if let Err(e) = config.validate().await {
        error!(error = %e, "Configuration is invalid, refusing to start");
        return Err(e);
    }

    if let Err(e) = config.check_app_dir().await {
        warn!(
            error = %e,
            "Application directory is not usable, deployments will fail until it exists"
        );
    }

    let secret_manager = SecretManager::new(config.secrets.clone()).await?;
    info!(loaders = ?secret_manager.loader_names(), "Resolving webhook secret");

    let secret = match secret_manager.webhook_secret().await {
        Ok(secret) => secret,
        Err(e) => {
            error!(error = %e, "Webhook secret is missing, refusing to start");
            return Err(e);
        }
    };

    let shutdown_signal = setup_shutdown_signal();

    crate::http::start_server(
        config,
        secret,
        Arc::new(TokioProcessLauncher),
        shutdown_signal,
    )
    .await
}

/// Validate the configuration and the secret sources
#[instrument(skip(cli))]
pub async fn validate_config(cli: Cli) -> Result<()> {
    info!("Validating configuration...");

    let config = load_config(&cli, &RunArgs::default())?;

    match config.validate().await {
        Ok(()) => info!(
            config_path = %cli.config.display(),
            bind = %config.bind_address(),
            app_dir = %config.deploy.app_dir,
            protected_branches = ?config.deploy.protected_branches,
            lifecycle = ?config.deploy.lifecycle,
            "Configuration is valid"
        ),
        Err(e) => {
            error!(
                config_path = %cli.config.display(),
                error = %e,
                "Configuration validation failed"
            );
            return Err(e);
        }
    }

    if let Err(e) = config.check_app_dir().await {
        error!(error = %e, "Application directory check failed");
        return Err(e);
    }

    info!("Validating secret configuration...");
    let secret_manager = SecretManager::new(config.secrets.clone()).await?;
    match secret_manager.webhook_secret().await {
        Ok(secret) => info!(length = secret.len(), "Webhook secret is available"),
        Err(e) => {
            error!(error = %e, "Secret validation failed");
            return Err(e);
        }
    }

    info!("Configuration is valid");
    Ok(())
}

/// Show version and build information
#[instrument]
pub async fn show_version() -> Result<()> {
    println!("deploy-webhook {}", env!("CARGO_PKG_VERSION"));
    println!("Description: {}", env!("CARGO_PKG_DESCRIPTION"));
    println!("License: {}", env!("CARGO_PKG_LICENSE"));
    println!();

    println!("Build Information:");
    println!(
        "  Build Profile: {}",
        if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        }
    );
    println!();

    println!("Runtime Information:");
    println!("  Platform: {}", std::env::consts::OS);
    println!("  Architecture: {}", std::env::consts::ARCH);

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed is
/// logged and never fires.
pub async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_run_arguments() {
        let cli = Cli::try_parse_from([
            "deploy-webhook",
            "--config",
            "/tmp/webhook.toml",
            "run",
            "--bind",
            "0.0.0.0",
            "--port",
            "9100",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("/tmp/webhook.toml"));
        assert_eq!(cli.log_format_override(), Some("json"));
        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.bind.as_deref(), Some("0.0.0.0"));
                assert_eq!(args.port, Some(9100));
            }
            _ => panic!("Expected run subcommand"),
        }
    }

    #[test]
    fn test_rejects_invalid_port() {
        assert!(Cli::try_parse_from(["deploy-webhook", "run", "--port", "70000"]).is_err());
    }

    #[test]
    fn test_effective_log_level() {
        let cli = Cli::try_parse_from(["deploy-webhook", "--verbose"]).unwrap();
        assert_eq!(cli.log_level_override(), Some("debug"));

        let cli = Cli::try_parse_from(["deploy-webhook", "--quiet"]).unwrap();
        assert_eq!(cli.log_level_override(), Some("error"));

        let cli = Cli::try_parse_from(["deploy-webhook", "--log-level", "warn"]).unwrap();
        assert_eq!(cli.log_level_override(), Some("warn"));

        let cli = Cli::try_parse_from(["deploy-webhook"]).unwrap();
        assert_eq!(cli.log_level_override(), None);
        assert!(cli.command.is_none());

        assert!(Cli::try_parse_from(["deploy-webhook", "--verbose", "--quiet"]).is_err());
    }

    #[test]
    fn test_run_args_override_config() {
        let mut config = WebhookConfig::default();
        let args = RunArgs {
            port: Some(9100),
            bind: Some("::1".to_string()),
            app_dir: Some("/srv/shop".to_string()),
            log_format: None,
        };

        args.apply_to(&mut config);

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "::1");
        assert_eq!(config.deploy.app_dir, "/srv/shop");
        assert_eq!(config.bind_address(), "[::1]:9100");
    }

    #[test]
    fn test_load_config_from_file_with_cli_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9200

[deploy]
app_dir = "/srv/from-file"
"#
        )
        .unwrap();
        file.flush().unwrap();

        let path = file.path().to_string_lossy().to_string();
        let cli = Cli::try_parse_from(["deploy-webhook", "--config", path.as_str()]).unwrap();
        let args = RunArgs {
            bind: Some("127.0.0.2".to_string()),
            ..RunArgs::default()
        };

        let config = load_config(&cli, &args).unwrap();
        assert_eq!(config.server.host, "127.0.0.2");
        if std::env::var("WEBHOOK_PORT").is_err() {
            assert_eq!(config.server.port, 9200);
        }
        if std::env::var("APP_DIR").is_err() {
            assert_eq!(config.deploy.app_dir, "/srv/from-file");
        }
        assert_eq!(config.deploy.protected_branches, vec!["main", "master"]);
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let cli = Cli::try_parse_from([
            "deploy-webhook",
            "--config",
            "/nonexistent/deploy-webhook/config.toml",
        ])
        .unwrap();

        let config = load_config(&cli, &RunArgs::default()).unwrap();
        assert_eq!(config.deploy.command, vec!["/bin/bash", "./deploy.sh"]);
    }
}
