mod cli;
mod config;
mod deployment;
mod events;
mod execution;
mod http;
mod logging;
mod secrets;
mod types;

use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Commands};
use crate::config::WebhookConfig;
use crate::types::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging is set up before the full config is validated, so a broken
    // file only costs the configured log settings, not the error message.
    let logging_config = match &cli.command {
        Some(Commands::Version) => None,
        _ => WebhookConfig::load_from_file(&cli.config).ok(),
    };

    crate::logging::init(
        cli.log_level_override(),
        cli.log_format_override(),
        logging_config.as_ref(),
    )?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting deploy-webhook");

    match cli.command.clone().unwrap_or(Commands::Run(Default::default())) {
        Commands::Run(args) => cli::run_server(cli, args).await,
        Commands::Validate => cli::validate_config(cli).await,
        Commands::Version => cli::show_version().await,
    }
}
