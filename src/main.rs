//! Indicator engine CLI application.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::PathBuf;
use trading_config::{load_config, LoggingConfig};
use trading_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; the CLI flags win over the config file
    let logging = load_config(&cli.config)
        .map(|config| config.logging)
        .unwrap_or_else(|_| LoggingConfig::default());
    let level = cli
        .log_level
        .as_ref()
        .map_or(logging.level.as_str(), |level| level.as_str());
    let log_file = logging.file.as_ref().map(PathBuf::from);
    let _guard = setup_logging(
        level,
        cli.json_logs || logging.is_json(),
        log_file.as_deref(),
    );

    // Execute command
    match cli.command {
        Commands::Replay(args) => cli::commands::replay::run(args, &cli.config).await,
        Commands::Indicators => cli::commands::indicators::run().await,
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config).await,
    }
}
