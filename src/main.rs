//! Aide CLI entry point.

use anyhow::Result;
use clap::Parser;
use std::path::Path;

use aide::cli::{commands, handle_error, load_config, Cli, Commands};
use aide::domain::models::Config;
use aide::infrastructure::logging::{cleanup_old_logs, LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(&err, json);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    let (json, verbose) = (cli.json, cli.verbose);

    match cli.command {
        // These two run before (or without) a valid project config.
        Commands::Init(args) => {
            let _logger = LoggerImpl::init(&LogConfig::default().with_verbosity(verbose))?;
            commands::init::execute(args, json).await
        }
        Commands::Config(args) => {
            let _logger = LoggerImpl::init(&LogConfig::default().with_verbosity(verbose))?;
            commands::config::execute(args, config_path, json)
        }
        Commands::Workspace(args) => {
            let (config, _logger) = setup(config_path, verbose).await?;
            commands::workspace::execute(args, config, json).await
        }
        Commands::Agent(args) => {
            let (config, _logger) = setup(config_path, verbose).await?;
            commands::agent::execute(args, config, json).await
        }
        Commands::Classify(args) => {
            let (config, _logger) = setup(config_path, verbose).await?;
            commands::classify::execute(args, config, json).await
        }
        Commands::Ask(args) => {
            let (config, _logger) = setup(config_path, verbose).await?;
            commands::ask::execute(args, config, json).await
        }
        Commands::Rag(args) => {
            let (config, _logger) = setup(config_path, verbose).await?;
            commands::rag::execute(args, config, json).await
        }
        Commands::Todo(args) => {
            let (config, _logger) = setup(config_path, verbose).await?;
            commands::todo::execute(args, config, json).await
        }
    }
}

/// Load config and start logging as configured.
async fn setup(config_path: Option<&Path>, verbose: u8) -> Result<(Config, LoggerImpl)> {
    let config = load_config(config_path)?;
    let log_config = LogConfig::from(&config.logging).with_verbosity(verbose);
    let logger = LoggerImpl::init(&log_config)?;

    if let Some(log_dir) = &log_config.log_dir {
        if let Err(e) = cleanup_old_logs(log_dir, log_config.retention_days).await {
            tracing::warn!(error = %e, "log cleanup failed");
        }
    }
    Ok((config, logger))
}
