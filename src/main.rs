use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;
mod commands;
mod config;
mod event;
mod format;
mod ingest;
mod normalize;
mod severity;
mod shutdown;
mod watcher;

use cli::{Cli, Commands, OutputFormat};
use config::{Config, LogLevel};

fn setup_logging(log_level: &LogLevel) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("winlogstream")
        .join("logs");

    let log_file = log_dir.join("winlogstream.log");

    // stdout carries the event stream, so diagnostics go to a file (or stderr if that fails)
    let target = fs::create_dir_all(&log_dir)
        .and_then(|()| fs::OpenOptions::new().create(true).append(true).open(&log_file))
        .map(|file| env_logger::Target::Pipe(Box::new(file)));

    // RUST_LOG env var takes precedence, otherwise use config log_level
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        // Let env_logger parse RUST_LOG
        builder.parse_default_env();
    } else {
        // Use log level from config
        builder.filter_level(log_level.to_level_filter());
    }

    let to_file = target.is_ok();
    builder.target(target.unwrap_or(env_logger::Target::Stderr)).init();

    if to_file {
        info!("Logging initialized, writing to: {}", log_file.display());
    } else {
        info!("Logging initialized, could not open {}, writing to stderr", log_file.display());
    }
    info!(
        "Log level: {} (from {})",
        log_level.as_filter(),
        if std::env::var("RUST_LOG").is_ok() { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command.unwrap_or(Commands::Stream) {
        Commands::Stream => commands::stream::run(&config),
        Commands::Config { output } => commands::config::run(OutputFormat::resolve(output), &config),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn main() -> Result<()> {
    // Load .env before parsing so its values reach clap's env fallbacks; set variables win
    let dotenv = dotenvy::dotenv();

    // Parse CLI arguments first
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = Config::load(cli.config.as_ref(), &cli.overrides()).context("Failed to load configuration")?;

    // Setup logging with log level from config (or RUST_LOG env var)
    setup_logging(&config.log_level).context("Failed to setup logging")?;

    match dotenv {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => info!("No .env file found"),
        Err(e) => log::warn!("Failed to load .env: {}", e),
    }
    info!("Starting winlogstream with config from: {:?}", config.source);

    // Run the command
    run(cli, config).context("Command failed")?;

    Ok(())
}
