#![allow(clippy::print_stdout)]

mod args;
mod handlers;

use crate::args::{Cli, Command};
use anyhow::{Context, Result};
use clap::Parser;
use sluice_kernel::bootstrap::init_logger;
use sluice_kernel::config::{load_config, validate};
use sluice_kernel::domain::config::AppConfig;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let cfg: AppConfig = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    validate(&cfg).context("Configuration rejected")?;
    let _logger = init_logger(env!("CARGO_PKG_NAME"), &cfg.logging).context("Failed to start logging")?;

    match cli.command {
        Command::Sniff { file } => handlers::sniff(&file),
        Command::Validate { file, content_type, max_size, allow } => {
            handlers::validate(&cfg, &file, &content_type, max_size, &allow)
        },
        Command::Persist { file, root, namespace } => {
            handlers::persist(&cfg, &file, root, namespace.as_deref()).await
        },
        Command::Ingest { file, content_type, namespace } => {
            handlers::ingest(&cfg, &file, &content_type, namespace.as_deref()).await
        },
        Command::Purge { older_than } => handlers::purge(&cfg, older_than).await,
    }
}
