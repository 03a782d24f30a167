#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod commands;
mod config;
mod shutdown;
mod telemetry;

use std::process;

use crate::config::{Cli, Command};

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "pgdriver_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "pgdriver_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "pgdriver_cli::config";
pub const TRACING_TARGET_COMMAND: &str = "pgdriver_cli::command";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %format!("{error:#}"),
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    telemetry::init_tracing()?;
    cli.log();
    cli.validate()?;

    match &cli.command {
        Command::Migrate(args) => commands::migrate(args, &cli.database).await,
        Command::Ping => commands::ping(&cli.database).await,
    }
}
