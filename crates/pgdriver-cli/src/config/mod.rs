//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── command: Command     # migrate up|down, ping
//! └── database: PgConfig   # URL and pool limits
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! # Apply migrations from ./migrations
//! pgdriver --postgres-url "postgresql://..." migrate up --source file://migrations
//!
//! # Or via environment variables
//! POSTGRES_URL="postgresql://..." pgdriver ping
//! ```

use std::process;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pgdriver::PgConfig;
use pgdriver::migrate::MigrationDirection;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "pgdriver")]
#[command(about = "PostgreSQL migrations and health checks")]
#[command(version)]
pub struct Cli {
    /// Command to run.
    #[command(subcommand)]
    pub command: Command,

    /// Database connection and pool configuration.
    #[clap(flatten)]
    pub database: PgConfig,
}

/// Top-level commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Apply or revert schema migrations.
    Migrate(MigrateArgs),
    /// Check that the database answers a round trip.
    Ping,
}

/// Arguments of the `migrate` command.
#[derive(Debug, Clone, Args)]
pub struct MigrateArgs {
    /// Which way to move the schema.
    #[command(subcommand)]
    pub direction: MigrateDirection,

    /// Migration source, `file://<dir>` or a plain directory path.
    #[arg(
        long,
        env = "MIGRATIONS_SOURCE",
        default_value = "file://migrations",
        global = true
    )]
    pub source: String,
}

/// Subcommands of `migrate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum MigrateDirection {
    /// Apply every pending migration.
    Up,
    /// Revert every applied migration.
    Down,
}

impl From<MigrateDirection> for MigrationDirection {
    fn from(direction: MigrateDirection) -> Self {
        match direction {
            MigrateDirection::Up => Self::Up,
            MigrateDirection::Down => Self::Down,
        }
    }
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded before clap parses arguments so that its values
    /// can serve as environment defaults.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.database
            .validate()
            .context("invalid database configuration")?;
        Ok(())
    }

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            database_url = %self.database.database_url_masked(),
            postgres_max_connections = self.database.postgres_max_connections,
            postgres_connection_timeout_secs = ?self.database.postgres_connection_timeout_secs,
            postgres_idle_timeout_secs = ?self.database.postgres_idle_timeout_secs,
            postgres_lazy_connect = self.database.postgres_lazy_connect,
            "Database configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_migrate_with_source() {
        let cli = Cli::try_parse_from([
            "pgdriver",
            "--postgres-url",
            "postgresql://localhost/app",
            "migrate",
            "down",
            "--source",
            "file:///srv/migrations",
        ])
        .unwrap();

        let Command::Migrate(args) = cli.command else {
            panic!("expected migrate command");
        };
        assert_eq!(args.direction, MigrateDirection::Down);
        assert_eq!(args.source, "file:///srv/migrations");
        assert_eq!(
            MigrationDirection::from(args.direction),
            MigrationDirection::Down
        );
    }

    #[test]
    fn parses_ping_with_pool_flags() {
        let cli = Cli::try_parse_from([
            "pgdriver",
            "--postgres-url",
            "postgresql://localhost/app",
            "--postgres-max-connections",
            "4",
            "ping",
        ])
        .unwrap();

        assert!(matches!(cli.command, Command::Ping));
        assert_eq!(cli.database.postgres_max_connections, 4);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_pool() {
        let cli = Cli::try_parse_from([
            "pgdriver",
            "--postgres-url",
            "postgresql://localhost/app",
            "--postgres-max-connections",
            "64",
            "ping",
        ])
        .unwrap();

        assert!(cli.validate().is_err());
    }
}
