use tokio_util::sync::CancellationToken;
use tracing::Dispatch;
use tracing::instrument::WithSubscriber;

use super::run_migration::migrate;
use super::{MigrateError, MigrationDirection, MigrationResult};
use crate::TRACING_TARGET_MIGRATION;

/// One-shot migration command for a process entry point.
///
/// Runs a single pass, logging to the given dispatcher around it, and cancels
/// the shutdown token once the pass succeeds so the host process can exit.
/// A failed pass leaves the token untouched and returns the error.
///
/// ```rust,no_run
/// use pgdriver::migrate::MigrationCommand;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), pgdriver::migrate::MigrateError> {
/// let shutdown = CancellationToken::new();
/// let command = MigrationCommand::new(
///     "file://migrations",
///     "postgresql://localhost/app",
///     tracing::dispatcher::get_default(|d| d.clone()),
///     shutdown.clone(),
/// );
///
/// command.up().await?;
/// shutdown.cancelled().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MigrationCommand {
    source: String,
    database_url: String,
    dispatch: Dispatch,
    shutdown: CancellationToken,
}

impl MigrationCommand {
    /// Creates a command for `source` and `database_url`.
    pub fn new(
        source: impl Into<String>,
        database_url: impl Into<String>,
        dispatch: Dispatch,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            source: source.into(),
            database_url: database_url.into(),
            dispatch,
            shutdown,
        }
    }

    /// Applies every pending migration.
    pub async fn up(&self) -> Result<MigrationResult, MigrateError> {
        self.run(MigrationDirection::Up).await
    }

    /// Reverts every applied migration.
    pub async fn down(&self) -> Result<MigrationResult, MigrateError> {
        self.run(MigrationDirection::Down).await
    }

    /// Runs one pass in `direction`.
    pub async fn run(&self, direction: MigrationDirection) -> Result<MigrationResult, MigrateError> {
        let pass = async {
            tracing::info!(
                target: TRACING_TARGET_MIGRATION,
                direction = %direction,
                "command starting..."
            );
            let _finished = Finished(direction);

            migrate(direction, &self.source, &self.database_url).await
        };

        let result = pass.with_subscriber(self.dispatch.clone()).await?;
        self.shutdown.cancel();
        Ok(result)
    }

    /// Returns the token cancelled after a successful pass.
    #[inline]
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }
}

/// Logs the end of a command on every exit path.
struct Finished(MigrationDirection);

impl Drop for Finished {
    fn drop(&mut self) {
        tracing::info!(
            target: TRACING_TARGET_MIGRATION,
            direction = %self.0,
            "command finished"
        );
    }
}
