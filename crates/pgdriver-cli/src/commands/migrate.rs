use anyhow::Context;
use pgdriver::PgConfig;
use pgdriver::migrate::{MigrationCommand, MigrationDirection, MigrationResult};
use tokio_util::sync::CancellationToken;

use crate::TRACING_TARGET_COMMAND;
use crate::config::MigrateArgs;
use crate::shutdown::shutdown_signal;

/// Runs one migration pass, or stops early on a shutdown signal.
///
/// The pass runs on the blocking pool, so an interrupted pass finishes its
/// current migration in the background while the process exits.
pub async fn migrate(args: &MigrateArgs, database: &PgConfig) -> anyhow::Result<()> {
    let direction = MigrationDirection::from(args.direction);
    let shutdown = CancellationToken::new();
    let command = MigrationCommand::new(
        args.source.as_str(),
        database.database_url(),
        tracing::dispatcher::get_default(|dispatch| dispatch.clone()),
        shutdown.clone(),
    );

    let signal = tokio::spawn(shutdown_signal(shutdown.clone()));
    let outcome = tokio::select! {
        biased;
        result = command.run(direction) => Some(result),
        () = shutdown.cancelled() => None,
    };
    signal.abort();

    let Some(result) = outcome else {
        anyhow::bail!("migration {direction} interrupted by shutdown signal");
    };

    let result = result.with_context(|| {
        format!("failed to run migrations {direction} from {}", args.source)
    })?;
    report(&result);

    Ok(())
}

fn report(result: &MigrationResult) {
    if result.is_no_op() {
        tracing::info!(
            target: TRACING_TARGET_COMMAND,
            direction = %result.direction,
            "Schema already up to date"
        );
        return;
    }

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        direction = %result.direction,
        migrations = result.migrations_processed(),
        versions = ?result.processed_versions,
        duration = ?result.duration,
        "Migrations processed"
    );
}
