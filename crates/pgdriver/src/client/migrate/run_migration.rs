use std::time::Instant;

use tokio::task::spawn_blocking;

use super::{
    DieselMigrationEngine, MigrateError, MigrationDirection, MigrationEngine, MigrationResult,
};
use crate::TRACING_TARGET_MIGRATION;

/// Applies every pending migration from `source` to the database at `database_url`.
///
/// Already being up to date is a success with no processed versions.
///
/// # Errors
///
/// Returns the engine's error unchanged if the engine cannot be built or the
/// pass fails.
pub async fn migrate_up(source: &str, database_url: &str) -> Result<MigrationResult, MigrateError> {
    migrate(MigrationDirection::Up, source, database_url).await
}

/// Reverts every applied migration found in `source` from the database at `database_url`.
///
/// Having nothing to revert is a success with no processed versions.
///
/// # Errors
///
/// Returns the engine's error unchanged if the engine cannot be built or the
/// pass fails.
pub async fn migrate_down(
    source: &str,
    database_url: &str,
) -> Result<MigrationResult, MigrateError> {
    migrate(MigrationDirection::Down, source, database_url).await
}

/// Runs one diesel-backed pass on the blocking thread pool.
///
/// The caller's tracing dispatcher is carried over to the blocking thread.
pub(super) async fn migrate(
    direction: MigrationDirection,
    source: &str,
    database_url: &str,
) -> Result<MigrationResult, MigrateError> {
    let source = source.to_owned();
    let database_url = database_url.to_owned();
    let dispatch = tracing::dispatcher::get_default(|dispatch| dispatch.clone());

    spawn_blocking(move || {
        tracing::dispatcher::with_default(&dispatch, || {
            run_migration(direction, || {
                DieselMigrationEngine::new(&source, &database_url)
            })
        })
    })
    .await?
}

/// Builds an engine and runs exactly one pass in `direction`.
///
/// If `build` fails its error is returned and no pass runs.
/// [`MigrateError::NoChange`] from the engine becomes a successful result with
/// no processed versions; every other error is returned unchanged.
#[tracing::instrument(skip(build), target = TRACING_TARGET_MIGRATION)]
pub fn run_migration<E, B>(
    direction: MigrationDirection,
    build: B,
) -> Result<MigrationResult, MigrateError>
where
    E: MigrationEngine,
    B: FnOnce() -> Result<E, MigrateError>,
{
    let start_time = Instant::now();
    let mut engine = build()?;

    let outcome = match direction {
        MigrationDirection::Up => engine.up(),
        MigrationDirection::Down => engine.down(),
    };

    let duration = start_time.elapsed();
    match outcome {
        Ok(versions) => {
            tracing::info!(
                target: TRACING_TARGET_MIGRATION,
                duration = ?duration,
                migrations_count = versions.len(),
                "Migration pass completed"
            );
            Ok(MigrationResult::new(direction, duration, versions))
        }
        Err(MigrateError::NoChange) => {
            tracing::info!(
                target: TRACING_TARGET_MIGRATION,
                duration = ?duration,
                "No migrations to process"
            );
            Ok(MigrationResult::new(direction, duration, Vec::new()))
        }
        Err(err) => Err(err),
    }
}
