use std::fmt;
use std::path::{Path, PathBuf};

use diesel::Connection;
use diesel_async::AsyncPgConnection;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_migrations::{FileBasedMigrations, MigrationHarness};

use super::MigrateError;
use crate::TRACING_TARGET_MIGRATION;

/// An engine able to move a database schema forward or backward.
///
/// Implementations own version bookkeeping. Both operations return the
/// versions they processed, or [`MigrateError::NoChange`] when there was
/// nothing to do.
pub trait MigrationEngine {
    /// Applies every pending migration.
    fn up(&mut self) -> Result<Vec<String>, MigrateError>;

    /// Reverts every applied migration.
    fn down(&mut self) -> Result<Vec<String>, MigrateError>;
}

/// [`MigrationEngine`] backed by `diesel_migrations`.
///
/// Migrations are read from a directory laid out the way the diesel CLI
/// writes them (`<version>_<name>/up.sql` and `down.sql`). Applied versions
/// are tracked in the target database's `__diesel_schema_migrations` table.
///
/// The engine holds its own blocking connection, separate from any
/// [`PgClient`] pool. Build and use it off the async executor, e.g. inside
/// [`tokio::task::spawn_blocking`].
///
/// [`PgClient`]: crate::PgClient
pub struct DieselMigrationEngine {
    source_dir: PathBuf,
    conn: AsyncConnectionWrapper<AsyncPgConnection>,
}

impl DieselMigrationEngine {
    /// Binds an engine to a migration source and a database.
    ///
    /// `source` is either `file://<dir>` or a plain directory path.
    ///
    /// # Errors
    ///
    /// - [`MigrateError::Source`] if the locator uses another scheme or the
    ///   directory cannot be read as a migration source; an empty directory
    ///   is valid and yields a pass with nothing to do
    /// - [`MigrateError::Connection`] if the database cannot be reached
    pub fn new(source: &str, database_url: &str) -> Result<Self, MigrateError> {
        let source_dir = resolve_source(source)?;
        load_migrations(source, &source_dir)?;

        let conn = AsyncConnectionWrapper::<AsyncPgConnection>::establish(database_url)?;

        tracing::debug!(
            target: TRACING_TARGET_MIGRATION,
            source_dir = %source_dir.display(),
            "Migration engine connected"
        );

        Ok(Self { source_dir, conn })
    }

    /// Returns the versions currently recorded as applied, oldest first.
    pub fn applied_versions(&mut self) -> Result<Vec<String>, MigrateError> {
        let versions = self
            .conn
            .applied_migrations()
            .map_err(MigrateError::Apply)?;

        let mut versions: Vec<String> = versions.into_iter().map(|v| v.to_string()).collect();
        versions.sort();
        Ok(versions)
    }

    /// Returns the directory migrations are read from.
    #[inline]
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    fn migrations(&self) -> Result<FileBasedMigrations, MigrateError> {
        load_migrations(&self.source_dir.to_string_lossy(), &self.source_dir)
    }
}

impl MigrationEngine for DieselMigrationEngine {
    fn up(&mut self) -> Result<Vec<String>, MigrateError> {
        let migrations = self.migrations()?;
        let versions = self
            .conn
            .run_pending_migrations(migrations)
            .map_err(MigrateError::Apply)?;

        into_outcome(versions)
    }

    fn down(&mut self) -> Result<Vec<String>, MigrateError> {
        let migrations = self.migrations()?;
        let versions = self
            .conn
            .revert_all_migrations(migrations)
            .map_err(MigrateError::Apply)?;

        into_outcome(versions)
    }
}

impl fmt::Debug for DieselMigrationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DieselMigrationEngine")
            .field("source_dir", &self.source_dir)
            .finish_non_exhaustive()
    }
}

fn into_outcome<V: ToString>(versions: Vec<V>) -> Result<Vec<String>, MigrateError> {
    if versions.is_empty() {
        return Err(MigrateError::NoChange);
    }

    Ok(versions.iter().map(ToString::to_string).collect())
}

fn load_migrations(locator: &str, dir: &Path) -> Result<FileBasedMigrations, MigrateError> {
    FileBasedMigrations::from_path(dir).map_err(|e| MigrateError::invalid_source(locator, e))
}

/// Turns a source locator into the directory it points at.
fn resolve_source(locator: &str) -> Result<PathBuf, MigrateError> {
    match locator.split_once("://") {
        Some(("file", path)) if !path.is_empty() => Ok(PathBuf::from(path)),
        Some(("file", _)) => Err(MigrateError::invalid_source(locator, "empty path")),
        Some((scheme, _)) => Err(MigrateError::invalid_source(
            locator,
            format!("unsupported scheme '{scheme}'"),
        )),
        None if locator.is_empty() => Err(MigrateError::invalid_source(locator, "empty path")),
        None => Ok(PathBuf::from(locator)),
    }
}
