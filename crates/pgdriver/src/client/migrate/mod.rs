//! Schema migration passes.
//!
//! A pass builds a [`MigrationEngine`] for a migration source and a database,
//! then runs exactly one operation on it: apply everything pending ("up") or
//! revert everything applied ("down"). Finding nothing to do is a successful,
//! empty pass. Any other engine failure is returned as the engine reported it.
//!
//! - [`migrate_up`] / [`migrate_down`]: one pass with `diesel_migrations`
//!   against migrations read from a directory.
//! - [`run_migration`]: the same pass over any [`MigrationEngine`].
//! - [`MigrationCommand`]: host wiring that logs around a pass and requests
//!   shutdown once it succeeds.
//!
//! Version bookkeeping lives in the target database and is owned by the
//! engine; nothing here reads it beyond the versions a pass reports.

mod migrate_command;
mod migrate_engine;
mod migrate_error;
mod migrate_result;
mod run_migration;

pub use migrate_command::MigrationCommand;
pub use migrate_engine::{DieselMigrationEngine, MigrationEngine};
pub use migrate_error::MigrateError;
pub use migrate_result::{MigrationDirection, MigrationResult};
pub use run_migration::{migrate_down, migrate_up, run_migration};
