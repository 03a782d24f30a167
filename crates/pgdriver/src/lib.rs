#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

// Tracing target constants for consistent logging.

/// Tracing target for client-related operations.
///
/// Use this target for logging client initialization, configuration, and lifecycle events.
pub const TRACING_TARGET_CLIENT: &str = "pgdriver::client";

/// Tracing target for database query operations.
pub const TRACING_TARGET_QUERY: &str = "pgdriver::queries";

/// Tracing target for database migration operations.
///
/// Use this target for logging migration passes and the command wiring around them.
pub const TRACING_TARGET_MIGRATION: &str = "pgdriver::migrations";

/// Tracing target for database connection operations.
///
/// Use this target for logging connection establishment, pool management, and connection errors.
pub const TRACING_TARGET_CONNECTION: &str = "pgdriver::connection";

mod client;
mod error;
pub mod types;

pub use diesel::pg::Pg;
pub use diesel_async::AsyncPgConnection as PgConnection;

pub use crate::client::migrate;
pub use crate::client::{
    ConnectionPool, PgClient, PgConfig, PgPoolStatus, PgRow, PgRows, PooledConnection,
};
pub use crate::error::{BoxError, ErrorHint, PgCause, PgError, PgResult};
pub use crate::types::SqlValue;
