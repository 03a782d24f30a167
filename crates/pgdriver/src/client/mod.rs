//! PostgreSQL client with connection pooling and migration passes.
//!
//! [`PgClient`] wraps a deadpool pool of [`AsyncPgConnection`]s and scopes one
//! borrowed connection to each call. The [`migrate`] module drives
//! `diesel_migrations` against a database on its own, without the pool.

pub(crate) mod custom_hooks;
pub mod migrate;
mod pg_client;
mod pg_config;
mod pg_rows;
mod pool_status;

use deadpool::managed::{Object, Pool};
use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
pub use pg_client::PgClient;
pub use pg_config::PgConfig;
pub use pg_rows::{PgRow, PgRows};
pub use pool_status::PgPoolStatus;

/// Type alias for the connection pool used by [`PgClient`].
pub type ConnectionPool = Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

/// Type alias for a connection object borrowed from the pool.
///
/// Dropping it returns the connection to the pool.
pub type PooledConnection = Object<AsyncDieselConnectionManager<AsyncPgConnection>>;
