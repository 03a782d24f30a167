use std::sync::Arc;
use std::time::{Duration, Instant};

use deadpool::managed::{Hook, Pool};
use diesel::QueryableByName;
use diesel_async::pooled_connection::{AsyncDieselConnectionManager, ManagerConfig};
use url::Url;

use super::{PgPoolStatus, PgRow, PgRows, custom_hooks};
use crate::types::{SqlValue, bind_query};
use crate::{
    ConnectionPool, Pg, PgCause, PgConfig, PgError, PgResult, PooledConnection,
    TRACING_TARGET_CLIENT, TRACING_TARGET_CONNECTION, TRACING_TARGET_QUERY,
};

/// Connection acquisition slower than this is reported.
const SLOW_ACQUIRE_THRESHOLD: Duration = Duration::from_millis(100);

/// Pooled PostgreSQL accessor.
///
/// Every operation borrows one connection from the pool for the duration of
/// the call and gives it back on every exit path, so a single client can be
/// shared freely between tasks. Cloning is cheap and all clones share the same
/// pool.
///
/// Dropping an operation's future cancels it; the borrowed connection is
/// returned (or discarded if broken) by the pool. Use
/// [`tokio::time::timeout`] for per-call deadlines.
///
/// ```rust,no_run
/// use pgdriver::{PgClient, sql_args};
///
/// # async fn example() -> pgdriver::PgResult<()> {
/// let client = PgClient::connect("postgresql://localhost/app").await?;
/// client.ping().await?;
///
/// let users = client
///     .count_rows("SELECT count(*) FROM users WHERE active = $1", &sql_args![true])
///     .await?;
/// # let _ = users;
/// client.close();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PgClient {
    inner: Arc<PgClientInner>,
}

struct PgClientInner {
    pool: ConnectionPool,
    config: PgConfig,
}

impl PgClient {
    /// Opens a client against `database_url` with default pool settings.
    ///
    /// See [`PgClient::new`].
    pub async fn connect(database_url: impl Into<String>) -> PgResult<Self> {
        Self::new(PgConfig::new(database_url)).await
    }

    /// Opens a client with the provided configuration.
    ///
    /// Unless [`PgConfig::postgres_lazy_connect`] is set, one connection is
    /// established before this returns, so an unreachable database is
    /// reported here rather than on first use.
    ///
    /// # Errors
    ///
    /// - [`PgError::Config`] if the pool limits are out of range
    /// - [`PgError::Connect`] if the URL is malformed, the pool cannot be
    ///   built, or the first connection cannot be established
    #[tracing::instrument(
        skip(config),
        target = TRACING_TARGET_CLIENT,
        fields(database_url = %config.database_url_masked())
    )]
    pub async fn new(config: PgConfig) -> PgResult<Self> {
        config.validate()?;
        parse_database_url(config.database_url()).map_err(PgError::Connect)?;

        let mut manager_config = ManagerConfig::default();
        manager_config.custom_setup = Box::new(custom_hooks::setup_callback);
        let manager =
            AsyncDieselConnectionManager::new_with_config(config.database_url(), manager_config);

        let pool = Pool::builder(manager)
            .max_size(config.postgres_max_connections as usize)
            .wait_timeout(config.connection_timeout())
            .create_timeout(config.connection_timeout())
            .recycle_timeout(config.idle_timeout())
            .runtime(deadpool::Runtime::Tokio1)
            .post_create(Hook::sync_fn(custom_hooks::post_create))
            .pre_recycle(Hook::sync_fn(custom_hooks::pre_recycle))
            .post_recycle(Hook::sync_fn(custom_hooks::post_recycle))
            .build()
            .map_err(|e| {
                PgError::Connect(PgCause::Unexpected(
                    format!("failed to build connection pool: {e}").into(),
                ))
            })?;

        let this = Self {
            inner: Arc::new(PgClientInner { pool, config }),
        };

        if !this.inner.config.postgres_lazy_connect {
            tracing::debug!(target: TRACING_TARGET_CONNECTION, "Establishing initial connection");
            let conn = this.inner.pool.get().await.map_err(|e| {
                this.inner.pool.close();
                PgError::Connect(e.into())
            })?;
            drop(conn);
        }

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            max_connections = this.inner.config.postgres_max_connections,
            connection_timeout_secs = ?this.inner.config.postgres_connection_timeout_secs,
            idle_timeout_secs = ?this.inner.config.postgres_idle_timeout_secs,
            lazy_connect = this.inner.config.postgres_lazy_connect,
            "Database client opened"
        );

        Ok(this)
    }

    /// Closes the pool.
    ///
    /// Idle connections are dropped right away and borrowed ones when they
    /// come back. Clones of this client fail to acquire afterwards.
    pub fn close(self) {
        self.inner.pool.close();
        tracing::info!(target: TRACING_TARGET_CLIENT, "Database client closed");
    }

    /// Returns whether the pool has been closed.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.inner.pool.is_closed()
    }

    /// Checks that the database answers on a pooled connection.
    ///
    /// # Errors
    ///
    /// Returns [`PgError::Ping`] if no connection can be borrowed or the
    /// round trip fails.
    #[tracing::instrument(level = "trace", skip(self), target = TRACING_TARGET_CONNECTION)]
    pub async fn ping(&self) -> PgResult<()> {
        use diesel_async::RunQueryDsl;

        let mut conn = self
            .inner
            .pool
            .get()
            .await
            .map_err(|e| PgError::Ping(e.into()))?;

        diesel::sql_query("SELECT 1")
            .execute(&mut *conn)
            .await
            .map_err(|e| PgError::Ping(e.into()))?;

        Ok(())
    }

    /// Borrows one connection from the pool.
    ///
    /// The connection goes back to the pool when the returned object is dropped.
    async fn acquire(&self) -> PgResult<PooledConnection> {
        let start = Instant::now();
        let conn = self
            .inner
            .pool
            .get()
            .await
            .map_err(|e| PgError::Acquire(e.into()))?;

        let elapsed = start.elapsed();
        if elapsed > SLOW_ACQUIRE_THRESHOLD {
            tracing::warn!(
                target: TRACING_TARGET_CONNECTION,
                elapsed = ?elapsed,
                "Connection acquisition took longer than expected"
            );
        }

        Ok(conn)
    }

    /// Prepares a query expected to return at most one row.
    ///
    /// Only the connection is acquired here; the query runs when the returned
    /// [`PgRow`] is scanned, and its errors surface there. The row handle keeps
    /// the connection until it is scanned or dropped.
    ///
    /// # Errors
    ///
    /// Returns [`PgError::Acquire`] if no connection can be borrowed.
    #[tracing::instrument(level = "trace", skip(self, args), target = TRACING_TARGET_QUERY)]
    pub async fn query_row(&self, sql: &str, args: &[SqlValue]) -> PgResult<PgRow> {
        let conn = self.acquire().await?;
        Ok(PgRow::new(conn, sql.to_owned(), args.to_vec()))
    }

    /// Runs a query and returns all of its rows decoded into `T`.
    ///
    /// Rows are read in full before the connection is released, so the
    /// returned [`PgRows`] does not depend on the connection.
    ///
    /// # Errors
    ///
    /// - [`PgError::Acquire`] if no connection can be borrowed
    /// - [`PgError::Query`] if the query fails or a row does not decode
    #[tracing::instrument(level = "trace", skip(self, args), target = TRACING_TARGET_QUERY)]
    pub async fn query_rows<T>(&self, sql: &str, args: &[SqlValue]) -> PgResult<PgRows<T>>
    where
        T: QueryableByName<Pg> + Send + 'static,
    {
        use diesel_async::RunQueryDsl;

        let mut conn = self.acquire().await?;

        let rows = bind_query(sql, args)
            .load::<T>(&mut *conn)
            .await
            .map_err(|e| PgError::Query(e.into()))?;

        Ok(PgRows::new(rows))
    }

    /// Runs a query returning a single integer and returns that integer.
    ///
    /// The first column of the first row is read and must be a `smallint`,
    /// `integer` or `bigint`, as `SELECT count(*) FROM ...` produces. Other
    /// types are rejected rather than converted. Rows after the first are
    /// ignored.
    ///
    /// # Errors
    ///
    /// - [`PgError::Acquire`] if no connection can be borrowed
    /// - [`PgError::QueryRow`] if the query fails, returns no row, or its
    ///   value is not an integer
    #[tracing::instrument(level = "trace", skip(self, args), target = TRACING_TARGET_QUERY)]
    pub async fn count_rows(&self, sql: &str, args: &[SqlValue]) -> PgResult<i64> {
        use diesel_async::RunQueryDsl;

        #[derive(QueryableByName)]
        struct Count {
            #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::BigInt>)]
            count: Option<i64>,
            #[diesel(sql_type = diesel::sql_types::Text)]
            value_type: String,
        }

        let mut conn = self.acquire().await?;

        let row = bind_query(count_query(sql), args)
            .get_result::<Count>(&mut *conn)
            .await
            .map_err(|e| PgError::QueryRow(e.into()))?;

        if !INTEGER_TYPES.contains(&row.value_type.as_str()) {
            return Err(PgError::QueryRow(PgCause::Unexpected(
                format!("expected an integer value, found {}", row.value_type).into(),
            )));
        }

        row.count.ok_or_else(|| {
            PgError::QueryRow(PgCause::Unexpected("expected an integer value, found null".into()))
        })
    }

    /// Executes a statement that returns no rows.
    ///
    /// Returns the number of affected rows; callers that only care about
    /// success can ignore it.
    ///
    /// With `diesel_async::RunQueryDsl` in scope, `client.execute(..)`
    /// resolves to that trait's by-value method instead; call
    /// `PgClient::execute(&client, ..)` there.
    ///
    /// # Errors
    ///
    /// - [`PgError::Acquire`] if no connection can be borrowed
    /// - [`PgError::Execute`] if the statement fails
    #[tracing::instrument(level = "trace", skip(self, args), target = TRACING_TARGET_QUERY)]
    pub async fn execute(&self, sql: &str, args: &[SqlValue]) -> PgResult<usize> {
        use diesel_async::RunQueryDsl;

        let mut conn = self.acquire().await?;

        bind_query(sql, args)
            .execute(&mut *conn)
            .await
            .map_err(|e| PgError::Execute(e.into()))
    }

    /// Gets the current pool status and statistics.
    #[inline]
    pub fn pool_status(&self) -> PgPoolStatus {
        self.inner.pool.status().into()
    }

    /// Gets the database configuration used by this client.
    #[inline]
    pub fn config(&self) -> &PgConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for PgClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pool_status = self.pool_status();
        f.debug_struct("PgClient")
            .field("database_url", &self.inner.config.database_url_masked())
            .field("pool_max_connections", &pool_status.max_size)
            .field("pool_current_size", &pool_status.size)
            .field("pool_available", &pool_status.available)
            .field("pool_waiting", &pool_status.waiting)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Checks that `database_url` is a PostgreSQL connection string.
fn parse_database_url(database_url: &str) -> Result<Url, PgCause> {
    let url = Url::parse(database_url)?;

    match url.scheme() {
        "postgres" | "postgresql" => Ok(url),
        scheme => Err(PgCause::Unexpected(
            format!("unsupported database url scheme '{scheme}'").into(),
        )),
    }
}

/// Type names `pg_typeof` reports for values [`PgClient::count_rows`] accepts.
const INTEGER_TYPES: [&str; 3] = ["smallint", "integer", "bigint"];

/// Wraps `sql` so that its first column comes back as `count`, alongside the
/// column's original type.
///
/// The inner query ends on its own line so a trailing `--` comment cannot
/// swallow the wrapper.
fn count_query(sql: &str) -> String {
    let sql = sql.trim().trim_end_matches(';').trim_end();
    format!(
        "SELECT (q.v)::bigint AS count, pg_typeof(q.v)::text AS value_type \
         FROM ({sql}\n) AS q(v)"
    )
}
