//! Result handles returned by [`PgClient`] queries.
//!
//! [`PgClient`]: crate::PgClient

use std::fmt;
use std::iter::FusedIterator;

use diesel::{OptionalExtension, QueryableByName};
use diesel_async::RunQueryDsl;

use crate::types::{SqlValue, bind_query};
use crate::{Pg, PgError, PgResult, PooledConnection};

/// Lazy handle to a query expected to return at most one row.
///
/// Returned by [`PgClient::query_row`]. The query has not run yet: it is sent
/// when the handle is scanned, so execution errors surface from [`scan`] and
/// [`scan_optional`], never from `query_row` itself. The handle owns the
/// pooled connection it was given and returns it to the pool once scanned or
/// dropped.
///
/// [`PgClient::query_row`]: crate::PgClient::query_row
/// [`scan`]: PgRow::scan
/// [`scan_optional`]: PgRow::scan_optional
#[must_use = "the query only runs when the row is scanned"]
pub struct PgRow {
    conn: PooledConnection,
    sql: String,
    args: Vec<SqlValue>,
}

impl PgRow {
    pub(crate) fn new(conn: PooledConnection, sql: String, args: Vec<SqlValue>) -> Self {
        Self { conn, sql, args }
    }

    /// Runs the query and decodes exactly one row into `T`.
    ///
    /// Columns are matched to `T`'s fields by name. Extra rows are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PgError::QueryRow`] if the query fails, returns no row
    /// (see [`PgError::is_not_found`]), or the row does not decode into `T`.
    pub async fn scan<T>(self) -> PgResult<T>
    where
        T: QueryableByName<Pg> + Send + 'static,
    {
        let Self {
            mut conn,
            sql,
            args,
        } = self;

        bind_query(sql, &args)
            .get_result::<T>(&mut *conn)
            .await
            .map_err(|e| PgError::QueryRow(e.into()))
    }

    /// Runs the query and decodes the row into `T`, if there is one.
    ///
    /// # Errors
    ///
    /// Returns [`PgError::QueryRow`] if the query fails or the row does not
    /// decode into `T`.
    pub async fn scan_optional<T>(self) -> PgResult<Option<T>>
    where
        T: QueryableByName<Pg> + Send + 'static,
    {
        let Self {
            mut conn,
            sql,
            args,
        } = self;

        bind_query(sql, &args)
            .get_result::<T>(&mut *conn)
            .await
            .optional()
            .map_err(|e| PgError::QueryRow(e.into()))
    }

    /// Returns the query text.
    #[inline]
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl fmt::Debug for PgRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgRow")
            .field("sql", &self.sql)
            .field("args", &self.args.len())
            .finish_non_exhaustive()
    }
}

/// Forward-only sequence of decoded rows.
///
/// Returned by [`PgClient::query_rows`]. Every row was read before the
/// connection went back to the pool, so the sequence needs no connection and
/// holds no server-side cursor; it can be consumed at any pace or dropped
/// part-way.
///
/// [`PgClient::query_rows`]: crate::PgClient::query_rows
pub struct PgRows<T> {
    rows: std::vec::IntoIter<T>,
}

impl<T> PgRows<T> {
    pub(crate) fn new(rows: Vec<T>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }

    /// Discards the remaining rows.
    #[inline]
    pub fn close(self) {}
}

impl<T> Iterator for PgRows<T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl<T> ExactSizeIterator for PgRows<T> {}

impl<T> FusedIterator for PgRows<T> {}

impl<T: fmt::Debug> fmt::Debug for PgRows<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgRows")
            .field("remaining", &self.rows.as_slice())
            .finish()
    }
}
