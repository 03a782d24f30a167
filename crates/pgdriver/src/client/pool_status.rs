use deadpool::Status;

/// Snapshot of the connection pool.
///
/// Taken with [`PgClient::pool_status`]; useful for monitoring and for
/// checking that every borrowed connection found its way back.
///
/// [`PgClient::pool_status`]: crate::PgClient::pool_status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PgPoolStatus {
    /// Maximum number of connections in the pool
    pub max_size: usize,
    /// Current number of connections in the pool
    pub size: usize,
    /// Number of idle connections ready to be borrowed
    pub available: usize,
    /// Number of callers waiting for a connection
    pub waiting: usize,
}

impl PgPoolStatus {
    /// Returns the number of connections currently borrowed.
    #[inline]
    pub fn in_use(&self) -> usize {
        self.size.saturating_sub(self.available)
    }

    /// Returns the utilization percentage of the pool (0.0 to 1.0).
    #[inline]
    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            0.0
        } else {
            self.in_use() as f64 / self.max_size as f64
        }
    }

    /// Returns whether the pool is under pressure (high utilization or waiting requests).
    #[inline]
    pub fn is_under_pressure(&self) -> bool {
        self.waiting > 0 || self.utilization() > 0.8
    }
}

impl From<Status> for PgPoolStatus {
    fn from(status: Status) -> Self {
        Self {
            max_size: status.max_size,
            size: status.size,
            available: status.available,
            waiting: status.waiting,
        }
    }
}
