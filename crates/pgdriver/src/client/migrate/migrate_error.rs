use diesel::ConnectionError;
use tokio::task::JoinError;

use crate::BoxError;

/// Failure of a migration pass.
///
/// Errors are carried as the engine reported them; only
/// [`MigrateError::NoChange`] is turned into success by [`run_migration`].
///
/// [`run_migration`]: super::run_migration
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// There was nothing to apply (up) or nothing to revert (down).
    #[error("no change")]
    NoChange,

    /// The migration source locator could not be used.
    #[error("invalid migration source '{locator}': {reason}")]
    Source { locator: String, reason: BoxError },

    /// The target database could not be reached.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The engine failed while applying or reverting a migration.
    #[error("{0}")]
    Apply(BoxError),

    /// The blocking task running the pass panicked or was cancelled.
    #[error("migration task failed: {0}")]
    Task(#[from] JoinError),
}

impl MigrateError {
    /// Creates a source error for `locator`.
    pub fn invalid_source(locator: impl Into<String>, reason: impl Into<BoxError>) -> Self {
        Self::Source {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Returns whether this is the "nothing to do" sentinel.
    #[inline]
    pub fn is_no_change(&self) -> bool {
        matches!(self, Self::NoChange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_names_the_locator() {
        let err = MigrateError::invalid_source("s3://bucket", "unsupported scheme 's3'");
        assert_eq!(
            err.to_string(),
            "invalid migration source 's3://bucket': unsupported scheme 's3'"
        );
        assert!(!err.is_no_change());
    }

    #[test]
    fn apply_error_is_passed_through_verbatim() {
        let err = MigrateError::Apply("relation \"widgets\" already exists".into());
        assert_eq!(err.to_string(), "relation \"widgets\" already exists");
        assert!(MigrateError::NoChange.is_no_change());
    }
}
