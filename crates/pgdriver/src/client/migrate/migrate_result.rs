//! Outcome types for migration passes.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which way a migration pass moves the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationDirection {
    /// Apply pending migrations.
    Up,
    /// Revert applied migrations.
    Down,
}

impl MigrationDirection {
    /// Returns the lowercase name of the direction.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful migration pass.
///
/// # Example
///
/// ```rust,no_run
/// use pgdriver::migrate::MigrationResult;
///
/// fn report(result: &MigrationResult) {
///     if result.is_no_op() {
///         println!("schema already {}", result.direction);
///     } else {
///         println!("{} {} migrations in {:?}",
///                  result.direction, result.migrations_processed(), result.duration);
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationResult {
    /// Direction of the pass
    pub direction: MigrationDirection,
    /// Total duration of the pass, engine construction included
    pub duration: Duration,
    /// Migration versions applied or reverted, in the order processed
    pub processed_versions: Vec<String>,
}

impl MigrationResult {
    /// Creates a migration result.
    pub fn new(
        direction: MigrationDirection,
        duration: Duration,
        processed_versions: Vec<String>,
    ) -> Self {
        Self {
            direction,
            duration,
            processed_versions,
        }
    }

    /// Returns the number of migrations processed.
    #[inline]
    pub fn migrations_processed(&self) -> usize {
        self.processed_versions.len()
    }

    /// Returns the average time per migration processed.
    pub fn average_time_per_migration(&self) -> Option<Duration> {
        let processed = self.processed_versions.len() as u32;
        if processed > 0 {
            Some(self.duration / processed)
        } else {
            None
        }
    }

    /// Returns whether the pass found nothing to do.
    #[inline]
    pub fn is_no_op(&self) -> bool {
        self.processed_versions.is_empty()
    }

    /// Returns the last processed migration version, if any.
    pub fn last_processed_version(&self) -> Option<&str> {
        self.processed_versions.last().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_migration_result_no_op() {
        let result =
            MigrationResult::new(MigrationDirection::Up, Duration::from_millis(100), vec![]);

        assert!(result.is_no_op());
        assert_eq!(result.migrations_processed(), 0);
        assert_eq!(result.average_time_per_migration(), None);
        assert_eq!(result.last_processed_version(), None);
    }

    #[test]
    fn test_migration_result_processed() {
        let result = MigrationResult::new(
            MigrationDirection::Down,
            Duration::from_millis(300),
            vec!["003".to_string(), "002".to_string(), "001".to_string()],
        );

        assert!(!result.is_no_op());
        assert_eq!(result.migrations_processed(), 3);
        assert_eq!(
            result.average_time_per_migration(),
            Some(Duration::from_millis(100))
        );
        assert_eq!(result.last_processed_version(), Some("001"));
    }

    #[test]
    fn test_direction_names() {
        assert_eq!(MigrationDirection::Up.to_string(), "up");
        assert_eq!(MigrationDirection::Down.as_str(), "down");
        assert_eq!(
            serde_json::to_string(&MigrationDirection::Down).unwrap(),
            "\"down\""
        );
    }
}
