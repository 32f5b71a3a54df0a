//! Error types for artifact storage.

use std::fmt;

use thiserror::Error;

/// What kind of database failure a [`StoreError::Database`] was.
///
/// The cache retries a write once on [`BusyOrLocked`](Self::BusyOrLocked);
/// every other kind fails the operation immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreDbErrorKind {
    /// Another connection or process holds the write lock.
    BusyOrLocked,
    /// A schema constraint rejected the row.
    ConstraintViolation,
    /// Connection pool timed out waiting for a free connection.
    PoolTimeout,
    /// Connection pool is closed.
    PoolClosed,
    /// The database file could not be read or written.
    Io,
    /// Anything else.
    Other,
}

impl StoreDbErrorKind {
    #[must_use]
    pub fn from_sqlx(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => Self::PoolTimeout,
            sqlx::Error::PoolClosed => Self::PoolClosed,
            sqlx::Error::Io(_) => Self::Io,
            sqlx::Error::Database(database_error) => {
                classify_database_error(database_error.as_ref())
            }
            _ => Self::Other,
        }
    }
}

impl fmt::Display for StoreDbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BusyOrLocked => "busy_or_locked",
            Self::ConstraintViolation => "constraint_violation",
            Self::PoolTimeout => "pool_timeout",
            Self::PoolClosed => "pool_closed",
            Self::Io => "io",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

fn classify_database_error(
    database_error: &(dyn sqlx::error::DatabaseError + 'static),
) -> StoreDbErrorKind {
    let code = database_error.code();
    if matches!(
        code.as_deref(),
        Some("SQLITE_BUSY" | "SQLITE_LOCKED" | "5" | "6")
    ) {
        return StoreDbErrorKind::BusyOrLocked;
    }

    if database_error.is_unique_violation()
        || database_error.is_foreign_key_violation()
        || database_error.is_check_violation()
        || code
            .as_deref()
            .is_some_and(|value| value.starts_with("SQLITE_CONSTRAINT"))
    {
        return StoreDbErrorKind::ConstraintViolation;
    }

    let message = database_error.message().to_ascii_lowercase();
    if message.contains("database is locked") || message.contains("database is busy") {
        return StoreDbErrorKind::BusyOrLocked;
    }

    StoreDbErrorKind::Other
}

/// Failure of an [`ArtifactStore`](super::ArtifactStore) operation.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error ({kind}): {message}")]
    Database {
        /// Typed classification of the failure.
        kind: StoreDbErrorKind,
        /// Human-readable database error text.
        message: String,
    },

    /// A stored row could not be turned back into an artifact.
    #[error("corrupt artifact row '{id}': {reason}")]
    Corrupt {
        /// Id of the offending row.
        id: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The artifact to update or delete does not exist.
    #[error(
        "artifact not found: {0}\n  Suggestion: Run `subconv list` to see stored artifact ids"
    )]
    ArtifactNotFound(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            kind: StoreDbErrorKind::from_sqlx(&err),
            message: err.to_string(),
        }
    }
}

impl StoreError {
    /// Returns the typed database error kind, when this is a database error.
    #[must_use]
    pub fn database_kind(&self) -> Option<StoreDbErrorKind> {
        match self {
            Self::Database { kind, .. } => Some(*kind),
            Self::Corrupt { .. } | Self::ArtifactNotFound(_) => None,
        }
    }

    /// True when a retry may succeed because the database was only busy.
    #[must_use]
    pub fn is_busy_or_locked(&self) -> bool {
        self.database_kind() == Some(StoreDbErrorKind::BusyOrLocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_database_message() {
        let err = StoreError::Database {
            kind: StoreDbErrorKind::Other,
            message: "connection failed".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("database error"));
        assert!(msg.contains("other"));
        assert!(msg.contains("connection failed"));
    }

    #[test]
    fn test_store_error_busy_flag() {
        let err = StoreError::Database {
            kind: StoreDbErrorKind::BusyOrLocked,
            message: "database is locked".to_string(),
        };
        assert!(err.is_busy_or_locked());
    }

    #[test]
    fn test_pool_timeout_is_classified() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.database_kind(), Some(StoreDbErrorKind::PoolTimeout));
    }

    #[test]
    fn test_not_found_has_suggestion() {
        let msg = StoreError::ArtifactNotFound("abcd".to_string()).to_string();
        assert!(msg.contains("abcd"));
        assert!(msg.contains("Suggestion"));
        assert!(StoreError::ArtifactNotFound("abcd".to_string())
            .database_kind()
            .is_none());
    }
}
