//! `SQLite` pool for the artifact store.
//!
//! File-backed databases run in WAL mode so a long refresh write does not
//! block readers serving cached payloads; the busy timeout covers a second
//! process writing the same file. Schema comes from `migrations/`.

use std::path::Path;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, instrument};

/// Pool size for file-backed artifact databases.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// How long a write waits on a locked database before failing, in ms.
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5000;

/// Failure to open the artifact database.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("cannot open artifact database: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("cannot apply artifact schema: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Pool tuning, set from the `db_*` keys of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Migrated pool shared by [`SqliteStore`](crate::SqliteStore) clones.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the artifact database at `db_path` with default pool options.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the file cannot be opened or migrated.
    pub async fn new(db_path: &Path) -> Result<Self, DbError> {
        Self::with_options(db_path, DatabaseOptions::default()).await
    }

    /// Opens the artifact database at `db_path`, creating the file and
    /// applying pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the file cannot be opened or migrated.
    #[instrument(skip(db_path), fields(path = %db_path.display()))]
    pub async fn with_options(db_path: &Path, options: DatabaseOptions) -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections.max(1))
            .connect(&format!("sqlite:{}?mode=rwc", db_path.display()))
            .await?;

        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query(&format!("PRAGMA busy_timeout={}", options.busy_timeout_ms))
            .execute(&pool)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        debug!(max_connections = options.max_connections, "Artifact database open");
        Ok(Self { pool })
    }

    /// Opens a private in-memory database, used when no path is configured.
    /// One connection only: each in-memory connection is its own database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the schema cannot be applied.
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_artifacts_table_exists() {
        let db = Database::new_in_memory().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO artifacts (id, kind, fingerprint, source_kind, source_value, payload, proxy_count, auto_refresh, created_at, updated_at) \
             VALUES ('0011223344556677', 'feed', 'abc', 'text', 'x', 'p', 1, 0, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await;

        assert!(result.is_ok(), "artifacts table should exist after migration");
    }

    #[tokio::test]
    async fn test_database_rejects_unknown_artifact_kind() {
        let db = Database::new_in_memory().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO artifacts (id, kind, fingerprint, source_kind, source_value, payload, proxy_count, auto_refresh, created_at, updated_at) \
             VALUES ('0011223344556677', 'yaml', 'abc', 'text', 'x', 'p', 1, 0, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await;

        assert!(result.is_err(), "unknown kind should be rejected by CHECK constraint");
    }

    #[tokio::test]
    async fn test_fingerprint_mapping_requires_existing_artifact() {
        let db = Database::new_in_memory().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO fingerprints (kind, fingerprint, artifact_id) VALUES ('feed', 'abc', 'missing')",
        )
        .execute(db.pool())
        .await;

        assert!(result.is_err(), "mapping to a missing artifact should fail");
    }

    #[tokio::test]
    async fn test_file_database_runs_in_wal_mode() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db = Database::with_options(
            &db_path,
            DatabaseOptions {
                max_connections: 2,
                busy_timeout_ms: 1000,
            },
        )
        .await
        .unwrap();

        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert!(mode.eq_ignore_ascii_case("wal"));
    }
}
