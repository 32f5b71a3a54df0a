//! SQLite-backed artifact store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::{debug, instrument};

use super::{ArtifactStore, Result, StoreError};
use crate::artifact::{ArtifactId, ArtifactKind, ConversionArtifact};
use crate::db::Database;
use crate::fingerprint::Fingerprint;
use crate::source::Source;

const SELECT_ARTIFACT: &str = r"
SELECT id, kind, fingerprint, source_kind, source_value, payload,
       proxy_count, auto_refresh, created_at, updated_at
FROM artifacts";

#[derive(Debug, FromRow)]
struct ArtifactRow {
    id: String,
    kind: String,
    fingerprint: String,
    source_kind: String,
    source_value: String,
    payload: String,
    proxy_count: i64,
    auto_refresh: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ArtifactRow> for ConversionArtifact {
    type Error = StoreError;

    fn try_from(row: ArtifactRow) -> std::result::Result<Self, Self::Error> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: row.id.clone(),
            reason,
        };
        let kind = row.kind.parse::<ArtifactKind>().map_err(corrupt)?;
        let source = match row.source_kind.as_str() {
            "url" => Source::Url(row.source_value),
            "text" => Source::Text(row.source_value),
            other => return Err(corrupt(format!("unknown source kind '{other}'"))),
        };
        let proxy_count = usize::try_from(row.proxy_count)
            .map_err(|_| corrupt(format!("negative proxy count {}", row.proxy_count)))?;

        Ok(Self {
            id: ArtifactId::from(row.id),
            kind,
            fingerprint: Fingerprint::from_hex(row.fingerprint),
            source,
            payload: row.payload,
            proxy_count,
            auto_refresh: row.auto_refresh,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn count_column(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Artifact store on a [`Database`] pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Wraps an open database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the underlying database.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl ArtifactStore for SqliteStore {
    #[instrument(skip(self, artifact), fields(id = %artifact.id, kind = %artifact.kind))]
    async fn put(&self, artifact: &ConversionArtifact) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;

        sqlx::query(
            r"
            INSERT INTO artifacts
                (id, kind, fingerprint, source_kind, source_value, payload,
                 proxy_count, auto_refresh, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                payload = excluded.payload,
                proxy_count = excluded.proxy_count,
                updated_at = excluded.updated_at
            ",
        )
        .bind(artifact.id.as_str())
        .bind(artifact.kind.as_str())
        .bind(artifact.fingerprint.as_str())
        .bind(artifact.source.kind_str())
        .bind(artifact.source.value())
        .bind(&artifact.payload)
        .bind(count_column(artifact.proxy_count))
        .bind(artifact.auto_refresh)
        .bind(artifact.created_at)
        .bind(artifact.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO fingerprints (kind, fingerprint, artifact_id)
            VALUES (?, ?, ?)
            ON CONFLICT(kind, fingerprint) DO UPDATE SET artifact_id = excluded.artifact_id
            ",
        )
        .bind(artifact.kind.as_str())
        .bind(artifact.fingerprint.as_str())
        .bind(artifact.id.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("Artifact persisted");
        Ok(())
    }

    #[instrument(skip(self, artifact), fields(id = %artifact.id))]
    async fn update_content(&self, artifact: &ConversionArtifact) -> Result<()> {
        let result = sqlx::query(
            "UPDATE artifacts SET payload = ?, proxy_count = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&artifact.payload)
        .bind(count_column(artifact.proxy_count))
        .bind(artifact.updated_at)
        .bind(artifact.id.as_str())
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ArtifactNotFound(artifact.id.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &ArtifactId) -> Result<Option<ConversionArtifact>> {
        let row = sqlx::query_as::<_, ArtifactRow>(&format!("{SELECT_ARTIFACT} WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(self.db.pool())
            .await?;

        row.map(ConversionArtifact::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<ConversionArtifact>> {
        let rows = sqlx::query_as::<_, ArtifactRow>(&format!(
            "{SELECT_ARTIFACT} ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(ConversionArtifact::try_from).collect()
    }

    #[instrument(skip(self, fingerprint), fields(fingerprint = %fingerprint))]
    async fn lookup_fingerprint(
        &self,
        kind: ArtifactKind,
        fingerprint: &Fingerprint,
    ) -> Result<Option<ArtifactId>> {
        let id: Option<(String,)> = sqlx::query_as(
            "SELECT artifact_id FROM fingerprints WHERE kind = ? AND fingerprint = ?",
        )
        .bind(kind.as_str())
        .bind(fingerprint.as_str())
        .fetch_optional(self.db.pool())
        .await?;

        Ok(id.map(|(id,)| ArtifactId::from(id)))
    }

    #[instrument(skip(self))]
    async fn orphans(&self) -> Result<Vec<ArtifactId>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r"
            SELECT a.id FROM artifacts a
            LEFT JOIN fingerprints f ON f.artifact_id = a.id
            WHERE f.artifact_id IS NULL
            ORDER BY a.created_at ASC, a.id ASC
            ",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(|(id,)| ArtifactId::from(id)).collect())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &ArtifactId) -> Result<()> {
        let result = sqlx::query("DELETE FROM artifacts WHERE id = ?")
            .bind(id.as_str())
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ArtifactNotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn store() -> SqliteStore {
        SqliteStore::new(Database::new_in_memory().await.unwrap())
    }

    fn artifact(text: &str) -> ConversionArtifact {
        let source = Source::Text(text.to_string());
        ConversionArtifact::new(
            ArtifactKind::Feed,
            Fingerprint::of(&source),
            source,
            format!("payload for {text}"),
            1,
        )
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips() {
        let store = store().await;
        let artifact = artifact("a");
        store.put(&artifact).await.unwrap();

        let loaded = store.get(&artifact.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, artifact.id);
        assert_eq!(loaded.source, artifact.source);
        assert_eq!(loaded.payload, artifact.payload);
        assert_eq!(loaded.kind, ArtifactKind::Feed);
    }

    #[tokio::test]
    async fn test_put_writes_fingerprint_mapping() {
        let store = store().await;
        let artifact = artifact("a");
        store.put(&artifact).await.unwrap();

        let mapped = store
            .lookup_fingerprint(ArtifactKind::Feed, &artifact.fingerprint)
            .await
            .unwrap();
        assert_eq!(mapped, Some(artifact.id.clone()));
        assert!(store
            .lookup_fingerprint(ArtifactKind::Document, &artifact.fingerprint)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = store().await;
        assert!(store.get(&ArtifactId::from("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_content_keeps_mapping() {
        let store = store().await;
        let artifact = artifact("a");
        store.put(&artifact).await.unwrap();

        let updated = artifact.with_content("fresh".to_string(), 7);
        store.update_content(&updated).await.unwrap();

        let loaded = store.get(&artifact.id).await.unwrap().unwrap();
        assert_eq!(loaded.payload, "fresh");
        assert_eq!(loaded.proxy_count, 7);
        assert_eq!(loaded.created_at, artifact.created_at);
    }

    #[tokio::test]
    async fn test_update_content_missing_fails() {
        let store = store().await;
        let err = store.update_content(&artifact("a")).await.unwrap_err();
        assert!(matches!(err, StoreError::ArtifactNotFound(_)));
    }

    #[tokio::test]
    async fn test_second_put_for_fingerprint_orphans_first() {
        let store = store().await;
        let first = artifact("same");
        let second = artifact("same");
        store.put(&first).await.unwrap();
        store.put(&second).await.unwrap();

        assert_eq!(
            store
                .lookup_fingerprint(ArtifactKind::Feed, &first.fingerprint)
                .await
                .unwrap(),
            Some(second.id.clone())
        );
        assert_eq!(store.orphans().await.unwrap(), vec![first.id.clone()]);

        store.delete(&first.id).await.unwrap();
        assert!(store.orphans().await.unwrap().is_empty());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_fails() {
        let store = store().await;
        let err = store.delete(&ArtifactId::from("nope")).await.unwrap_err();
        assert!(matches!(err, StoreError::ArtifactNotFound(_)));
    }

    #[tokio::test]
    async fn test_corrupt_row_is_reported() {
        let store = store().await;
        sqlx::query(
            "INSERT INTO artifacts (id, kind, fingerprint, source_kind, source_value, payload, proxy_count, auto_refresh, created_at, updated_at) \
             VALUES ('bad', 'feed', 'f', 'url', 'x', 'p', 0, 1, 'not a timestamp', 'not a timestamp')",
        )
        .execute(store.database().pool())
        .await
        .unwrap();

        assert!(store.get(&ArtifactId::from("bad")).await.is_err());
    }
}
