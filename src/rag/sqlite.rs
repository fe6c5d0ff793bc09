//! SQLite-backed vector index.
//!
//! Chunk text and embeddings live in one table inside the index directory;
//! search is a brute-force scan over every stored vector.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{relevance_score, top_k, VectorStore};
use super::types::{Chunk, ScoredChunk};
use crate::core::errors::ApiError;

pub const INDEX_FILE_NAME: &str = "index.db";

pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Opens (or creates) `index.db` inside `index_dir`.
    pub async fn open_dir(index_dir: &Path) -> Result<Self, ApiError> {
        std::fs::create_dir_all(index_dir).map_err(|e| {
            ApiError::internal(format!(
                "Failed to create index directory {}: {}",
                index_dir.display(),
                e
            ))
        })?;
        Self::with_path(index_dir.join(INDEX_FILE_NAME)).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                ordinal INTEGER NOT NULL DEFAULT 0,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source, ordinal)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    async fn insert_rows(
        conn: &mut sqlx::SqliteConnection,
        items: &[(Chunk, Vec<f32>)],
    ) -> Result<(), ApiError> {
        for (chunk, embedding) in items {
            let blob = Self::serialize_embedding(embedding);
            sqlx::query(
                "INSERT OR REPLACE INTO chunks (chunk_id, content, source, ordinal, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.content)
            .bind(&chunk.source)
            .bind(chunk.ordinal as i64)
            .bind(&blob)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> Chunk {
        let ordinal: i64 = row.get("ordinal");
        Chunk {
            chunk_id: row.get("chunk_id"),
            content: row.get("content"),
            source: row.get("source"),
            ordinal: ordinal.max(0) as usize,
        }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn replace_all(
        &self,
        items: Vec<(Chunk, Vec<f32>)>,
        embedding_model: &str,
    ) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
        Self::insert_rows(&mut tx, &items).await?;
        sqlx::query(
            "INSERT OR REPLACE INTO index_meta (key, value, updated_at)
             VALUES ('embedding_model', ?1, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(embedding_model)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, ApiError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT chunk_id, content, source, ordinal, embedding
             FROM chunks
             ORDER BY source, ordinal",
        )
        .fetch_all(&self.pool)
        .await?;

        let scored: Vec<ScoredChunk> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored = Self::deserialize_embedding(&embedding_bytes);
                Some(ScoredChunk {
                    chunk: Self::row_to_chunk(row),
                    score: relevance_score(query_embedding, &stored),
                })
            })
            .collect();

        Ok(top_k(scored, limit))
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }

    async fn embedding_model(&self) -> Result<Option<String>, ApiError> {
        let model: Option<String> =
            sqlx::query_scalar("SELECT value FROM index_meta WHERE key = 'embedding_model'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> (tempfile::TempDir, SqliteVectorStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SqliteVectorStore::open_dir(&dir.path().join("vdb"))
            .await
            .expect("open store");
        (dir, store)
    }

    #[tokio::test]
    async fn insert_and_search() {
        let (_dir, store) = test_store().await;

        let chunk = Chunk::new("data/faq.txt", 0, "Hello world");
        let embedding = vec![1.0, 0.0, 0.0];

        store
            .replace_all(vec![(chunk.clone(), embedding.clone())], "test-embed")
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        let results = store.search(&embedding, 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk, chunk);
        assert!(results[0].score > 0.99);
    }

    #[tokio::test]
    async fn search_ranks_and_limits() {
        let (_dir, store) = test_store().await;

        store
            .replace_all(
                vec![
                    (Chunk::new("doc", 0, "far"), vec![0.0, 1.0]),
                    (Chunk::new("doc", 1, "near"), vec![1.0, 0.1]),
                    (Chunk::new("doc", 2, "middle"), vec![1.0, 1.0]),
                ],
                "test-embed",
            )
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 2).await.unwrap();

        let contents: Vec<&str> = results.iter().map(|r| r.chunk.content.as_str()).collect();
        assert_eq!(contents, vec!["near", "middle"]);
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn index_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let index_dir = dir.path().join("vdb");
        {
            let store = SqliteVectorStore::open_dir(&index_dir).await.unwrap();
            store
                .replace_all(vec![(Chunk::new("doc", 0, "kept"), vec![1.0])], "text-embedding-004")
                .await
                .unwrap();
        }

        let reopened = SqliteVectorStore::open_dir(&index_dir).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
        assert_eq!(
            reopened.embedding_model().await.unwrap().as_deref(),
            Some("text-embedding-004")
        );
        assert!(index_dir.join(INDEX_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn replace_all_swaps_contents_and_model() {
        let (_dir, store) = test_store().await;
        store
            .replace_all(
                vec![
                    (Chunk::new("old", 0, "first"), vec![1.0]),
                    (Chunk::new("old", 1, "second"), vec![1.0]),
                ],
                "old-embed",
            )
            .await
            .unwrap();

        store
            .replace_all(vec![(Chunk::new("new", 0, "only"), vec![1.0])], "new-embed")
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.embedding_model().await.unwrap().as_deref(), Some("new-embed"));
        let results = store.search(&[1.0], 3).await.unwrap();
        assert_eq!(results[0].chunk.source, "new");
    }
}
