// Checkpoint stores
// Persist ConversationState per thread id between requests

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tokio::sync::RwLock;

use super::state::ConversationState;
use crate::core::errors::ApiError;

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, ApiError>;

    /// Insert or replace the checkpoint for `state.thread_id`.
    async fn save(&self, state: &ConversationState) -> Result<(), ApiError>;
}

#[derive(Default)]
pub struct InMemoryCheckpointStore {
    threads: RwLock<HashMap<String, ConversationState>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, ApiError> {
        Ok(self.threads.read().await.get(thread_id).cloned())
    }

    async fn save(&self, state: &ConversationState) -> Result<(), ApiError> {
        self.threads
            .write()
            .await
            .insert(state.thread_id.clone(), state.clone());
        Ok(())
    }
}

#[derive(Clone)]
pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ApiError::internal(format!(
                    "Failed to create checkpoint directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to connect to checkpoint db: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS conversations (
                thread_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                state JSON NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to init conversations table: {}", e)))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, ApiError> {
        let row = sqlx::query("SELECT state FROM conversations WHERE thread_id = ?")
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row.try_get("state")?;
        let state = serde_json::from_str(&raw).map_err(|e| {
            ApiError::internal(format!("Corrupt checkpoint for thread {}: {}", thread_id, e))
        })?;
        Ok(Some(state))
    }

    async fn save(&self, state: &ConversationState) -> Result<(), ApiError> {
        let raw = serde_json::to_string(state).map_err(ApiError::internal)?;

        sqlx::query(
            "INSERT INTO conversations (thread_id, status, state, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(thread_id) DO UPDATE SET
                status = excluded.status,
                state = excluded.state,
                updated_at = excluded.updated_at",
        )
        .bind(&state.thread_id)
        .bind(state.status.as_str())
        .bind(&raw)
        .bind(state.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::state::ConversationStatus;
    use crate::llm::ChatMessage;

    fn sample_state() -> ConversationState {
        let mut state = ConversationState::new("thread-1");
        state.push(ChatMessage::user("What is the TAT?"));
        state.status = ConversationStatus::AwaitingInput {
            tool_call_id: "call_1".to_string(),
            query: "Policy number?".to_string(),
        };
        state
    }

    async fn exercise(store: &dyn CheckpointStore) {
        assert!(store.load("thread-1").await.unwrap().is_none());

        let mut state = sample_state();
        store.save(&state).await.unwrap();
        assert_eq!(store.load("thread-1").await.unwrap(), Some(state.clone()));

        state.status = ConversationStatus::Completed;
        state.push(ChatMessage::assistant("30 days.", Vec::new()));
        store.save(&state).await.unwrap();
        assert_eq!(store.load("thread-1").await.unwrap(), Some(state.clone()));

        let other = ConversationState::new("thread-2");
        store.save(&other).await.unwrap();
        assert_eq!(store.load("thread-2").await.unwrap(), Some(other));
        assert_eq!(store.load("thread-1").await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn in_memory_store_round_trips() {
        exercise(&InMemoryCheckpointStore::new()).await;
    }

    #[tokio::test]
    async fn sqlite_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteCheckpointStore::new(dir.path().join("conversations.db"))
            .await
            .unwrap();
        exercise(&store).await;
    }

    #[tokio::test]
    async fn sqlite_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("conversations.db");
        let state = sample_state();
        {
            let store = SqliteCheckpointStore::new(path.clone()).await.unwrap();
            store.save(&state).await.unwrap();
        }

        let reopened = SqliteCheckpointStore::new(path).await.unwrap();
        assert_eq!(reopened.load("thread-1").await.unwrap(), Some(state));
    }
}
