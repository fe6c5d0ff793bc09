use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{relevance_score, top_k, VectorStore};
use super::types::{Chunk, ScoredChunk};
use crate::core::errors::ApiError;

/// Process-local index, rebuilt on every start. Same ranking as the SQLite store.
#[derive(Default)]
pub struct InMemoryVectorStore {
    entries: RwLock<Vec<(Chunk, Vec<f32>)>>,
    embedding_model: RwLock<Option<String>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, ApiError> {
        let entries = self.entries.read().await;
        let scored = entries
            .iter()
            .map(|(chunk, embedding)| ScoredChunk {
                chunk: chunk.clone(),
                score: relevance_score(query_embedding, embedding),
            })
            .collect();
        Ok(top_k(scored, limit))
    }

    async fn count(&self) -> Result<usize, ApiError> {
        Ok(self.entries.read().await.len())
    }

    async fn embedding_model(&self) -> Result<Option<String>, ApiError> {
        Ok(self.embedding_model.read().await.clone())
    }

    async fn replace_all(
        &self,
        items: Vec<(Chunk, Vec<f32>)>,
        embedding_model: &str,
    ) -> Result<(), ApiError> {
        let mut entries = self.entries.write().await;
        let mut model = self.embedding_model.write().await;
        *entries = items;
        *model = Some(embedding_model.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replace_all_drops_previous_chunks() {
        let store = InMemoryVectorStore::new();
        store
            .replace_all(vec![(Chunk::new("old", 0, "text"), vec![0.0, 1.0])], "old-embed")
            .await
            .unwrap();

        store
            .replace_all(vec![(Chunk::new("new", 0, "text"), vec![1.0, 0.0])], "new-embed")
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.embedding_model().await.unwrap().as_deref(), Some("new-embed"));
        let results = store.search(&[1.0, 0.0], 5).await.unwrap();
        assert_eq!(results[0].chunk.source, "new");
        assert!(results[0].score > 0.99);
    }
}
