use std::sync::Arc;

use async_trait::async_trait;

use super::store::VectorStore;
use super::types::ScoredChunk;
use crate::core::errors::ApiError;
use crate::llm::{EmbedTask, LlmProvider};

/// Returns the `k` chunks most relevant to a query, best first, each with a
/// relevance score (1.0 for an exact match).
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, ApiError>;

    /// Retrieval filtered to results scoring at least `threshold`.
    async fn retrieve_above(
        &self,
        query: &str,
        k: usize,
        threshold: f32,
    ) -> Result<Vec<ScoredChunk>, ApiError> {
        let results = self.retrieve(query, k).await?;
        Ok(results.into_iter().filter(|r| r.score >= threshold).collect())
    }
}

/// Embeds the query with the same provider that built the index, then
/// searches the vector store.
pub struct VectorRetriever {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn VectorStore>,
}

impl VectorRetriever {
    pub fn new(provider: Arc<dyn LlmProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { provider, store }
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, ApiError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut embeddings = self
            .provider
            .embed(&[query.to_string()], EmbedTask::Query)
            .await?;
        let query_embedding = embeddings
            .pop()
            .ok_or_else(|| ApiError::upstream("provider returned no embedding for query"))?;

        let results = self.store.search(&query_embedding, k).await?;
        tracing::debug!("Retrieved {} chunks for query (k={})", results.len(), k);
        Ok(results)
    }
}
