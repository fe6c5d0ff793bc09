use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::rag::Retriever;

pub(super) const DESCRIPTION: &str =
    "Retrieve information on insurance policy, FAQ, KYC rules and hospitals";

/// Policy-document lookup used by the graph. Returns matching chunk contents
/// separated by blank lines, or an empty string when nothing clears the
/// score threshold.
pub struct RetrievalTool {
    retriever: Arc<dyn Retriever>,
    k: usize,
    score_threshold: f32,
}

impl RetrievalTool {
    pub fn new(retriever: Arc<dyn Retriever>, k: usize, score_threshold: f32) -> Self {
        Self {
            retriever,
            k,
            score_threshold,
        }
    }

    pub async fn run(&self, query: &str) -> Result<String, ApiError> {
        let results = self
            .retriever
            .retrieve_above(query, self.k, self.score_threshold)
            .await?;
        tracing::debug!(
            "Retrieval tool matched {} chunks (k={}, threshold={})",
            results.len(),
            self.k,
            self.score_threshold
        );
        Ok(results
            .iter()
            .map(|r| r.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}
