//! Grounded answer assembly behind `/ask`.
//!
//! Retrieval results are scored, filtered by the acceptance threshold and
//! formatted into a single prompt; the model's reply is returned verbatim
//! alongside citations for every accepted chunk.

use std::sync::Arc;
use std::time::Instant;

use super::retriever::Retriever;
use super::types::{AnswerResult, Citation, RetrievalInfo, ScoredChunk};
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;

pub const NO_CONTEXT_SENTINEL: &str = "No relevant context found in the knowledge base.";

const SYSTEM_INSTRUCTION: &str = "You are an insurance claim information assistant. \
Use ONLY the provided context below to answer the user's question concisely and accurately. \
ONLY USE THE CONTEXT WHEN THE QUERY PERTAINS TO INSURANCE.";

pub struct AnswerAssembler {
    retriever: Arc<dyn Retriever>,
    llm: Arc<dyn LlmProvider>,
    acceptance_threshold: f32,
}

impl AnswerAssembler {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        llm: Arc<dyn LlmProvider>,
        acceptance_threshold: f32,
    ) -> Self {
        Self {
            retriever,
            llm,
            acceptance_threshold,
        }
    }

    pub async fn answer(&self, query: &str, k: usize) -> Result<AnswerResult, ApiError> {
        if k == 0 {
            return Err(ApiError::BadRequest("k must be a positive integer".to_string()));
        }

        let started = Instant::now();
        let retrieved = self.retriever.retrieve(query, k).await?;
        let latency_ms = round2(started.elapsed().as_secs_f64() * 1000.0);

        let grounding_score = grounding_score(&retrieved);
        let accepted: Vec<&ScoredChunk> = retrieved
            .iter()
            .filter(|r| r.score >= self.acceptance_threshold)
            .collect();

        tracing::info!(
            retrieved = retrieved.len(),
            accepted = accepted.len(),
            grounding_score,
            latency_ms,
            "Retrieval complete"
        );

        let context = build_context(&accepted);
        let prompt = build_prompt(query, &context);
        let answer = self.llm.complete(&prompt).await?;

        Ok(AnswerResult {
            answer,
            citations: accepted.iter().map(|r| Citation::from_chunk(&r.chunk)).collect(),
            grounding_score,
            retrieval: RetrievalInfo {
                k: accepted.len(),
                latency_ms,
            },
        })
    }
}

/// Mean score of everything retrieved, accepted or not.
pub(crate) fn grounding_score(retrieved: &[ScoredChunk]) -> f64 {
    if retrieved.is_empty() {
        return 0.0;
    }
    let sum: f64 = retrieved.iter().map(|r| r.score as f64).sum();
    round2(sum / retrieved.len() as f64)
}

pub(crate) fn build_context(accepted: &[&ScoredChunk]) -> String {
    if accepted.is_empty() {
        return NO_CONTEXT_SENTINEL.to_string();
    }
    accepted
        .iter()
        .map(|r| format!("Context: {}\nCitation: {}", r.chunk.content, r.chunk.source))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub(crate) fn build_prompt(query: &str, context: &str) -> String {
    format!("{SYSTEM_INSTRUCTION}\n\nUser Query: {query}\n\nContext:\n{context}")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
