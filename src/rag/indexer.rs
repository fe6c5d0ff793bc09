//! Index build pipeline: load, split, embed, persist.

use std::sync::Arc;
use std::time::Instant;

use futures_util::{stream, StreamExt, TryStreamExt};
use serde::Serialize;

use super::loader::DocumentLoader;
use super::splitter::TextSplitter;
use super::store::VectorStore;
use super::types::{Chunk, Document};
use crate::core::config::AppConfig;
use crate::core::errors::ApiError;
use crate::llm::{EmbedTask, LlmProvider};

/// Embedding requests in flight at once.
const EMBED_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IndexReport {
    pub documents: usize,
    pub chunks: usize,
    pub elapsed_ms: u128,
}

pub struct Indexer {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn VectorStore>,
    splitter: TextSplitter,
    batch_size: usize,
    embedding_model: String,
}

impl Indexer {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStore>,
        splitter: TextSplitter,
        batch_size: usize,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            splitter,
            batch_size: batch_size.max(1),
            embedding_model: embedding_model.into(),
        }
    }

    /// Indexer using the `rag` chunking settings and the configured embedding model.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self::new(
            provider,
            store,
            TextSplitter::new(config.rag.chunk_size, config.rag.chunk_overlap),
            config.rag.embed_batch_size,
            config.llm.embedding_model.clone(),
        )
    }

    /// Rebuilds the index from every text file the loader finds.
    pub async fn build_from_dir(&self, loader: &DocumentLoader) -> Result<IndexReport, ApiError> {
        tracing::info!("Loading documents from {}", loader.dir().display());
        let documents = loader.load()?;
        self.build(&documents).await
    }

    /// Replaces the store contents with embeddings of `documents`.
    ///
    /// Every chunk is embedded before the store is touched, so a provider
    /// failure leaves the previous index in place.
    pub async fn build(&self, documents: &[Document]) -> Result<IndexReport, ApiError> {
        let started = Instant::now();
        let chunks = self.splitter.split_documents(documents);
        tracing::info!(
            "Indexing {} chunks from {} documents",
            chunks.len(),
            documents.len()
        );

        let batches: Vec<Vec<Chunk>> = chunks
            .chunks(self.batch_size)
            .map(|batch| batch.to_vec())
            .collect();

        let provider = self.provider.clone();
        let embedded: Vec<Vec<(Chunk, Vec<f32>)>> = stream::iter(batches)
            .map(|batch| {
                let provider = provider.clone();
                async move {
                    let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
                    let vectors = provider.embed(&texts, EmbedTask::Document).await?;
                    if vectors.len() != batch.len() {
                        return Err(ApiError::upstream(format!(
                            "embedding count mismatch: sent {}, received {}",
                            batch.len(),
                            vectors.len()
                        )));
                    }
                    Ok(batch.into_iter().zip(vectors).collect())
                }
            })
            .buffered(EMBED_CONCURRENCY)
            .try_collect()
            .await?;

        let items: Vec<(Chunk, Vec<f32>)> = embedded.into_iter().flatten().collect();
        self.store.replace_all(items, &self.embedding_model).await?;

        let report = IndexReport {
            documents: documents.len(),
            chunks: chunks.len(),
            elapsed_ms: started.elapsed().as_millis(),
        };
        tracing::info!(
            "Index built: {} documents, {} chunks in {}ms",
            report.documents,
            report.chunks,
            report.elapsed_ms
        );
        Ok(report)
    }

    /// Builds only when the store is empty or was embedded with another model.
    pub async fn ensure_built(
        &self,
        loader: &DocumentLoader,
    ) -> Result<Option<IndexReport>, ApiError> {
        let count = self.store.count().await?;
        let stored_model = self.store.embedding_model().await?;

        if count > 0 && stored_model.as_deref() == Some(self.embedding_model.as_str()) {
            tracing::info!("Index already holds {} chunks, skipping build", count);
            return Ok(None);
        }
        if count > 0 {
            tracing::warn!(
                "Index was embedded with {:?}, rebuilding with {}",
                stored_model,
                self.embedding_model
            );
        }

        self.build_from_dir(loader).await.map(Some)
    }
}
