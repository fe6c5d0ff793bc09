use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to initialize LLM provider: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Failed to initialize vector index: {0}")]
    Rag(#[source] anyhow::Error),

    #[error("Failed to initialize checkpoint store: {0}")]
    Checkpoint(#[source] anyhow::Error),

    #[error("Failed to build conversation graph: {0}")]
    Graph(#[source] anyhow::Error),
}
