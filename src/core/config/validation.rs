use super::types::AppConfig;
use crate::core::errors::ApiError;

pub fn validate_config(config: &AppConfig) -> Result<(), ApiError> {
    let rag = &config.rag;
    validate_range("rag.chunk_size", rag.chunk_size as u64, 1, 100_000)?;
    if rag.chunk_overlap >= rag.chunk_size {
        return Err(ApiError::BadRequest(format!(
            "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
            rag.chunk_overlap, rag.chunk_size
        )));
    }
    validate_range("rag.embed_batch_size", rag.embed_batch_size as u64, 1, 1_000)?;
    validate_unit_interval("rag.acceptance_threshold", rag.acceptance_threshold)?;

    let graph = &config.graph;
    validate_range("graph.max_steps", graph.max_steps as u64, 1, 10_000)?;
    validate_range("graph.retriever_k", graph.retriever_k as u64, 1, 100)?;
    validate_unit_interval(
        "graph.retriever_score_threshold",
        graph.retriever_score_threshold,
    )?;

    validate_range("llm.timeout_secs", config.llm.timeout_secs, 1, 86_400)?;
    if config.llm.chat_model.trim().is_empty() {
        return Err(ApiError::BadRequest("llm.chat_model must not be empty".to_string()));
    }
    if config.llm.embedding_model.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "llm.embedding_model must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_range(path: &str, value: u64, min: u64, max: u64) -> Result<(), ApiError> {
    if value < min || value > max {
        return Err(ApiError::BadRequest(format!(
            "{} must be between {} and {} (got {})",
            path, min, max, value
        )));
    }
    Ok(())
}

fn validate_unit_interval(path: &str, value: f32) -> Result<(), ApiError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ApiError::BadRequest(format!(
            "{} must be within [0, 1] (got {})",
            path, value
        )));
    }
    Ok(())
}
