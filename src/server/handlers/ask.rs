use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::rag::AnswerResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub query: String,
    pub k: i64,
}

/// Grounded answer with citations for a single question.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AnswerResult>, ApiError> {
    if request.k <= 0 {
        return Err(ApiError::BadRequest(format!(
            "k must be a positive integer, got {}",
            request.k
        )));
    }
    let k = usize::try_from(request.k).map_err(|_| {
        ApiError::BadRequest(format!("k is out of range: {}", request.k))
    })?;

    let result = state.assembler.answer(&request.query, k).await?;
    Ok(Json(result))
}
