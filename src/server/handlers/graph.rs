use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::privacy::mask_value;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GraphQuery {
    pub query: String,
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub resume_data: Option<String>,
}

/// One conversational turn. Starts or continues the thread named by `id`,
/// or resumes it when `resume_data` answers a pending human-input request.
pub async fn ask_graph(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GraphQuery>,
) -> Result<Json<Value>, ApiError> {
    let resume_data = request.resume_data.filter(|data| !data.is_empty());
    let turn = state
        .graph
        .ask(&request.query, request.id, resume_data)
        .await?;

    let mut response = serde_json::to_value(&turn.response).map_err(ApiError::internal)?;
    // The thread id stays intact so clients can continue the conversation.
    if state.config.privacy.mask_graph_responses {
        response = mask_value(response);
    }
    Ok(Json(json!({
        "response": response,
        "thread_id": turn.thread_id,
    })))
}
