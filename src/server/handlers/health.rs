use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// Liveness check.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "response": "on" }))
}
