use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::config::defaults::local_origins;
use crate::server::handlers::{ask, graph, health, mask};
use crate::server::middleware::log_requests;
use crate::state::AppState;

/// Creates the application router.
///
/// - `GET /`: liveness
/// - `POST /ask`: grounded answer with citations
/// - `POST /askgraph`: conversational graph turn
/// - `POST /mask`: Aadhaar masking
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.config.server.cors_allowed_origins);
    Router::new()
        .route("/", get(health::health))
        .route("/ask", post(ask::ask))
        .route("/askgraph", post(graph::ask_graph))
        .route("/mask", post(mask::mask))
        .with_state(state)
        .layer(from_fn(log_requests))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(configured: &[String]) -> CorsLayer {
    let allowed_origins = resolve_allowed_origins(configured)
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(configured: &[String]) -> Vec<String> {
    let origins = configured
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return local_origins();
    }

    origins
}
