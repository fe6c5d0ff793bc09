use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Logs method, path, status and elapsed time of every request.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    let status = response.status();
    if status.is_server_error() {
        tracing::warn!("{} {} -> {} ({:.2}ms)", method, path, status.as_u16(), elapsed_ms);
    } else {
        tracing::info!("{} {} -> {} ({:.2}ms)", method, path, status.as_u16(), elapsed_ms);
    }

    response
}
