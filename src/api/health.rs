//! Liveness endpoint

use super::not_found;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

/// Liveness check for load balancers
async fn health_check() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], "ok")
}

/// Create health routes
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_check).fallback(not_found))
}
