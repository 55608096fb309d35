pub mod code_time;
pub mod ingest;
pub mod username;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;

/// Health check endpoint for Docker/K8s liveness probes.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "gateway-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness check endpoint for K8s readiness probes.
pub async fn readiness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ready" })))
}

/// Last-resort responder for panics escaping a handler; keeps the
/// one-response-per-request guarantee.
pub fn panic_responder(_err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    tracing::error!("Panic while handling request");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "An unknown error occurred." })),
    )
        .into_response()
}
