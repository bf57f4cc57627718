use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Greeting served on `GET /`.
pub const GREETING: &str = "Gemini Backend is running!";

/// `GET /`: confirms the process is reachable.
pub async fn index() -> &'static str {
    GREETING
}

/// `GET /health`: liveness check for Docker/K8s.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "gemini-relay",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
