//! Health Check API Handler
//!
//! Liveness of the gateway itself; says nothing about the worker.

use axum::{http::StatusCode, response::IntoResponse};

/// GET /api/health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok!")
}
