//! API Module
//!
//! HTTP API layer for the gateway.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod kb;
pub mod query;
pub mod worker;

use axum::{
    Router,
    routing::{get, post},
};
use kbgate_client::WorkerClient;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Settings;
use crate::service::JobRunner;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub runner: JobRunner,
    pub worker: WorkerClient,
    pub settings: Arc<Settings>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/api/health", get(health::health_check))
        // Knowledge base endpoints
        .route("/api/kb/indexing", post(kb::index_kb))
        .route("/api/query", post(query::query))
        // Worker proxy endpoints
        .route("/api/ner", post(worker::ner))
        .route("/api/kgc", post(worker::kgc))
        .route("/api/kgc/benchmark", get(worker::kgc_benchmark))
        // Add state and middleware
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
