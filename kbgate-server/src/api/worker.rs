//! Worker Proxy Handlers
//!
//! Forward requests to the supervised worker and relay its envelope as-is.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use kbgate_core::dto::worker::{
    KgcBenchmarkResponse, KgcRequest, KgcResponse, NerRequest, NerResponse,
};

use super::AppState;
use super::error::ApiResult;

/// POST /api/ner
pub async fn ner(
    State(state): State<AppState>,
    payload: Result<Json<NerRequest>, JsonRejection>,
) -> ApiResult<Json<NerResponse>> {
    let Json(req) = payload?;
    Ok(Json(state.worker.ner(&req).await?))
}

/// POST /api/kgc
pub async fn kgc(
    State(state): State<AppState>,
    payload: Result<Json<KgcRequest>, JsonRejection>,
) -> ApiResult<Json<KgcResponse>> {
    let Json(req) = payload?;
    Ok(Json(state.worker.kgc(&req).await?))
}

/// GET /api/kgc/benchmark
pub async fn kgc_benchmark(State(state): State<AppState>) -> ApiResult<Json<KgcBenchmarkResponse>> {
    Ok(Json(state.worker.kgc_benchmark().await?))
}
