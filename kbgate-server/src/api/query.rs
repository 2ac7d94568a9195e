//! Query API Handler

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use kbgate_core::dto::envelope::Envelope;
use kbgate_core::dto::gateway::{QueryOutput, QueryRequest, QueryResponse};
use tracing::info;

use super::AppState;
use super::error::{ApiError, ApiResult};
use crate::config::is_plain_name;
use crate::service::query::{query_spec, run_query};

/// POST /api/query
///
/// The query process is killed if the client disconnects first.
pub async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<Json<QueryResponse>> {
    let Json(req) = payload?;

    if !is_plain_name(&req.db) {
        return Err(ApiError::BadRequest(format!(
            "invalid database name '{}'",
            req.db
        )));
    }
    let kb_path = state.settings.kb_path(&req.kb)?;

    info!(kb = %req.kb, db = %req.db, method = %req.method, "running query");

    let spec = query_spec(
        &state.settings.python,
        &state.settings.work_dir,
        &kb_path,
        &req,
    );
    let text = run_query(&spec).await?;

    Ok(Json(Envelope::success(QueryOutput { text })))
}
