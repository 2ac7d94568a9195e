//! API Error Handling
//!
//! Unified error type and conversion for API responses. Every error body is
//! an envelope with `code = -1` and a readable `msg`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kbgate_client::ClientError;
use kbgate_core::dto::envelope::Envelope;

use crate::config::KbPathError;
use crate::service::JobError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Job(JobError),
    Worker(ClientError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Job(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Worker(err) if err.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Worker(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) | ApiError::Conflict(msg) => msg,
            ApiError::Job(err) => {
                tracing::error!("Job error: {}", err);
                err.to_string()
            }
            ApiError::Worker(err) => {
                tracing::error!("Worker error: {}", err);
                err.to_string()
            }
        };

        (status, Json(Envelope::error(message))).into_response()
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Contention => ApiError::Conflict(err.to_string()),
            other => ApiError::Job(other),
        }
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        ApiError::Worker(err)
    }
}

impl From<KbPathError> for ApiError {
    fn from(err: KbPathError) -> Self {
        match err {
            KbPathError::InvalidName(_) => ApiError::BadRequest(err.to_string()),
            KbPathError::NotFound(_) => ApiError::NotFound(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
