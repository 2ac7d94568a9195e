//! Error types for the worker client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when calling the worker
///
/// Every variant is terminal for the call: the client never retries.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The worker did not answer within the configured timeout
    #[error("worker request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// The worker could not be reached at all
    #[error("worker unreachable: {0}")]
    Connection(#[source] reqwest::Error),

    /// Any other transport-level failure
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[source] reqwest::Error),

    /// The worker answered with a non-success status code
    #[error("worker error (status {status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// The worker answered 2xx with a body of the wrong shape
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl ClientError {
    /// Create a status error from code and body
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if the worker could not be reached
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status >= 500)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err)
        } else if err.is_connect() {
            Self::Connection(err)
        } else if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::RequestFailed(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let err = ClientError::status(503, "loading model");
        assert!(err.is_server_error());
        assert!(!err.is_timeout());
        assert_eq!(
            err.to_string(),
            "worker error (status 503): loading model"
        );

        assert!(!ClientError::status(422, "bad body").is_server_error());
    }
}
