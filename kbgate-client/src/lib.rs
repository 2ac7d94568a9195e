//! kbgate Worker Client
//!
//! A small, type-safe HTTP client for the supervised worker process.
//!
//! Every call is a single attempt bounded by the client's timeout (5 seconds
//! by default). There is no retry or backoff; failures surface as
//! [`ClientError`] and the caller decides what to do. The client holds no
//! mutable state, so clones can be used from any number of tasks at once.
//!
//! # Example
//!
//! ```no_run
//! use kbgate_client::WorkerClient;
//! use kbgate_core::dto::worker::NerRequest;
//!
//! # async fn example() -> kbgate_client::Result<()> {
//! let client = WorkerClient::new("http://127.0.0.1:8081");
//!
//! let rsp = client.ner(&NerRequest { text: "Ada Lovelace".to_string() }).await?;
//! println!("{}", rsp.payload.text);
//! # Ok(())
//! # }
//! ```

pub mod error;
mod worker;

pub use error::{ClientError, Result};

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the worker API
#[derive(Debug, Clone)]
pub struct WorkerClient {
    /// Base URL of the worker (e.g., "http://127.0.0.1:8081")
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Upper bound for a whole request, connect through body
    timeout: Duration,
}

impl WorkerClient {
    /// Create a new worker client with the default timeout
    ///
    /// # Example
    /// ```
    /// use kbgate_client::WorkerClient;
    ///
    /// let client = WorkerClient::new("http://127.0.0.1:8081");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new worker client with a custom HTTP client
    ///
    /// This allows you to configure proxies, TLS settings, etc. The per-request
    /// timeout is still applied on top.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replace the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the base URL of the worker
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    // =============================================================================
    // Generic Calls
    // =============================================================================

    /// POST a JSON body to `endpoint` and decode a JSON response
    pub async fn post_json<Req, Rsp>(&self, endpoint: &str, body: &Req) -> Result<Rsp>
    where
        Req: Serialize + ?Sized,
        Rsp: DeserializeOwned,
    {
        let url = self.url(endpoint);
        debug!(url = %url, "worker POST");

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// GET `endpoint` and decode a JSON response
    pub async fn get_json<Rsp: DeserializeOwned>(&self, endpoint: &str) -> Result<Rsp> {
        let url = self.url(endpoint);
        debug!(url = %url, "worker GET");

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// GET `path` and succeed on any 2xx status, ignoring the body
    pub async fn health(&self, path: &str) -> Result<()> {
        let response = self
            .client
            .get(self.url(path))
            .timeout(self.timeout)
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::status(status.as_u16(), error_text));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            return Err(ClientError::status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown error"),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_client_creation() {
        let client = WorkerClient::new("http://127.0.0.1:8081");
        assert_eq!(client.base_url(), "http://127.0.0.1:8081");
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = WorkerClient::new("http://127.0.0.1:8081/");
        assert_eq!(client.base_url(), "http://127.0.0.1:8081");
        assert_eq!(client.url("/ner"), "http://127.0.0.1:8081/ner");
        assert_eq!(client.url("docs"), "http://127.0.0.1:8081/docs");
    }

    #[tokio::test]
    async fn test_health_accepts_any_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = WorkerClient::new(server.uri());
        assert!(client.health("/docs").await.is_ok());
    }

    #[tokio::test]
    async fn test_health_rejects_non_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = WorkerClient::new(server.uri());
        let err = client.health("/docs").await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_worker() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let client = WorkerClient::new(format!("http://127.0.0.1:{}", port));
        let err = client.health("/docs").await.unwrap_err();
        assert!(err.is_unreachable(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_slow_worker_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ner"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "code": 0, "msg": "success", "text": "" }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = WorkerClient::new(server.uri()).with_timeout(Duration::from_millis(500));

        let started = std::time::Instant::now();
        let err = client
            .post_json::<_, serde_json::Value>("/ner", &serde_json::json!({ "text": "x" }))
            .await
            .unwrap_err();

        assert!(err.is_timeout(), "unexpected error: {err}");
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
