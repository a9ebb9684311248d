//! HTTP transport for source APIs
//!
//! This module contains the transport boundary used by every source connector:
//! - A minimal request/response model and the [`HttpTransport`] trait
//! - A reqwest-backed implementation for real network I/O
//! - A shared bounded-retry policy with exponential backoff
//! - [`RetryingTransport`], which retries idempotent requests on transient statuses

mod client;
mod retry;
mod retrying;

pub use client::{build_http_client, ReqwestTransport};
pub use retry::{with_retry, RetryPolicy};
pub use retrying::RetryingTransport;

#[cfg(test)]
pub(crate) use client::MockTransport;

use async_trait::async_trait;
use thiserror::Error;

/// Minimal HTTP method enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// HTTP headers and query parameters as ordered key/value pairs
pub type HttpPairs = Vec<(String, String)>;

/// A minimal HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: HttpPairs,
    pub headers: HttpPairs,
}

impl HttpRequest {
    /// Creates a GET request with no query or headers
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// Appends a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Appends every header in `headers`
    pub fn headers(mut self, headers: &[(String, String)]) -> Self {
        self.headers.extend(headers.iter().cloned());
        self
    }
}

/// A minimal HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Response body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Errors raised by the transport layer
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("retries exhausted after {attempts} attempts: HTTP {status}: {body}")]
    RetriesExhausted {
        status: u16,
        body: String,
        attempts: u32,
    },

    #[error("http transport error: {0}")]
    Http(String),

    #[cfg(test)]
    #[error("no mock response registered for {method} {url}")]
    NoMockResponse { method: String, url: String },
}

/// Transport boundary for all HTTP I/O
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let headers = vec![("Accept".to_string(), "application/json".to_string())];
        let request = HttpRequest::get("https://example.com/api")
            .query("jql", "project = OPS")
            .query("maxResults", "100")
            .headers(&headers);

        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.query.len(), 2);
        assert_eq!(request.query[0].0, "jql");
        assert_eq!(request.headers, headers);
    }

    #[test]
    fn test_response_helpers() {
        let ok = HttpResponse {
            status: 204,
            body: Vec::new(),
        };
        assert!(ok.is_success());

        let err = HttpResponse {
            status: 503,
            body: b"unavailable".to_vec(),
        };
        assert!(!err.is_success());
        assert_eq!(err.text(), "unavailable");
    }

    #[test]
    fn test_exhausted_error_carries_last_response() {
        let err = TransportError::RetriesExhausted {
            status: 429,
            body: "slow down".to_string(),
            attempts: 6,
        };
        assert_eq!(
            err.to_string(),
            "retries exhausted after 6 attempts: HTTP 429: slow down"
        );
    }
}
