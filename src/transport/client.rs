//! reqwest-backed transport
//!
//! This module handles real network I/O for source connectors, including:
//! - Building the HTTP client with user agent and timeouts
//! - Translating [`HttpRequest`] into reqwest calls
//! - Collecting status and body without interpreting them

use crate::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// Per-request timeouts bound a single page fetch, which keeps every
/// fetch/submit cycle of the sync loop bounded together with the retry ceiling.
///
/// # Example
///
/// ```no_run
/// use ticket_sync::transport::build_http_client;
///
/// let client = build_http_client().unwrap();
/// ```
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let user_agent = format!("ticket-sync/{}", env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// A real HTTP transport backed by reqwest
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a transport with the default client configuration
    pub fn with_defaults() -> Result<Self, TransportError> {
        let client = build_http_client().map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (k, v) in &request.headers {
            builder = builder.header(k, v);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Http(format!("request timeout for {}", request.url))
            } else if e.is_connect() {
                TransportError::Http(format!("connection refused for {}", request.url))
            } else {
                TransportError::Http(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?
            .to_vec();

        Ok(HttpResponse { status, body })
    }
}

// ---------- Test-only mock transport ----------

#[cfg(test)]
use std::collections::{HashMap, VecDeque};
#[cfg(test)]
use std::sync::{Arc, Mutex};

/// In-memory mock transport keyed by method + URL (query ignored)
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[cfg(test)]
#[derive(Default)]
struct MockTransportInner {
    routes: HashMap<(HttpMethod, String), VecDeque<HttpResponse>>,
    requests: Vec<HttpRequest>,
}

#[cfg(test)]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a response; repeated registrations are served FIFO
    pub fn push_response(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        status: u16,
        body: &str,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .routes
            .entry((method, url.into()))
            .or_default()
            .push_back(HttpResponse {
                status,
                body: body.as_bytes().to_vec(),
            });
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.lock().unwrap().requests.clone()
    }
}

#[cfg(test)]
#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut inner = self.inner.lock().unwrap();

        let key = (request.method, request.url.clone());
        inner.requests.push(request);

        match inner.routes.get_mut(&key).and_then(|q| q.pop_front()) {
            Some(resp) => Ok(resp),
            None => Err(TransportError::NoMockResponse {
                method: key.0.as_str().to_string(),
                url: key.1,
            }),
        }
    }
}
