//! Retrying wrapper around an [`HttpTransport`].
//!
//! Requests whose method is in the retry set are retried while the response
//! status is in the configured forcelist, or when the connection itself fails.
//! Retry counters are local to one `send` call.

use crate::config::RetryConfig;
use crate::transport::retry::{with_retry, RetryPolicy};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// HTTP transport that retries transient failures with exponential backoff
#[derive(Clone)]
pub struct RetryingTransport {
    inner: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
    status_forcelist: Vec<u16>,
    retry_methods: Vec<HttpMethod>,
}

impl RetryingTransport {
    /// Wraps `inner` using the retry section of the configuration
    ///
    /// GET and POST are both retried: source requests are reads and lookups.
    pub fn new(inner: Arc<dyn HttpTransport>, config: &RetryConfig) -> Self {
        Self {
            inner,
            policy: RetryPolicy::from_config(config),
            status_forcelist: config.status_forcelist.clone(),
            retry_methods: vec![HttpMethod::Get, HttpMethod::Post],
        }
    }

    #[cfg(test)]
    pub(crate) fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn is_retryable_status(&self, status: u16) -> bool {
        self.status_forcelist.contains(&status)
    }
}

#[async_trait]
impl HttpTransport for RetryingTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if !self.retry_methods.contains(&request.method) {
            return self.inner.send(request).await;
        }

        let attempts = AtomicU32::new(0);
        let what = format!("{} {}", request.method.as_str(), request.url);
        let inner = &self.inner;
        let request = &request;
        let attempts_ref = &attempts;

        with_retry(
            &self.policy,
            &what,
            || async move {
                let attempt = attempts_ref.fetch_add(1, Ordering::SeqCst) + 1;
                let response = inner.send(request.clone()).await?;
                if self.is_retryable_status(response.status) {
                    return Err(TransportError::RetriesExhausted {
                        status: response.status,
                        body: response.text(),
                        attempts: attempt,
                    });
                }
                Ok(response)
            },
            |e: &TransportError| {
                matches!(
                    e,
                    TransportError::RetriesExhausted { .. } | TransportError::Http(_)
                )
            },
        )
        .await
    }
}
