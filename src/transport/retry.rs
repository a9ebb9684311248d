//! Shared bounded-retry utilities.
//!
//! Every retryable operation in the crate (HTTP requests in the retrying
//! transport, starting index-side sync jobs) goes through [`RetryPolicy`] and
//! [`with_retry`], so backoff behavior is configured in one place.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::config::RetryConfig;

/// Exponential backoff configuration.
///
/// Retry `n` (1-based) waits `min_delay * 2^(n-1)`, capped at `max_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub min_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Maximum number of retries after the first attempt.
    pub max_retries: usize,
    /// Whether to add jitter to delays.
    pub with_jitter: bool,
}

impl RetryPolicy {
    #[cfg(test)]
    #[must_use]
    pub(crate) fn new(min_delay: Duration, max_delay: Duration, max_retries: usize) -> Self {
        Self {
            min_delay,
            max_delay,
            max_retries,
            with_jitter: false,
        }
    }

    /// Policy for the retrying transport.
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            min_delay: Duration::from_millis(config.backoff_factor_ms),
            max_delay: Duration::from_millis(config.max_backoff_ms),
            max_retries: config.total,
            with_jitter: config.jitter,
        }
    }

    /// Policy for starting an index-side sync job: `attempts` total tries.
    #[must_use]
    pub fn for_start_sync(attempts: usize) -> Self {
        Self {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: attempts.saturating_sub(1),
            with_jitter: true,
        }
    }

    /// Build an exponential backoff strategy from this policy.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}

/// Execute an operation, retrying errors accepted by `is_retryable`.
///
/// Each retry is logged with the backoff it is about to sleep and the attempt
/// that failed. Once the policy is exhausted the last error is returned.
pub async fn with_retry<T, E, F, Fut, IsRetryable>(
    policy: &RetryPolicy,
    what: &str,
    mut operation: F,
    is_retryable: IsRetryable,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    IsRetryable: Fn(&E) -> bool,
{
    let attempt = AtomicU32::new(0);

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    retry_op
        .retry(policy.clone().into_backoff())
        .notify(|err: &E, dur: Duration| {
            tracing::warn!(
                "{} failed (attempt {}): {}. Retrying after {:?}",
                what,
                attempt.load(Ordering::SeqCst),
                err,
                dur
            );
        })
        .when(|e: &E| is_retryable(e))
        .await
}
