// Retry with exponential backoff.
// Re-runs a failing request while the error is transient and the budget allows.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::error::{ApiError, Result};

use super::cancel::CancelToken;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry; doubles for each one after.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Decides whether an error is worth another attempt.
pub type RetryPredicate = Arc<dyn Fn(&ApiError) -> bool + Send + Sync>;

/// Observer notified each time a retry is scheduled.
pub type OnRetry = Arc<dyn Fn(&RetryEvent<'_>) + Send + Sync>;

/// A retry about to happen.
#[derive(Debug)]
pub struct RetryEvent<'a> {
    /// 1-based number of the attempt that just failed.
    pub attempt: u32,
    /// Maximum number of attempts (`max_retries + 1`).
    pub total_attempts: u32,
    /// How long until the next attempt.
    pub delay: Duration,
    pub error: &'a ApiError,
}

/// Retry budget and backoff settings.
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    retry_if: RetryPredicate,
}

impl RetryPolicy {
    /// Policy with the given budget, default delay and transient-error predicate.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: DEFAULT_BASE_DELAY,
            retry_if: Arc::new(ApiError::is_transient),
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_predicate(mut self, retry_if: RetryPredicate) -> Self {
        self.retry_if = retry_if;
        self
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Cancellation is never retried, whatever the predicate says.
    pub fn should_retry(&self, error: &ApiError) -> bool {
        !error.is_cancelled() && (self.retry_if)(error)
    }

    /// Delay before retry number `retry_index` (0 for the first retry).
    pub fn delay_for(&self, retry_index: u32) -> Duration {
        let factor = 2u32.checked_pow(retry_index).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .finish_non_exhaustive()
    }
}

/// Run `operation` until it succeeds, fails terminally, or the budget runs out.
///
/// Returns the first success, or the last error unchanged. When `cancel` fires
/// the call stops immediately with [`ApiError::Cancelled`], whether it was
/// waiting on the operation or on a backoff delay.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    on_retry: Option<&OnRetry>,
    cancel: Option<&CancelToken>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let total_attempts = policy.total_attempts();
    let mut retry_index = 0;

    loop {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(ApiError::Cancelled);
        }

        let outcome = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(ApiError::Cancelled),
                result = operation() => result,
            },
            None => operation().await,
        };

        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if retry_index >= policy.max_retries || !policy.should_retry(&error) {
            if retry_index > 0 && !error.is_cancelled() {
                warn!(
                    attempts = retry_index + 1,
                    error = %error,
                    "request failed after retries"
                );
            }
            return Err(error);
        }

        let delay = policy.delay_for(retry_index);
        retry_index += 1;

        warn!(
            "API request failed (attempt {}/{}). Retrying in {}ms: {}",
            retry_index,
            total_attempts,
            delay.as_millis(),
            error
        );

        if let Some(on_retry) = on_retry {
            on_retry(&RetryEvent {
                attempt: retry_index,
                total_attempts,
                delay,
                error: &error,
            });
        }

        match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(ApiError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            None => tokio::time::sleep(delay).await,
        }
    }
}
