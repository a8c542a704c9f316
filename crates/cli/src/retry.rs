//! Retry policies for individual protocol requests.

use crate::api_client::TransferError;
use splice_core::config::RetryConfig;
use std::future::Future;
use std::time::Duration;

/// Decides whether and when a failed request is sent again.
pub trait RetryPolicy: Send + Sync {
    /// Delay before the next attempt, or `None` to give up.
    ///
    /// `attempt` is the number of attempts made so far (1 after the first
    /// failure).
    fn next_delay(&self, attempt: u32, error: &TransferError) -> Option<Duration>;
}

/// Never retry.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn next_delay(&self, _attempt: u32, _error: &TransferError) -> Option<Duration> {
        None
    }
}

/// Bounded attempts with a doubling delay, for retryable errors only.
#[derive(Clone, Copy, Debug)]
pub struct ExponentialBackoff {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for ExponentialBackoff {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32, error: &TransferError) -> Option<Duration> {
        if attempt >= self.max_attempts || !error.is_retryable() {
            return None;
        }
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        Some(self.base_delay.saturating_mul(factor).min(self.max_delay))
    }
}

/// Run `op` until it succeeds or `policy` gives up, returning the last error.
pub async fn with_retry<T, F, Fut>(
    policy: &dyn RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T, TransferError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransferError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => match policy.next_delay(attempt, &e) {
                Some(delay) => {
                    tracing::warn!(
                        what,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return Err(e),
            },
        }
    }
}
