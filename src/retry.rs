//! Rate-limit retry policy.
//!
//! A narrow, signal-specific backoff — not generic exponential retry.
//! It exists solely to survive the remote service's request-pacing
//! guard: only failures carrying the rate-limit marker are retried,
//! everything else propagates immediately.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::RetryConfig;
use crate::types::ActionOutcome;

/// Retry decorator over a zero-argument remote action.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
    rate_limit_marker: String,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration, rate_limit_marker: impl Into<String>) -> Self {
        Self {
            // At least one execution, whatever the config says.
            max_attempts: max_attempts.max(1),
            backoff,
            rate_limit_marker: rate_limit_marker.into(),
        }
    }

    /// Whether a failure message is the remote pacing guard.
    pub fn is_rate_limited(&self, message: &str) -> bool {
        message.contains(&self.rate_limit_marker)
    }

    /// Execute `op` up to `max_attempts` times.
    ///
    /// A failure carrying the rate-limit marker sleeps the fixed backoff
    /// and retries while attempts remain; any other failure, or
    /// exhaustion, returns the outcome to the caller immediately.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> ActionOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ActionOutcome<T>>,
    {
        let mut attempt = 1;
        loop {
            let outcome = op().await;

            match &outcome {
                ActionOutcome::Failure(msg)
                    if self.is_rate_limited(msg) && attempt < self.max_attempts =>
                {
                    warn!(
                        attempt,
                        backoff_secs = self.backoff.as_secs(),
                        "Rate limited, waiting before retrying"
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                _ => return outcome,
            }
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self::new(
            cfg.max_attempts,
            Duration::from_secs(cfg.backoff_secs),
            cfg.rate_limit_marker.clone(),
        )
    }
}
