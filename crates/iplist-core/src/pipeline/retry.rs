//! Retry policy for provider calls
//!
//! Providers are single-shot: they make one API call and report the outcome.
//! The policy here is the only place that bounds, retries or backs off.
//!
//! - Every attempt is bounded by `call_timeout`; an elapsed timeout counts as
//!   a transient provider error.
//! - `ProviderTransient` errors are retried up to `max_retries` times with
//!   exponential backoff `min(base_delay * 2^attempt, max_delay)`.
//! - Every other error is returned immediately.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{Error, Result};

/// Bounded retry with exponential backoff and a per-call timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: usize,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound of any single delay
    pub max_delay: Duration,
    /// Timeout of each individual attempt
    pub call_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(
        max_retries: usize,
        base_delay: Duration,
        max_delay: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            call_timeout,
        }
    }

    /// Build the policy from engine settings
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.retry_base_ms),
            Duration::from_millis(config.retry_max_ms),
            config.call_timeout(),
        )
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: usize) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `call` under the policy
    ///
    /// # Parameters
    ///
    /// - `provider`: Provider name, used for timeout errors and logs
    /// - `operation`: Operation name, used for logs
    /// - `call`: Produces a fresh attempt each time it is invoked
    pub async fn run<T, F, Fut>(&self, provider: &str, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            let outcome = match tokio::time::timeout(self.call_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(Error::transient(
                    provider,
                    format!("{} timed out after {:?}", operation, self.call_timeout),
                )),
            };

            match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("{} succeeded after {} retries", operation, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "{} attempt {} failed: {}. Retrying in {:?}",
                        operation,
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
