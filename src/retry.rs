//! Bounded exponential-backoff retry for external calls.
//!
//! Every network suspension point (embedding, index query, LLM completion)
//! runs through an explicit [`RetryPolicy`] owned by the caller, rather than
//! hiding retries inside the call itself. The default schedule starts at 4
//! seconds and caps at 10, with three attempts total.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::types::RagError;

/// Capped exponential-backoff schedule with a bounded attempt count.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(4), Duration::from_secs(10))
    }
}

impl RetryPolicy {
    /// Creates a policy with `max_attempts` total tries (minimum 1) and an
    /// exponential backoff doubling from `base_delay` up to `max_delay`.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// A policy that tries exactly once. Useful in tests and for callers that
    /// implement their own degradation.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay to wait after the given 1-based failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Runs `call` until it succeeds or the attempt budget is spent; the last
    /// error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, RagError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RagError>>,
    {
        let mut attempt = 1u32;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts => {
                    let wait = self.backoff(attempt);
                    warn!(operation, attempt, ?wait, error = %err, "call failed, retrying");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
