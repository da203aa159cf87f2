//! Retry with exponential backoff for backend calls.
//!
//! Connection and timeout failures are retried; response failures are not.
//! Delay before attempt n+1 is `base_delay * 2^n`.

use stage_shared::BackendError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// Cap on the backoff exponent so huge attempt counts cannot overflow
const MAX_BACKOFF_SHIFT: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Backoff after the 0-based `attempt` failed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.min(MAX_BACKOFF_SHIFT))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Run `op` until it succeeds, fails permanently, or attempts run out
pub async fn retry_transient<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, BackendError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    let attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        debug!("Backend attempt {}/{}", attempt + 1, attempts);
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => {
                error!("Backend {} failure, not retrying: {}", e.kind(), e);
                return Err(e);
            }
            Err(e) => {
                warn!(
                    "Backend request failed (attempt {}/{}): {}",
                    attempt + 1,
                    attempts,
                    e
                );
                if attempt + 1 >= attempts {
                    error!("All {} backend attempts failed", attempts);
                    return Err(e);
                }
                let delay = policy.delay_for(attempt);
                debug!("Retrying in {:?}", delay);
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
