// Retry logic for provider throttling
// Author: kelexine (https://github.com/kelexine)

use crate::config::RetryConfig;
use crate::error::{CaptionError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Determine if an HTTP status code signals provider throttling
pub fn is_throttle_status(status: u16) -> bool {
    status == 429
}

/// Deterministic exponential backoff around a remote call.
///
/// Only [`CaptionError::RemoteThrottled`] is retried. Every throttled attempt,
/// including the last one, is followed by a backoff sleep, so a call that is
/// throttled on all `max_attempts` attempts waits `base, 2*base, 4*base, ...`
/// (each capped at `max_delay`) before failing with
/// [`CaptionError::RetriesExhausted`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff after the `attempt`-th throttled attempt (1-indexed):
    /// `min(base * 2^(attempt-1), max_delay)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Execute `operation`, retrying while the provider reports throttling.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", operation_name, attempt);
                    }
                    return Ok(result);
                }
                Err(CaptionError::RemoteThrottled(message)) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} rate limited (attempt {}/{}), waiting {}ms",
                        operation_name,
                        attempt,
                        self.max_attempts,
                        delay.as_millis()
                    );
                    crate::metrics::record_retry(operation_name);

                    tokio::time::sleep(delay).await;

                    if attempt >= self.max_attempts {
                        return Err(CaptionError::RetriesExhausted {
                            attempts: attempt,
                            last_error: message,
                        });
                    }
                }
                // Non-throttle errors are substantive; surface them immediately
                Err(e) => return Err(e),
            }
        }
    }
}
