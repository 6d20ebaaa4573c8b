// Client-side request throttle
// Author: kelexine (https://github.com/kelexine)

use crate::config::RateLimitConfig;
use crate::error::{CaptionError, RateLimitRule, Result};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Throttle guarding paid API calls.
///
/// Two rules apply: a minimum spacing between consecutive requests, and a cap
/// on requests per window. The window counter is reset lazily, when a request
/// arrives at least one full window after the previous recorded request; no
/// background timer is involved.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_spacing: Duration,
    window: Duration,
    max_requests: u32,
    last_request: Option<Instant>,
    request_count: u32,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(&RateLimitConfig::default())
    }
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            min_spacing: config.min_spacing(),
            window: config.window(),
            max_requests: config.max_requests_per_window,
            last_request: None,
            request_count: 0,
        }
    }

    /// Check both rules against the current time and record the request on success.
    pub fn check_and_record(&mut self) -> Result<()> {
        self.check_and_record_at(Instant::now())
    }

    /// Same as [`check_and_record`](Self::check_and_record) with an explicit clock reading.
    ///
    /// A rejected request is not recorded.
    pub fn check_and_record_at(&mut self, now: Instant) -> Result<()> {
        if let Some(last) = self.last_request {
            let since_last = now.saturating_duration_since(last);

            if since_last < self.min_spacing {
                return Err(self.reject(RateLimitRule::MinimumSpacing, self.min_spacing - since_last));
            }

            if self.request_count >= self.max_requests && since_last < self.window {
                return Err(self.reject(RateLimitRule::WindowQuota, self.window - since_last));
            }

            if since_last >= self.window {
                self.request_count = 0;
            }
        }

        self.last_request = Some(now);
        self.request_count += 1;
        debug!(
            "Request recorded ({}/{} in window)",
            self.request_count, self.max_requests
        );
        Ok(())
    }

    fn reject(&self, rule: RateLimitRule, retry_after: Duration) -> CaptionError {
        debug!(
            "Local rate limit hit: {} (retry in {}ms)",
            rule.as_str(),
            retry_after.as_millis()
        );
        crate::metrics::record_rate_limit_rejection(rule.as_str());
        CaptionError::RateLimitExceeded { rule, retry_after }
    }

    /// Requests counted in the current window, as of the last recorded request.
    pub fn requests_in_window(&self) -> u32 {
        self.request_count
    }

    pub fn last_request(&self) -> Option<Instant> {
        self.last_request
    }
}
