use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};

use crate::error::AppError;

/// Bounded retry with a linear backoff (`base_delay × attempt number`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: StdDuration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: StdDuration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: StdDuration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait after the zero-based `attempt` failed.
    pub fn delay_for(&self, attempt: usize) -> StdDuration {
        let multiplier = u32::try_from(attempt + 1).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(multiplier)
    }

    pub fn is_last_attempt(&self, attempt: usize) -> bool {
        attempt + 1 >= self.max_attempts
    }

    pub fn should_retry(&self, error: &AppError, attempt: usize) -> bool {
        error.is_retryable() && !self.is_last_attempt(attempt)
    }
}

/// Time to sleep until a rate-limit window resets, plus one second of slack.
pub fn rate_limit_wait(reset_epoch_secs: i64, now: DateTime<Utc>) -> StdDuration {
    let wait_ms = reset_epoch_secs
        .saturating_mul(1000)
        .saturating_sub(now.timestamp_millis())
        .saturating_add(1000);
    StdDuration::from_millis(u64::try_from(wait_ms).unwrap_or(0))
}
