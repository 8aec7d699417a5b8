//! Bounded retry policy for connection acquisition.
//!
//! # Responsibilities
//! - Bound the number of attempts (no hidden recursion)
//! - Compute the wait after each failed attempt
//!
//! # Design Decisions
//! - Zero retries still means one attempt
//! - Every failed attempt is followed by its backoff, including the last,
//!   so the total wait is `base * (1 + 2 + ... + n)`

use std::ops::RangeInclusive;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::resilience::backoff::linear_backoff;

/// How many times to try, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Acquisition policy for request handlers.
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(config.acquire_retries, config.acquire_base_delay())
    }

    /// Single attempt with no wait.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Attempt numbers, 1-based.
    pub fn attempts(&self) -> RangeInclusive<u32> {
        1..=self.max_retries.max(1)
    }

    /// Wait after failed attempt `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        linear_backoff(attempt, self.base_delay)
    }

    /// Cumulative wait when every attempt fails.
    pub fn total_delay(&self) -> Duration {
        self.attempts()
            .map(|a| self.delay_for(a))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}
