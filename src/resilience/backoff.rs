//! Linear backoff between connection attempts.

use std::time::Duration;

/// Delay to wait after failed attempt number `attempt` (1-based).
///
/// Grows linearly: `base * attempt`. Attempt 0 never waits.
pub fn linear_backoff(attempt: u32, base: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    base.saturating_mul(attempt)
}
