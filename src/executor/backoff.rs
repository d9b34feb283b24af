//! Capped exponential backoff between fallback attempts (spec §4.6).
//!
//! Grounded on the teacher's retry-policy shape (`RetryPolicy::exponential`
//! in the cost-ops DLQ): start small, double, cap, optional jitter.

use std::time::Duration;

const BASE_DELAY: Duration = Duration::from_millis(100);
const MAX_DELAY: Duration = Duration::from_millis(1_000);

/// Delay before attempt `attempt_index` (0-based: the first retry is
/// `attempt_index == 1`, i.e. after one failed attempt).
pub fn delay_for_attempt(attempt_index: u32) -> Duration {
    if attempt_index == 0 {
        return Duration::ZERO;
    }
    let exp = BASE_DELAY.as_millis().saturating_mul(1u128 << attempt_index.min(10));
    Duration::from_millis(exp.min(MAX_DELAY.as_millis()) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_has_no_delay() {
        assert_eq!(delay_for_attempt(0), Duration::ZERO);
    }

    #[test]
    fn delay_grows_then_caps() {
        assert_eq!(delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(delay_for_attempt(2), Duration::from_millis(400));
        assert!(delay_for_attempt(10) <= MAX_DELAY);
    }
}
