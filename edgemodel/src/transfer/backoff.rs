//! Retry backoff for failed transfer attempts.

use std::time::Duration;

/// Default number of retries after the initial attempt.
pub const DEFAULT_RETRIES: u32 = 3;

/// Default base delay between attempts (1 second).
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Linear backoff: the wait after failed attempt `n` is `base_delay * n`.
///
/// With `retries = 3` a transfer makes at most four attempts and waits
/// `1×`, `2×` and `3×` the base delay between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    /// Retries allowed after the initial attempt.
    pub retries: u32,
    /// Base delay unit, scaled by the attempt number.
    pub base_delay: Duration,
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_RETRIES, Duration::from_millis(DEFAULT_RETRY_DELAY_MS))
    }
}

impl LinearBackoff {
    /// Create a linear backoff policy.
    pub fn new(retries: u32, base_delay: Duration) -> Self {
        Self {
            retries,
            base_delay,
        }
    }

    /// Returns the maximum number of attempts (including the initial attempt).
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Calculates the delay to wait after the given failed attempt.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt that just failed (1-based)
    ///
    /// # Returns
    ///
    /// The delay before the next attempt, or `None` if no attempts remain.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt < self.max_attempts() {
            Some(self.base_delay.saturating_mul(attempt))
        } else {
            None
        }
    }

    /// Total time spent waiting if every attempt fails.
    pub fn total_wait(&self) -> Duration {
        (1..self.max_attempts())
            .filter_map(|attempt| self.delay_for_attempt(attempt))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff() {
        let backoff = LinearBackoff::default();
        assert_eq!(backoff.retries, 3);
        assert_eq!(backoff.max_attempts(), 4);
        assert_eq!(backoff.base_delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_delay_scales_linearly() {
        let backoff = LinearBackoff::new(3, Duration::from_millis(100));

        assert_eq!(backoff.delay_for_attempt(1), Some(Duration::from_millis(100)));
        assert_eq!(backoff.delay_for_attempt(2), Some(Duration::from_millis(200)));
        assert_eq!(backoff.delay_for_attempt(3), Some(Duration::from_millis(300)));
        assert_eq!(backoff.delay_for_attempt(4), None); // No more retries
    }

    #[test]
    fn test_zero_retries() {
        let backoff = LinearBackoff::new(0, Duration::from_millis(100));
        assert_eq!(backoff.max_attempts(), 1);
        assert_eq!(backoff.delay_for_attempt(1), None);
        assert_eq!(backoff.total_wait(), Duration::ZERO);
    }

    #[test]
    fn test_total_wait() {
        let backoff = LinearBackoff::new(3, Duration::from_millis(10));
        assert_eq!(backoff.total_wait(), Duration::from_millis(60));
    }
}
