//! Reconnect backoff

use std::time::Duration;

/// Exponential backoff: `initial × 2^attempt`, capped at `max`
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    /// 0 means unlimited
    max_attempts: u32,
    attempt: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, max_attempts: u32) -> Self {
        Self {
            initial,
            max: max.max(initial),
            max_attempts,
            attempt: 0,
        }
    }

    /// Delay before the next attempt, or `None` once the limit is reached
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.max_attempts > 0 && self.attempt >= self.max_attempts {
            return None;
        }

        let factor = 2u32.checked_pow(self.attempt).unwrap_or(u32::MAX);
        let delay = self.initial.saturating_mul(factor).min(self.max);
        self.attempt += 1;

        Some(delay)
    }

    /// Start over after a successful connection
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Attempts made since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_and_caps() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(10), 0);

        let delays: Vec<u64> = (0..6)
            .map(|_| backoff.next_delay().unwrap().as_secs())
            .collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 10, 10]);
    }

    #[test]
    fn test_attempt_limit() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(1), 2);

        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_none());
        assert_eq!(backoff.attempts(), 2);
    }

    #[test]
    fn test_reset() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(1), 0);
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();

        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_large_attempt_count_saturates() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(30), 0);
        for _ in 0..64 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(30)));
    }
}
