//! Rate limiting for outbound requests
//!
//! One limiter per crawler gates every network operation, page fetches and
//! PDF downloads alike, across consecutive runs. The origin server sees at
//! most one request start per interval.

use std::time::Duration;
use tokio::time::Instant;

/// Tracks when the last network operation started
#[derive(Debug, Default)]
pub struct RateLimiter {
    last_start: Option<Instant>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time left before an operation may start under `interval`
    ///
    /// Zero when no operation has started yet.
    pub fn remaining(&self, interval: Duration, now: Instant) -> Duration {
        match self.last_start {
            Some(last) => (last + interval).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Records that an operation starts at `now`
    pub fn mark(&mut self, now: Instant) {
        self.last_start = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_operation_is_immediate() {
        let limiter = RateLimiter::new();
        assert_eq!(
            limiter.remaining(Duration::from_secs(1), Instant::now()),
            Duration::ZERO
        );
    }

    #[test]
    fn test_remaining_counts_down_from_last_start() {
        let mut limiter = RateLimiter::new();
        let start = Instant::now();
        limiter.mark(start);

        let interval = Duration::from_millis(1000);
        assert_eq!(limiter.remaining(interval, start), interval);
        assert_eq!(
            limiter.remaining(interval, start + Duration::from_millis(400)),
            Duration::from_millis(600)
        );
        assert_eq!(
            limiter.remaining(interval, start + Duration::from_millis(1500)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_remaining_uses_interval_at_call_time() {
        let mut limiter = RateLimiter::new();
        let start = Instant::now();
        limiter.mark(start);

        let later = start + Duration::from_millis(500);
        assert_eq!(limiter.remaining(Duration::from_millis(200), later), Duration::ZERO);
        assert_eq!(
            limiter.remaining(Duration::from_secs(2), later),
            Duration::from_millis(1500)
        );
    }
}
