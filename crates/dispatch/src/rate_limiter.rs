//! Per-key sliding-window admission counter.

use crate::clock::Clock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Sliding-window rate limiter keyed by provider.
///
/// Each key tracks the instants of its admitted calls; a call is admitted
/// while fewer than `limit` admissions sit inside the trailing `window`.
/// Keys are independent and a never-seen key always admits. State is
/// caller-owned; callers needing shared access wrap the limiter in their
/// own lock.
pub struct RateLimiter {
    /// Maximum admissions per window.
    limit: usize,
    /// Window length.
    window: Duration,
    /// Injected time source.
    clock: Arc<dyn Clock>,
    /// Admission instants per key, oldest first.
    admitted: HashMap<String, VecDeque<Duration>>,
}

impl RateLimiter {
    /// Creates a rate limiter.
    ///
    /// # Panics
    ///
    /// A zero `limit` or zero `window` is construction-time
    /// misconfiguration and aborts at startup.
    pub fn new(limit: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        assert!(limit > 0, "rate limiter limit must be positive");
        assert!(!window.is_zero(), "rate limiter window must be positive");
        Self {
            limit,
            window,
            clock,
            admitted: HashMap::new(),
        }
    }

    /// Admits or refuses a call for `key`. Total: never fails, never blocks.
    pub fn can_proceed(&mut self, key: &str) -> bool {
        let now = self.clock.now();
        let entries = self.admitted.entry(key.to_string()).or_default();
        Self::evict_expired(entries, now, self.window);

        if entries.len() < self.limit {
            entries.push_back(now);
            true
        } else {
            trace!(key, in_window = entries.len(), "rate limit saturated");
            false
        }
    }

    /// Time until the oldest admission leaves the window. Zero unless the
    /// key is saturated; callers use it for backoff, not blocking.
    pub fn get_wait_time(&mut self, key: &str) -> Duration {
        let now = self.clock.now();
        let Some(entries) = self.admitted.get_mut(key) else {
            return Duration::ZERO;
        };
        Self::evict_expired(entries, now, self.window);

        if entries.len() < self.limit {
            return Duration::ZERO;
        }
        match entries.front() {
            Some(oldest) => (*oldest + self.window).saturating_sub(now),
            None => Duration::ZERO,
        }
    }

    fn evict_expired(entries: &mut VecDeque<Duration>, now: Duration, window: Duration) {
        while entries.front().is_some_and(|front| *front + window <= now) {
            entries.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter(limit: usize, window_secs: u64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::new(limit, Duration::from_secs(window_secs), clock.clone());
        (limiter, clock)
    }

    #[test]
    fn test_limit_admits_then_refuses() {
        let (mut limiter, _clock) = limiter(5, 1);

        for _ in 0..5 {
            assert!(limiter.can_proceed("key"));
        }
        assert!(!limiter.can_proceed("key"));
    }

    #[test]
    fn test_window_elapse_readmits() {
        let (mut limiter, clock) = limiter(5, 1);

        for _ in 0..5 {
            assert!(limiter.can_proceed("key"));
        }
        assert!(!limiter.can_proceed("key"));

        clock.advance(Duration::from_secs(1));
        assert!(limiter.can_proceed("key"));
    }

    #[test]
    fn test_keys_are_independent() {
        let (mut limiter, _clock) = limiter(1, 1);

        assert!(limiter.can_proceed("a"));
        assert!(!limiter.can_proceed("a"));
        // A fresh key is unaffected by another key's saturation.
        assert!(limiter.can_proceed("b"));
    }

    #[test]
    fn test_wait_time_until_oldest_expires() {
        let (mut limiter, clock) = limiter(2, 10);

        assert_eq!(limiter.get_wait_time("key"), Duration::ZERO);

        assert!(limiter.can_proceed("key"));
        clock.advance(Duration::from_secs(3));
        assert!(limiter.can_proceed("key"));

        // Saturated; the oldest admission (t=0) expires at t=10, now t=3.
        assert_eq!(limiter.get_wait_time("key"), Duration::from_secs(7));

        clock.advance(Duration::from_secs(7));
        assert_eq!(limiter.get_wait_time("key"), Duration::ZERO);
        assert!(limiter.can_proceed("key"));
    }

    #[test]
    #[should_panic(expected = "limit must be positive")]
    fn test_zero_limit_aborts() {
        let clock = Arc::new(ManualClock::new());
        let _ = RateLimiter::new(0, Duration::from_secs(1), clock);
    }
}
