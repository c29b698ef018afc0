//! Circuit breaker for the HTTP price source.
//!
//! When the provider answers 403 (IP ban) or fails repeatedly (429, 5xx,
//! timeouts), the breaker opens and every later request in the batch fails fast
//! with `CircuitBreakerTripped` until the cooldown expires. A batch over a large
//! universe then degrades to per-symbol failures instead of hammering the API.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// State of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Requests are allowed.
    Closed,
    /// Requests are refused until the cooldown expires.
    Open { tripped_at: Instant },
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
}

/// Circuit breaker shared by every worker fetching from one provider.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    cooldown: Duration,
    failure_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration, failure_threshold: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
            }),
            cooldown,
            failure_threshold: failure_threshold.max(1),
        }
    }

    /// 30-minute cooldown, trips after 3 consecutive failures.
    pub fn default_provider() -> Self {
        Self::new(Duration::from_secs(30 * 60), 3)
    }

    // A worker that panicked while holding the lock leaves plain counters behind;
    // they are still meaningful, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Check if requests are currently allowed. Closes an expired breaker.
    pub fn is_allowed(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open { tripped_at } => {
                if tripped_at.elapsed() >= self.cooldown {
                    inner.state = BreakerState::Closed;
                    inner.consecutive_failures = 0;
                    tracing::info!("circuit breaker: cooldown expired, closing");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    /// Record a successful request; resets the failure counter.
    pub fn record_success(&self) {
        self.lock().consecutive_failures = 0;
    }

    /// Record a failure. Trips the breaker once the threshold is reached.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.failure_threshold
            && inner.state == BreakerState::Closed
        {
            inner.state = BreakerState::Open {
                tripped_at: Instant::now(),
            };
            tracing::warn!(
                failures = inner.consecutive_failures,
                "circuit breaker: tripped after {} consecutive failures",
                inner.consecutive_failures
            );
        }
    }

    /// Immediately trip the breaker (403 Forbidden / IP ban).
    pub fn trip(&self) {
        self.lock().state = BreakerState::Open {
            tripped_at: Instant::now(),
        };
        tracing::warn!("circuit breaker: tripped immediately");
    }

    /// Remaining cooldown time (zero if not tripped).
    pub fn remaining_cooldown(&self) -> Duration {
        match self.lock().state {
            BreakerState::Closed => Duration::ZERO,
            BreakerState::Open { tripped_at } => {
                self.cooldown.saturating_sub(tripped_at.elapsed())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_closed() {
        let cb = CircuitBreaker::new(Duration::from_secs(60), 3);
        assert!(cb.is_allowed());
        assert_eq!(cb.state(), BreakerState::Closed);
        assert_eq!(cb.remaining_cooldown(), Duration::ZERO);
    }

    #[test]
    fn trips_after_threshold_failures() {
        let cb = CircuitBreaker::new(Duration::from_secs(60), 3);
        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_allowed()); // 2 < 3
        cb.record_failure();
        assert!(!cb.is_allowed()); // 3 >= 3 → tripped
        assert!(cb.remaining_cooldown() > Duration::ZERO);
    }

    #[test]
    fn immediate_trip() {
        let cb = CircuitBreaker::default_provider();
        cb.trip();
        assert!(!cb.is_allowed());
    }

    #[test]
    fn success_resets_counter() {
        let cb = CircuitBreaker::new(Duration::from_secs(60), 3);
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure(); // 1 failure after reset
        assert!(cb.is_allowed());
    }

    #[test]
    fn expires_after_cooldown() {
        let cb = CircuitBreaker::new(Duration::from_millis(10), 3);
        cb.trip();
        assert!(!cb.is_allowed());
        std::thread::sleep(Duration::from_millis(15));
        assert!(cb.is_allowed());
        assert_eq!(cb.state(), BreakerState::Closed);
    }
}
