//! Circuit breaker for venue rate limiting and IP bans.
//!
//! Binance answers HTTP 418 (IP ban) or 403 (WAF block) once a client has
//! ignored rate limits, and 429 before that. A ban trips the breaker
//! immediately; repeated 429s trip it after a threshold. While open, every
//! request is refused locally until the cooldown expires.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Requests are allowed.
    Closed,
    /// All requests are refused until cooldown expires.
    Open { tripped_at: Instant },
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    cooldown: Duration,
    failure_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
            }),
            cooldown,
            failure_threshold: 3,
        }
    }

    /// 5-minute cooldown, trips after 3 consecutive failures.
    pub fn default_venue() -> Self {
        Self::new(Duration::from_secs(5 * 60))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves the counters usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_allowed(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open { tripped_at } => {
                if tripped_at.elapsed() >= self.cooldown {
                    inner.state = BreakerState::Closed;
                    inner.consecutive_failures = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        self.lock().consecutive_failures = 0;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.failure_threshold {
            warn!(
                failures = inner.consecutive_failures,
                "venue circuit breaker tripped after repeated failures"
            );
            inner.state = BreakerState::Open {
                tripped_at: Instant::now(),
            };
        }
    }

    /// Trip immediately (IP ban).
    pub fn trip(&self) {
        warn!("venue circuit breaker tripped by ban response");
        self.lock().state = BreakerState::Open {
            tripped_at: Instant::now(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_closed() {
        let cb = CircuitBreaker::new(Duration::from_secs(60));
        assert!(cb.is_allowed());
    }

    #[test]
    fn trips_after_threshold_failures() {
        let cb = CircuitBreaker::new(Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_allowed());
        cb.record_failure();
        assert!(!cb.is_allowed());
    }

    #[test]
    fn ban_trips_immediately() {
        let cb = CircuitBreaker::new(Duration::from_secs(60));
        cb.trip();
        assert!(!cb.is_allowed());
    }

    #[test]
    fn success_resets_counter() {
        let cb = CircuitBreaker::new(Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        assert!(cb.is_allowed());
    }

    #[test]
    fn closes_again_after_cooldown() {
        let cb = CircuitBreaker::new(Duration::from_millis(10));
        cb.trip();
        assert!(!cb.is_allowed());
        std::thread::sleep(Duration::from_millis(15));
        assert!(cb.is_allowed());
    }
}
