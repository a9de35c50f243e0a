//! Token-bucket pacing for requests-per-minute budgets.
//!
//! Both variants share one contract: `backoff()` returns how long the caller
//! should wait before admitting the next request, rather than blocking
//! internally. This lets the executor compose the wait with cancellation
//! instead of spin-sleeping inside the limiter.

use std::sync::Mutex;
use std::time::Instant;

/// Returns the delay the caller must wait before the next request is
/// admitted. A zero duration means "proceed immediately".
pub trait RateLimiter: Send + Sync {
    fn backoff(&self) -> std::time::Duration;
}

/// No pacing: every request is admitted immediately.
#[derive(Debug, Default)]
pub struct NoRateLimiter;

impl RateLimiter for NoRateLimiter {
    fn backoff(&self) -> std::time::Duration {
        std::time::Duration::ZERO
    }
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket limiter enforcing a requests-per-minute budget.
///
/// `capacity` and `refill_rate` are derived once from `rpm`; all mutable
/// state lives behind a single mutex so `backoff()` is safe to call from any
/// number of concurrent workers.
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// `rpm` is the requests-per-minute budget; `period` is the bucket
    /// refill period (60s for a true RPM budget, but kept configurable for
    /// tests that want faster convergence).
    pub fn new(rpm: f64, period_secs: f64) -> Self {
        let refill_rate = rpm / period_secs;
        Self {
            capacity: rpm,
            refill_rate,
            state: Mutex::new(BucketState {
                tokens: rpm,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn with_rpm(rpm: f64) -> Self {
        Self::new(rpm, 60.0)
    }
}

impl RateLimiter for TokenBucket {
    fn backoff(&self) -> std::time::Duration {
        let mut state = self.state.lock().expect("rate limiter mutex poisoned");

        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.last_refill = now;
        state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            std::time::Duration::ZERO
        } else {
            let shortfall = 1.0 - state.tokens;
            std::time::Duration::from_secs_f64(shortfall / self.refill_rate)
        }
    }
}
