//! Exponential-backoff state machine for the outer retry wrapper around
//! `StreamingClient::call`.
//!
//! The upstream Python implementation uses a `backoff.on_exception` decorator
//! (`backoff.expo`, full jitter, `max_time=MAX_RETRY_SECONDS`). That decorator
//! collapses here into plain state: an attempt counter, a start instant, and
//! a `next_delay` computation, per §9's "abstract boundaries" note.

use rand::Rng;
use std::time::{Duration, Instant};

/// Total wall-clock budget for a single `call()`, across all attempts and
/// retry sleeps, mirroring the upstream `MAX_RETRY_SECONDS`.
pub const MAX_RETRY_SECONDS: f64 = 60.0;

/// Base delay for the first retry.
const BASE_DELAY_SECS: f64 = 1.0;

/// Upper bound on any single computed delay, before jitter.
const CAP_SECS: f64 = 20.0;

pub struct ExponentialBackoff {
    start: Instant,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            attempt: 0,
        }
    }

    /// Seconds elapsed since the first attempt.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Whether the total retry budget has been exhausted.
    pub fn budget_exhausted(&self) -> bool {
        self.elapsed_secs() >= MAX_RETRY_SECONDS
    }

    /// Compute the next delay (full jitter: uniform between zero and the
    /// capped exponential value) and advance the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let exp = (BASE_DELAY_SECS * 2f64.powi(self.attempt as i32)).min(CAP_SECS);
        self.attempt += 1;
        let jittered = rand::rng().random_range(0.0..=exp);
        Duration::from_secs_f64(jittered)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_delay_grows_then_caps() {
        let mut backoff = ExponentialBackoff::new();
        for _ in 0..3 {
            let d = backoff.next_delay();
            assert!(d.as_secs_f64() <= CAP_SECS);
        }
        // After enough attempts the uncapped exponential would dwarf CAP_SECS;
        // the jittered delay must still never exceed it.
        for _ in 0..20 {
            assert!(backoff.next_delay().as_secs_f64() <= CAP_SECS);
        }
    }

    #[test]
    fn budget_not_exhausted_immediately() {
        let backoff = ExponentialBackoff::new();
        assert!(!backoff.budget_exhausted());
    }
}
