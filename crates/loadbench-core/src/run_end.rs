//! Composite run-end condition evaluated by the `Executor`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunEndMode {
    And,
    Or,
}

#[derive(Debug, Clone, Copy)]
pub struct RunEndCondition {
    pub mode: RunEndMode,
    pub max_requests: Option<u64>,
    pub max_duration_secs: Option<f64>,
}

impl RunEndCondition {
    pub fn new(
        mode: RunEndMode,
        max_requests: Option<u64>,
        max_duration_secs: Option<f64>,
    ) -> Self {
        Self {
            mode,
            max_requests,
            max_duration_secs,
        }
    }

    /// Evaluate whether the run should stop, given the number of requests
    /// completed so far and the elapsed wall-clock time.
    pub fn is_satisfied(&self, completed: u64, elapsed_secs: f64) -> bool {
        let requests_reached = self.max_requests.map(|n| completed >= n);
        let duration_reached = self.max_duration_secs.map(|d| elapsed_secs >= d);

        match self.mode {
            // Each clause is ignored if unset; if both are unset the run
            // never stops on its own (the executor then relies on external
            // cancellation).
            RunEndMode::Or => requests_reached.unwrap_or(false) || duration_reached.unwrap_or(false),
            // Unset bounds count as "not yet reached": AND with only one
            // bound set degrades to OR, per spec.
            RunEndMode::And => match (requests_reached, duration_reached) {
                (Some(r), Some(d)) => r && d,
                (Some(r), None) => r,
                (None, Some(d)) => d,
                (None, None) => false,
            },
        }
    }
}
