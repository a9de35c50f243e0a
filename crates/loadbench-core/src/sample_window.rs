//! `SampleWindow`: an append-only, timestamp-ordered buffer with trim-by-age.

use crate::stats::Timestamp;

/// Timestamped value buffer. Values are expected to be appended in
/// non-decreasing timestamp order (the aggregator always appends at
/// `request_start_time`, so this holds in practice); `trim` relies on it to
/// drop only a leading prefix rather than scanning the whole buffer.
#[derive(Debug, Default, Clone)]
pub struct SampleWindow {
    samples: Vec<(Timestamp, f64)>,
}

impl SampleWindow {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    pub fn append(&mut self, timestamp: Timestamp, value: f64) {
        self.samples.push((timestamp, value));
    }

    /// Drop the longest leading prefix whose timestamp is older than `now -
    /// window`, where `now` is the current wall-clock time.
    pub fn trim(&mut self, window: f64) {
        let now = crate::stats::now();
        let mut drop_until = 0;
        while drop_until < self.samples.len() && now - self.samples[drop_until].0 > window {
            drop_until += 1;
        }
        if drop_until > 0 {
            self.samples.drain(..drop_until);
        }
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|(_, v)| *v).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.samples.iter().map(|(_, v)| v).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_empty_window_is_noop() {
        let mut w = SampleWindow::new();
        w.trim(60.0);
        assert_eq!(w.len(), 0);
    }

    #[test]
    fn append_then_trim_within_window_keeps_sample() {
        let mut w = SampleWindow::new();
        w.append(crate::stats::now(), 1.0);
        w.trim(60.0);
        assert_eq!(w.len(), 1);
        assert_eq!(w.values(), vec![1.0]);
    }

    #[test]
    fn trim_drops_stale_leading_samples() {
        let mut w = SampleWindow::new();
        let now = crate::stats::now();
        w.append(now - 120.0, 1.0);
        w.append(now - 1.0, 2.0);
        w.trim(60.0);
        assert_eq!(w.values(), vec![2.0]);
    }

    #[test]
    fn sum_and_len_match_appended_samples() {
        let mut w = SampleWindow::new();
        let now = crate::stats::now();
        w.append(now, 3.0);
        w.append(now, 4.0);
        assert_eq!(w.len(), 2);
        assert_eq!(w.sum(), 7.0);
        assert!(!w.is_empty());
    }
}
