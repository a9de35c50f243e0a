//! Percentile and average helpers over an unsorted sample slice.
//!
//! Uses the same linear-interpolation-between-closest-ranks method as
//! `numpy.percentile`'s default, since the sliding-window percentiles this
//! crate reports are meant to match the upstream tool's numbers sample for
//! sample.

/// Average of `values`, or `None` if empty.
pub fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// `p`th percentile (0..=100) of `values` using linear interpolation between
/// the two closest ranks. Returns `None` for fewer than two samples — a
/// single sample has no meaningful percentile under this method, mirroring
/// the upstream convention of reporting `"n/a"` below that threshold.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("non-NaN sample"));
    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_sample_has_no_percentile() {
        assert_eq!(percentile(&[5.0], 95.0), None);
        assert_eq!(average(&[5.0]), Some(5.0));
    }

    #[test]
    fn empty_has_no_average_or_percentile() {
        assert_eq!(average(&[]), None);
        assert_eq!(percentile(&[], 95.0), None);
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 100.0), Some(5.0));
        assert_eq!(percentile(&values, 50.0), Some(3.0));
        // rank = 0.9*4 = 3.6 -> between index 3 (4.0) and 4 (5.0)
        let p90 = percentile(&values, 90.0).unwrap();
        assert!((p90 - 4.6).abs() < 1e-9);
    }

    #[test]
    fn percentile_is_order_independent() {
        let values = vec![5.0, 1.0, 3.0, 2.0, 4.0];
        assert_eq!(percentile(&values, 50.0), Some(3.0));
    }
}
