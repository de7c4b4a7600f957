//! NaN-Aware Percentile Reduction
//!
//! Reduces a Monte Carlo trial distribution to percentile values using linear
//! interpolation between nearest ranks. NaN entries (undefined trials) are
//! dropped before ranking, so a handful of degenerate resamples cannot poison
//! the summary.

/// Compute a single percentile from samples, ignoring NaN entries.
///
/// `percentile` is on the [0, 100] scale. Returns NaN when no finite samples
/// remain.
pub fn nan_percentile(samples: &[f64], percentile: f64) -> f64 {
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    percentile_of_sorted(&sorted, percentile)
}

/// Compute several percentiles over the same samples, ignoring NaN entries.
///
/// Sorts once; the output is ordered like `percentiles`, so a non-decreasing
/// request yields a non-decreasing result.
pub fn nan_percentiles(samples: &[f64], percentiles: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    percentiles
        .iter()
        .map(|&p| percentile_of_sorted(&sorted, p))
        .collect()
}

/// Linear interpolation between nearest ranks on pre-sorted data.
fn percentile_of_sorted(sorted: &[f64], percentile: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let n = sorted.len();
    let rank = (percentile / 100.0) * (n - 1) as f64;
    let lower_idx = (rank.floor() as usize).min(n - 1);
    let upper_idx = (lower_idx + 1).min(n - 1);
    let fraction = rank - lower_idx as f64;

    sorted[lower_idx] + fraction * (sorted[upper_idx] - sorted[lower_idx])
}
