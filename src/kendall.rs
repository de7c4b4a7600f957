//! Generalized Kendall Tau for Censored Data
//!
//! Implements the Isobe, Feigelson & Nelson (1986) concordance statistic,
//! which extends Kendall's tau to datasets where individual points are known
//! only as upper or lower limits. Each ordered pair is scored on each axis;
//! a pair counts only when its ordering cannot be contradicted by the
//! censoring, and ties never count. The variance of the pair-count statistic
//! follows from U-statistic theory and yields a normal z-score, from which
//! both the tau estimate and a two-sided p-value are derived.
//!
//! On uncensored input this reduces to the classical tau-b normal test.

use crate::{Correlation, MIN_OBSERVATIONS};
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

/// Censoring state of a single measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// The recorded value is a lower bound; the true value lies at or above it.
    Lower,
    /// An exact detection.
    Detection,
    /// The recorded value is an upper bound; the true value lies at or below it.
    Upper,
}

impl Limit {
    /// Map the conventional integer indicator: -1 lower limit, 0 detection,
    /// +1 upper limit. Returns `None` for any other value.
    pub fn from_indicator(indicator: i8) -> Option<Limit> {
        match indicator {
            -1 => Some(Limit::Lower),
            0 => Some(Limit::Detection),
            1 => Some(Limit::Upper),
            _ => None,
        }
    }

    /// Whether the point is an exact detection.
    pub fn is_detection(self) -> bool {
        self == Limit::Detection
    }
}

/// Errors from the generalized tau computation.
#[derive(Debug, Clone, Error)]
pub enum KendallError {
    /// x and y differ in length.
    #[error("x and y must be the same length: {x_len} vs {y_len}")]
    LengthMismatch {
        /// Length of x.
        x_len: usize,
        /// Length of y.
        y_len: usize,
    },

    /// A censoring indicator slice does not match the data length.
    #[error("censoring indicators must match the data length: got {got}, expected {expected}")]
    LimitLengthMismatch {
        /// Length of the offending indicator slice.
        got: usize,
        /// Expected length (the data length).
        expected: usize,
    },

    /// The variance denominator N(N-1)(N-2) vanishes below three points.
    #[error("generalized tau needs at least {min} observations, got {got}")]
    NotEnoughSamples {
        /// Number of observations supplied.
        got: usize,
        /// Minimum required.
        min: usize,
    },
}

/// Concordance score of one ordered pair along a single axis.
///
/// A nonzero score requires the ordering of the recorded values to hold for
/// the true values as well: the larger side must not be an upper limit and
/// the smaller side must not be a lower limit. Ties score zero regardless of
/// censoring. The score is antisymmetric under swapping the pair.
fn pair_score(vi: f64, li: Limit, vj: f64, lj: Limit) -> i64 {
    if vi == vj {
        0
    } else if vi > vj {
        if li != Limit::Upper && lj != Limit::Lower {
            -1
        } else {
            0
        }
    } else if li != Limit::Lower && lj != Limit::Upper {
        1
    } else {
        0
    }
}

/// Compute the generalized Kendall tau and its two-sided p-value.
///
/// `xlim` and `ylim` carry the per-point censoring state for each axis; pass
/// all [`Limit::Detection`] for uncensored data, in which case the result
/// matches the classical tau-b normal-approximation test.
///
/// A dataset whose pair counts carry no variance (for example all-tied data)
/// yields an undefined [`Correlation`] (NaN) rather than an error; only
/// structurally invalid input is rejected.
pub fn kendall_tau(
    x: &[f64],
    y: &[f64],
    xlim: &[Limit],
    ylim: &[Limit],
) -> Result<Correlation, KendallError> {
    if x.len() != y.len() {
        return Err(KendallError::LengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    for lim in [xlim, ylim] {
        if lim.len() != x.len() {
            return Err(KendallError::LimitLengthMismatch {
                got: lim.len(),
                expected: x.len(),
            });
        }
    }
    if x.len() < MIN_OBSERVATIONS {
        return Err(KendallError::NotEnoughSamples {
            got: x.len(),
            min: MIN_OBSERVATIONS,
        });
    }

    let n = x.len();

    // Accumulate S, the squared pair counts, and the per-row sums in one
    // pass; the full N x N matrices are never materialized.
    let mut s = 0i64;
    let mut sum_a2 = 0i64;
    let mut sum_b2 = 0i64;
    let mut row_sq_a = 0i64;
    let mut row_sq_b = 0i64;

    for i in 0..n {
        let mut row_a = 0i64;
        let mut row_b = 0i64;
        for j in 0..n {
            let a = pair_score(x[i], xlim[i], x[j], xlim[j]);
            let b = pair_score(y[i], ylim[i], y[j], ylim[j]);
            s += a * b;
            sum_a2 += a * a;
            sum_b2 += b * b;
            row_a += a;
            row_b += b;
        }
        row_sq_a += row_a * row_a;
        row_sq_b += row_b * row_b;
    }

    let nf = n as f64;
    let var = 4.0 / (nf * (nf - 1.0) * (nf - 2.0))
        * (row_sq_a - sum_a2) as f64
        * (row_sq_b - sum_b2) as f64
        + 2.0 / (nf * (nf - 1.0)) * sum_a2 as f64 * sum_b2 as f64;

    if var <= 0.0 {
        return Ok(Correlation::undefined());
    }

    let z = s as f64 / var.sqrt();
    let tau = z * (2.0 * (2.0 * nf + 5.0)).sqrt() / (3.0 * (nf * (nf - 1.0)).sqrt());

    Ok(Correlation {
        coefficient: tau,
        p_value: two_sided_normal_p(z),
    })
}

/// Two-sided p-value of a standard normal z-score.
fn two_sided_normal_p(z: f64) -> f64 {
    Normal::new(0.0, 1.0)
        .map(|n| 2.0 * n.sf(z.abs()))
        .unwrap_or(f64::NAN)
}
