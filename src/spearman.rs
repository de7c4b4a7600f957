//! Spearman Rank Correlation
//!
//! Thin adapter over an average-rank transform plus Pearson's product-moment
//! coefficient on the ranks. Significance uses the Student-t approximation
//! with n - 2 degrees of freedom (two-sided), delegated to `statrs`.

use crate::{Correlation, MIN_OBSERVATIONS};
use statrs::distribution::{ContinuousCDF, StudentsT};
use thiserror::Error;

/// Errors from the Spearman computation.
#[derive(Debug, Clone, Error)]
pub enum SpearmanError {
    /// x and y differ in length.
    #[error("x and y must be the same length: {x_len} vs {y_len}")]
    LengthMismatch {
        /// Length of x.
        x_len: usize,
        /// Length of y.
        y_len: usize,
    },

    /// Below three points the t-test has no degrees of freedom.
    #[error("spearman rho needs at least {min} observations, got {got}")]
    NotEnoughSamples {
        /// Number of observations supplied.
        got: usize,
        /// Minimum required.
        min: usize,
    },
}

/// Compute Spearman's rho and its two-sided p-value.
///
/// Ties receive average ranks. Input where either variable has a single
/// distinct value yields an undefined [`Correlation`] (NaN) rather than an
/// error.
pub fn spearman_rho(x: &[f64], y: &[f64]) -> Result<Correlation, SpearmanError> {
    if x.len() != y.len() {
        return Err(SpearmanError::LengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    if x.len() < MIN_OBSERVATIONS {
        return Err(SpearmanError::NotEnoughSamples {
            got: x.len(),
            min: MIN_OBSERVATIONS,
        });
    }

    let rx = average_ranks(x);
    let ry = average_ranks(y);

    let n = x.len() as f64;
    let mean_x = rx.iter().sum::<f64>() / n;
    let mean_y = ry.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in rx.iter().zip(&ry) {
        cov += (a - mean_x) * (b - mean_y);
        var_x += (a - mean_x).powi(2);
        var_y += (b - mean_y).powi(2);
    }

    if var_x == 0.0 || var_y == 0.0 {
        return Ok(Correlation::undefined());
    }

    let rho = (cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0);

    Ok(Correlation {
        coefficient: rho,
        p_value: two_sided_t_p(rho, x.len()),
    })
}

/// Two-sided p-value of rho under the t approximation with n - 2 degrees of
/// freedom. |rho| = 1 maps to an infinite statistic and a p-value of zero.
fn two_sided_t_p(rho: f64, n: usize) -> f64 {
    let df = (n - 2) as f64;
    let t = rho * (df / (1.0 - rho * rho)).sqrt();
    if t.is_infinite() {
        return 0.0;
    }
    StudentsT::new(0.0, 1.0, df)
        .map(|d| 2.0 * d.sf(t.abs()))
        .unwrap_or(f64::NAN)
}

/// Average (fractional) ranks, 1-based; tied values share the mean of the
/// ranks they occupy.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| values[i].partial_cmp(&values[j]).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1 ..= end
        let avg = (start + end + 1) as f64 / 2.0;
        for k in start..end {
            ranks[order[k]] = avg;
        }
        start = end;
    }
    ranks
}
