#![warn(missing_docs)]
//! Monte Carlo Rank Correlation
//!
//! Estimates rank-correlation coefficients with confidence bands for paired
//! measurements that carry Gaussian uncertainties and/or censoring:
//! - Spearman's rho (tie-aware, average ranks)
//! - Generalized Kendall's tau for censored data (Isobe, Feigelson & Nelson 1986)
//! - Bootstrap resampling and Gaussian perturbation, alone or combined
//! - NaN-aware percentile reduction of the trial distribution
//!
//! The Monte Carlo entry points are [`mc_spearman`] and [`mc_kendall`]; the
//! single-dataset estimators [`spearman_rho`] and [`kendall_tau`] are exposed
//! directly as well.

mod kendall;
mod montecarlo;
mod percentiles;
mod perturb;
mod spearman;

pub use kendall::{kendall_tau, KendallError, Limit};
pub use montecarlo::{
    mc_kendall, mc_spearman, MonteCarloConfig, MonteCarloError, MonteCarloOutcome,
    MonteCarloSummary, TrialDistribution,
};
pub use percentiles::{nan_percentile, nan_percentiles};
pub use perturb::{perturb_draws, perturb_once, PerturbError};
pub use spearman::{spearman_rho, SpearmanError};

/// Percentiles reported by default: the median and the approximate +-1 sigma
/// band under normality.
pub const DEFAULT_PERCENTILES: [f64; 3] = [16.0, 50.0, 84.0];

/// Minimum number of paired observations for which either coefficient (and
/// the generalized tau variance in particular) is defined.
pub const MIN_OBSERVATIONS: usize = 3;

/// A correlation coefficient together with its two-sided p-value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    /// The coefficient (rho or tau). NaN when the statistic is undefined.
    pub coefficient: f64,
    /// Two-sided significance of the coefficient differing from zero.
    pub p_value: f64,
}

impl Correlation {
    /// Marker for a trial whose statistic could not be computed (for example
    /// a resample that collapsed to a single distinct value).
    pub(crate) fn undefined() -> Self {
        Correlation {
            coefficient: f64::NAN,
            p_value: f64::NAN,
        }
    }

    /// Whether the coefficient is a usable (non-NaN) number.
    pub fn is_defined(&self) -> bool {
        !self.coefficient.is_nan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_PERCENTILES, [16.0, 50.0, 84.0]);
        assert_eq!(MIN_OBSERVATIONS, 3);
    }

    #[test]
    fn test_undefined_correlation() {
        let c = Correlation::undefined();
        assert!(!c.is_defined());
        assert!(c.coefficient.is_nan());
        assert!(c.p_value.is_nan());
    }
}
