//! Monte Carlo Orchestration
//!
//! Drives N independent trials through one of the correlation estimators and
//! reduces the resulting (coefficient, p-value) distribution to requested
//! percentiles. Three randomization modes are selected by which trial counts
//! are configured:
//!
//! - bootstrap only: resample observation indices with replacement
//! - perturbation only: redraw values from their Gaussian uncertainties
//! - both: one single-draw perturbation nested inside each bootstrap trial
//!
//! With neither count set the call degrades to a single deterministic
//! evaluation carrying an advisory, returned as its own outcome variant.
//!
//! Trials are embarrassingly parallel and run on the rayon pool, each with a
//! private generator seeded from the run seed and the trial index, so a fixed
//! seed reproduces results regardless of thread scheduling.

use crate::kendall::{kendall_tau, KendallError, Limit};
use crate::percentiles::nan_percentiles;
use crate::perturb::{perturb_detections, perturb_once, perturb_slice};
use crate::spearman::{spearman_rho, SpearmanError};
use crate::{Correlation, DEFAULT_PERCENTILES, MIN_OBSERVATIONS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use thiserror::Error;

/// Advisory attached to the deterministic outcome when no randomization mode
/// is configured.
const NO_RANDOMIZATION_ADVISORY: &str =
    "no bootstrap or perturbation trials requested; returning the plain estimate";

/// Configuration for a Monte Carlo correlation run.
#[derive(Debug, Clone)]
pub struct MonteCarloConfig {
    /// Number of bootstrap trials; `None` disables bootstrapping.
    pub n_boot: Option<usize>,
    /// Number of perturbation trials; `None` disables perturbation. When
    /// combined with `n_boot`, this only switches perturbation on — each
    /// bootstrap trial receives exactly one perturbation draw.
    pub n_perturb: Option<usize>,
    /// Percentiles (0-100) at which the trial distribution is summarized.
    pub percentiles: Vec<f64>,
    /// Also return the raw trial distribution.
    pub return_dist: bool,
    /// Run seed; `None` draws one from entropy. A fixed seed makes the whole
    /// run reproducible.
    pub seed: Option<u64>,
    /// Evaluate trials on the rayon pool.
    pub parallel: bool,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            n_boot: None,
            n_perturb: None,
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            return_dist: false,
            seed: None,
            parallel: true,
        }
    }
}

/// Raw per-trial results, parallel vectors of equal length.
#[derive(Debug, Clone)]
pub struct TrialDistribution {
    /// Coefficient (rho or tau) per trial; NaN marks an undefined trial.
    pub coefficients: Vec<f64>,
    /// Two-sided p-value per trial.
    pub p_values: Vec<f64>,
}

/// Percentile summary of a Monte Carlo run.
#[derive(Debug, Clone)]
pub struct MonteCarloSummary {
    /// The percentile levels the summary was evaluated at.
    pub percentiles: Vec<f64>,
    /// Coefficient value at each requested percentile.
    pub coefficient_percentiles: Vec<f64>,
    /// p-value at each requested percentile.
    pub p_value_percentiles: Vec<f64>,
    /// Total number of trials evaluated.
    pub trials: usize,
    /// Trials whose statistic was undefined and excluded from the reduction.
    pub undefined_trials: usize,
    /// The raw distribution, present when requested.
    pub distribution: Option<TrialDistribution>,
}

/// Result of a Monte Carlo correlation call.
#[derive(Debug, Clone)]
pub enum MonteCarloOutcome {
    /// No randomization was configured; a single estimator evaluation on the
    /// unmodified dataset, with a non-fatal advisory.
    Deterministic {
        /// The plain estimate.
        estimate: Correlation,
        /// Advisory describing why no distribution was produced.
        warning: Option<String>,
    },
    /// A randomized run reduced to percentiles.
    Sampled(MonteCarloSummary),
}

impl MonteCarloOutcome {
    /// The percentile summary, if this outcome carries one.
    pub fn summary(&self) -> Option<&MonteCarloSummary> {
        match self {
            MonteCarloOutcome::Sampled(summary) => Some(summary),
            MonteCarloOutcome::Deterministic { .. } => None,
        }
    }

    /// The single deterministic estimate, if this outcome carries one.
    pub fn estimate(&self) -> Option<Correlation> {
        match self {
            MonteCarloOutcome::Deterministic { estimate, .. } => Some(*estimate),
            MonteCarloOutcome::Sampled(_) => None,
        }
    }
}

/// Errors from Monte Carlo orchestration. All are raised before any trial
/// work or random draw happens.
#[derive(Debug, Clone, Error)]
pub enum MonteCarloError {
    /// x and y differ in length.
    #[error("x and y must be the same length: {x_len} vs {y_len}")]
    LengthMismatch {
        /// Length of x.
        x_len: usize,
        /// Length of y.
        y_len: usize,
    },

    /// An uncertainty slice does not match the data length.
    #[error("{name} must match x in length: got {got}, expected {expected}")]
    UncertaintyLengthMismatch {
        /// Which slice mismatched ("dx" or "dy").
        name: &'static str,
        /// Length of the offending slice.
        got: usize,
        /// Expected length.
        expected: usize,
    },

    /// A censoring indicator slice does not match the data length.
    #[error("censoring indicators must match the data length: got {got}, expected {expected}")]
    LimitLengthMismatch {
        /// Length of the offending indicator slice.
        got: usize,
        /// Expected length.
        expected: usize,
    },

    /// Perturbation was requested but dx and dy were not both supplied.
    #[error("perturbation requested but dx and dy were not both provided")]
    MissingUncertainties,

    /// A configured trial count is zero.
    #[error("configured trial counts must be positive")]
    ZeroTrials,

    /// A requested percentile lies outside [0, 100].
    #[error("percentile {0} is outside [0, 100]")]
    InvalidPercentile(f64),

    /// Fewer observations than either estimator supports.
    #[error("need at least {min} observations, got {got}")]
    NotEnoughSamples {
        /// Number of observations supplied.
        got: usize,
        /// Minimum required.
        min: usize,
    },

    /// Estimator failure on the deterministic path.
    #[error(transparent)]
    Kendall(#[from] KendallError),

    /// Estimator failure on the deterministic path.
    #[error(transparent)]
    Spearman(#[from] SpearmanError),
}

/// Spearman rho with Monte Carlo confidence bands.
///
/// `dx` and `dy` are per-point Gaussian uncertainties, required whenever
/// `config.n_perturb` is set. See [`MonteCarloConfig`] for mode selection.
pub fn mc_spearman(
    x: &[f64],
    y: &[f64],
    dx: Option<&[f64]>,
    dy: Option<&[f64]>,
    config: &MonteCarloConfig,
) -> Result<MonteCarloOutcome, MonteCarloError> {
    validate_inputs(x, y, dx, dy, config)?;

    let uncertainties = match (dx, dy) {
        (Some(dx), Some(dy)) => Some((dx, dy)),
        _ => None,
    };
    let seed = config.seed.unwrap_or_else(rand::random);
    let n = x.len();

    let results = match (config.n_boot, config.n_perturb) {
        (None, None) => {
            return Ok(MonteCarloOutcome::Deterministic {
                estimate: spearman_rho(x, y)?,
                warning: Some(NO_RANDOMIZATION_ADVISORY.to_string()),
            });
        }
        (Some(n_boot), n_perturb) => {
            let uncertainties = if n_perturb.is_some() {
                Some(uncertainties.ok_or(MonteCarloError::MissingUncertainties)?)
            } else {
                None
            };
            run_trials(n_boot, seed, config.parallel, |rng| {
                let idx = draw_indices(n, rng);
                let mut xb = gather(x, &idx);
                let mut yb = gather(y, &idx);
                if let Some((dx, dy)) = uncertainties {
                    perturb_slice(&mut xb, &gather(dx, &idx), rng);
                    perturb_slice(&mut yb, &gather(dy, &idx), rng);
                }
                spearman_rho(&xb, &yb).unwrap_or_else(|_| Correlation::undefined())
            })
        }
        (None, Some(n_perturb)) => {
            let (dx, dy) = uncertainties.ok_or(MonteCarloError::MissingUncertainties)?;
            run_trials(n_perturb, seed, config.parallel, |rng| {
                match perturb_once(x, y, dx, dy, rng) {
                    Ok((xp, yp)) => {
                        spearman_rho(&xp, &yp).unwrap_or_else(|_| Correlation::undefined())
                    }
                    Err(_) => Correlation::undefined(),
                }
            })
        }
    };

    Ok(MonteCarloOutcome::Sampled(reduce(results, config)))
}

/// Generalized Kendall tau with Monte Carlo confidence bands.
///
/// `xlim` and `ylim` carry the per-point censoring state. Perturbation only
/// touches exact detections: a censored point's recorded limit passes through
/// every trial unchanged.
pub fn mc_kendall(
    x: &[f64],
    y: &[f64],
    xlim: &[Limit],
    ylim: &[Limit],
    dx: Option<&[f64]>,
    dy: Option<&[f64]>,
    config: &MonteCarloConfig,
) -> Result<MonteCarloOutcome, MonteCarloError> {
    validate_inputs(x, y, dx, dy, config)?;
    for lim in [xlim, ylim] {
        if lim.len() != x.len() {
            return Err(MonteCarloError::LimitLengthMismatch {
                got: lim.len(),
                expected: x.len(),
            });
        }
    }

    let uncertainties = match (dx, dy) {
        (Some(dx), Some(dy)) => Some((dx, dy)),
        _ => None,
    };
    let seed = config.seed.unwrap_or_else(rand::random);
    let n = x.len();

    let results = match (config.n_boot, config.n_perturb) {
        (None, None) => {
            return Ok(MonteCarloOutcome::Deterministic {
                estimate: kendall_tau(x, y, xlim, ylim)?,
                warning: Some(NO_RANDOMIZATION_ADVISORY.to_string()),
            });
        }
        (Some(n_boot), n_perturb) => {
            let uncertainties = if n_perturb.is_some() {
                Some(uncertainties.ok_or(MonteCarloError::MissingUncertainties)?)
            } else {
                None
            };
            run_trials(n_boot, seed, config.parallel, |rng| {
                let idx = draw_indices(n, rng);
                let mut xb = gather(x, &idx);
                let mut yb = gather(y, &idx);
                let xlimb = gather(xlim, &idx);
                let ylimb = gather(ylim, &idx);
                if let Some((dx, dy)) = uncertainties {
                    perturb_detections(&mut xb, &gather(dx, &idx), &xlimb, rng);
                    perturb_detections(&mut yb, &gather(dy, &idx), &ylimb, rng);
                }
                kendall_tau(&xb, &yb, &xlimb, &ylimb)
                    .unwrap_or_else(|_| Correlation::undefined())
            })
        }
        (None, Some(n_perturb)) => {
            let (dx, dy) = uncertainties.ok_or(MonteCarloError::MissingUncertainties)?;
            run_trials(n_perturb, seed, config.parallel, |rng| {
                let mut xp = x.to_vec();
                let mut yp = y.to_vec();
                perturb_detections(&mut xp, dx, xlim, rng);
                perturb_detections(&mut yp, dy, ylim, rng);
                kendall_tau(&xp, &yp, xlim, ylim).unwrap_or_else(|_| Correlation::undefined())
            })
        }
    };

    Ok(MonteCarloOutcome::Sampled(reduce(results, config)))
}

/// Fail-fast validation shared by both entry points. Nothing random happens
/// before this returns Ok.
fn validate_inputs(
    x: &[f64],
    y: &[f64],
    dx: Option<&[f64]>,
    dy: Option<&[f64]>,
    config: &MonteCarloConfig,
) -> Result<(), MonteCarloError> {
    if x.len() != y.len() {
        return Err(MonteCarloError::LengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    if x.len() < MIN_OBSERVATIONS {
        return Err(MonteCarloError::NotEnoughSamples {
            got: x.len(),
            min: MIN_OBSERVATIONS,
        });
    }
    for (name, seq) in [("dx", dx), ("dy", dy)] {
        if let Some(seq) = seq {
            if seq.len() != x.len() {
                return Err(MonteCarloError::UncertaintyLengthMismatch {
                    name,
                    got: seq.len(),
                    expected: x.len(),
                });
            }
        }
    }
    if config.n_perturb.is_some() && (dx.is_none() || dy.is_none()) {
        return Err(MonteCarloError::MissingUncertainties);
    }
    if config.n_boot == Some(0) || config.n_perturb == Some(0) {
        return Err(MonteCarloError::ZeroTrials);
    }
    for &p in &config.percentiles {
        if !(0.0..=100.0).contains(&p) {
            return Err(MonteCarloError::InvalidPercentile(p));
        }
    }
    Ok(())
}

/// Evaluate `trials` independent trials, each with a private generator seeded
/// from the run seed and the trial index. Parallel and serial execution
/// produce identical output for the same seed.
fn run_trials<F>(trials: usize, seed: u64, parallel: bool, trial: F) -> Vec<Correlation>
where
    F: Fn(&mut StdRng) -> Correlation + Sync,
{
    let run_one = |i: usize| {
        let mut rng = StdRng::seed_from_u64(trial_seed(seed, i as u64));
        trial(&mut rng)
    };

    if parallel {
        (0..trials).into_par_iter().map(run_one).collect()
    } else {
        (0..trials).map(run_one).collect()
    }
}

/// Mix the run seed with a trial index into an independent per-trial seed
/// (SplitMix64 finalizer), so neighboring trial indices yield uncorrelated
/// streams.
fn trial_seed(seed: u64, trial: u64) -> u64 {
    let mut z = seed ^ trial.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Draw one bootstrap index vector, sampling uniformly with replacement over
/// the full range [0, n).
fn draw_indices<R: Rng>(n: usize, rng: &mut R) -> Vec<usize> {
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

fn gather<T: Copy>(src: &[T], idx: &[usize]) -> Vec<T> {
    idx.iter().map(|&i| src[i]).collect()
}

/// Reduce per-trial results to the requested percentile summary, NaN-aware.
fn reduce(results: Vec<Correlation>, config: &MonteCarloConfig) -> MonteCarloSummary {
    let coefficients: Vec<f64> = results.iter().map(|c| c.coefficient).collect();
    let p_values: Vec<f64> = results.iter().map(|c| c.p_value).collect();
    let undefined_trials = results.iter().filter(|c| !c.is_defined()).count();

    MonteCarloSummary {
        percentiles: config.percentiles.clone(),
        coefficient_percentiles: nan_percentiles(&coefficients, &config.percentiles),
        p_value_percentiles: nan_percentiles(&p_values, &config.percentiles),
        trials: results.len(),
        undefined_trials,
        distribution: config
            .return_dist
            .then(|| TrialDistribution {
                coefficients,
                p_values,
            }),
    }
}
