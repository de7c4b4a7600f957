//! Gaussian Perturbation Sampling
//!
//! Draws randomized copies of a paired dataset where each point is redrawn
//! from a normal distribution centered on its measured value with its stated
//! measurement uncertainty as standard deviation. Draws are independent
//! across points and across realizations.
//!
//! Censored points carry a limit, not a measurement, so the censoring-aware
//! helper leaves them untouched; perturbing a stated limit would contradict
//! its semantics.

use crate::kendall::Limit;
use rand::Rng;
use rand_distr::StandardNormal;
use thiserror::Error;

/// Errors from perturbation sampling.
#[derive(Debug, Clone, Error)]
pub enum PerturbError {
    /// x, y, dx and dy do not all share one length.
    #[error("x, y, dx and dy must be the same length: {x_len}/{y_len}/{dx_len}/{dy_len}")]
    LengthMismatch {
        /// Length of x.
        x_len: usize,
        /// Length of y.
        y_len: usize,
        /// Length of dx.
        dx_len: usize,
        /// Length of dy.
        dy_len: usize,
    },
}

fn validate(x: &[f64], y: &[f64], dx: &[f64], dy: &[f64]) -> Result<(), PerturbError> {
    if x.len() != y.len() || x.len() != dx.len() || x.len() != dy.len() {
        return Err(PerturbError::LengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
            dx_len: dx.len(),
            dy_len: dy.len(),
        });
    }
    Ok(())
}

/// Draw a single perturbed realization of (x, y).
///
/// Returns flat length-N vectors; this is the single-perturbation step nested
/// inside a combined bootstrap trial. Validation happens before any draw is
/// consumed from `rng`.
pub fn perturb_once<R: Rng>(
    x: &[f64],
    y: &[f64],
    dx: &[f64],
    dy: &[f64],
    rng: &mut R,
) -> Result<(Vec<f64>, Vec<f64>), PerturbError> {
    validate(x, y, dx, dy)?;

    let mut xp = x.to_vec();
    let mut yp = y.to_vec();
    perturb_slice(&mut xp, dx, rng);
    perturb_slice(&mut yp, dy, rng);
    Ok((xp, yp))
}

/// Draw `draws` independent perturbed realizations of (x, y).
///
/// The first realization equals [`perturb_once`] for an identically seeded
/// generator.
pub fn perturb_draws<R: Rng>(
    x: &[f64],
    y: &[f64],
    dx: &[f64],
    dy: &[f64],
    draws: usize,
    rng: &mut R,
) -> Result<Vec<(Vec<f64>, Vec<f64>)>, PerturbError> {
    validate(x, y, dx, dy)?;
    (0..draws).map(|_| perturb_once(x, y, dx, dy, rng)).collect()
}

/// Redraw every value in place from N(value, sigma).
pub(crate) fn perturb_slice<R: Rng>(values: &mut [f64], sigma: &[f64], rng: &mut R) {
    for (v, s) in values.iter_mut().zip(sigma) {
        let z: f64 = rng.sample(StandardNormal);
        *v += s * z;
    }
}

/// Redraw only exact detections in place; limit points pass through.
pub(crate) fn perturb_detections<R: Rng>(
    values: &mut [f64],
    sigma: &[f64],
    limits: &[Limit],
    rng: &mut R,
) {
    for ((v, s), lim) in values.iter_mut().zip(sigma).zip(limits) {
        if lim.is_detection() {
            let z: f64 = rng.sample(StandardNormal);
            *v += s * z;
        }
    }
}
