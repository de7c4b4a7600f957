//! End-to-end tests for the Monte Carlo correlation pipeline.
//!
//! The reference dataset is a 46-point tie-free permutation whose plain
//! Spearman rho is known in closed form (rho = 1 - 6 sum(d^2) / (n (n^2 - 1))),
//! so the deterministic path is checked exactly and the randomized paths are
//! checked against statistically safe bands around it.

use mccorrelation::{
    kendall_tau, mc_kendall, mc_spearman, spearman_rho, Limit, MonteCarloConfig,
    MonteCarloOutcome,
};

const N: usize = 46;

/// Disjoint index swaps applied to the identity permutation; each swap of
/// distance d contributes 2 d^2 to sum(d^2).
const SWAPS: [(usize, usize); 6] = [(0, 15), (1, 16), (2, 17), (3, 18), (4, 19), (5, 20)];

/// x = 1..=46 and y = a permutation of it with plain rho ~= 0.8335.
fn reference_data() -> (Vec<f64>, Vec<f64>, f64) {
    let x: Vec<f64> = (1..=N).map(|i| i as f64).collect();
    let mut y = x.clone();
    let mut d2 = 0.0;
    for &(i, j) in &SWAPS {
        y.swap(i, j);
        d2 += 2.0 * ((j - i) as f64).powi(2);
    }
    let n = N as f64;
    let expected_rho = 1.0 - 6.0 * d2 / (n * (n * n - 1.0));
    (x, y, expected_rho)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sampled(outcome: MonteCarloOutcome) -> mccorrelation::MonteCarloSummary {
    match outcome {
        MonteCarloOutcome::Sampled(summary) => summary,
        MonteCarloOutcome::Deterministic { .. } => panic!("expected a sampled outcome"),
    }
}

#[test]
fn test_plain_spearman_matches_closed_form() {
    let (x, y, expected) = reference_data();
    let r = spearman_rho(&x, &y).unwrap();

    assert!((r.coefficient - expected).abs() < 1e-12);
    assert!(r.p_value < 1e-9);
}

#[test]
fn test_bootstrap_distribution_centers_on_plain_estimate() {
    let (x, y, expected) = reference_data();
    let config = MonteCarloConfig {
        n_boot: Some(2000),
        seed: Some(1234),
        return_dist: true,
        ..Default::default()
    };

    let summary = sampled(mc_spearman(&x, &y, None, None, &config).unwrap());
    assert_eq!(summary.trials, 2000);

    let dist = summary.distribution.as_ref().unwrap();
    assert_eq!(dist.coefficients.len(), 2000);
    assert_eq!(dist.p_values.len(), 2000);

    // Bootstrap mean sits near the plain estimate (small downward bias).
    assert!((mean(&dist.coefficients) - expected).abs() < 0.05);
    // The 16th percentile lies below the 84th.
    assert!(summary.coefficient_percentiles[0] < summary.coefficient_percentiles[2]);
    // The median bracket contains the plain estimate.
    assert!(summary.coefficient_percentiles[0] < expected);
    assert!(summary.coefficient_percentiles[2] > expected);
}

#[test]
fn test_perturbation_attenuates_the_correlation() {
    let (x, y, expected) = reference_data();
    let dx = vec![0.5; N];
    let dy = vec![0.5; N];
    let config = MonteCarloConfig {
        n_perturb: Some(2000),
        seed: Some(77),
        return_dist: true,
        ..Default::default()
    };

    let summary = sampled(mc_spearman(&x, &y, Some(&dx), Some(&dy), &config).unwrap());
    assert_eq!(summary.trials, 2000);

    let m = mean(&summary.distribution.as_ref().unwrap().coefficients);
    // Measurement noise can only blur the ranking.
    assert!(m < expected);
    assert!(m > expected - 0.2);
}

#[test]
fn test_combined_mode_runs_nboot_trials_and_attenuates_further() {
    let (x, y, expected) = reference_data();
    let dx = vec![0.5; N];
    let dy = vec![0.5; N];

    let perturb_only = MonteCarloConfig {
        n_perturb: Some(2000),
        seed: Some(5),
        return_dist: true,
        ..Default::default()
    };
    let combined = MonteCarloConfig {
        n_boot: Some(2000),
        n_perturb: Some(2000),
        seed: Some(5),
        return_dist: true,
        ..Default::default()
    };

    let p = sampled(mc_spearman(&x, &y, Some(&dx), Some(&dy), &perturb_only).unwrap());
    let c = sampled(mc_spearman(&x, &y, Some(&dx), Some(&dy), &combined).unwrap());

    // Nboot drives the combined trial count, not Nperturb.
    assert_eq!(c.trials, 2000);
    assert_eq!(c.distribution.as_ref().unwrap().coefficients.len(), 2000);

    let pm = mean(&p.distribution.as_ref().unwrap().coefficients);
    let cm = mean(&c.distribution.as_ref().unwrap().coefficients);
    assert!(cm < expected);
    assert!(cm < pm + 0.02);
    assert!(cm > expected - 0.3);
}

#[test]
fn test_fixed_seed_reproduces_the_whole_run() {
    let (x, y, _) = reference_data();
    let dx = vec![0.5; N];
    let dy = vec![0.5; N];
    let config = MonteCarloConfig {
        n_boot: Some(500),
        n_perturb: Some(1),
        seed: Some(2024),
        return_dist: true,
        ..Default::default()
    };

    let a = sampled(mc_spearman(&x, &y, Some(&dx), Some(&dy), &config).unwrap());
    let b = sampled(mc_spearman(&x, &y, Some(&dx), Some(&dy), &config).unwrap());

    assert_eq!(
        a.distribution.as_ref().unwrap().coefficients,
        b.distribution.as_ref().unwrap().coefficients
    );
    assert_eq!(a.coefficient_percentiles, b.coefficient_percentiles);
    assert_eq!(a.p_value_percentiles, b.p_value_percentiles);
}

#[test]
fn test_percentile_summary_shape_and_order() {
    let (x, y, _) = reference_data();
    let config = MonteCarloConfig {
        n_boot: Some(500),
        seed: Some(8),
        percentiles: vec![5.0, 25.0, 50.0, 75.0, 95.0],
        ..Default::default()
    };

    let summary = sampled(mc_spearman(&x, &y, None, None, &config).unwrap());

    assert_eq!(summary.percentiles.len(), 5);
    assert_eq!(summary.coefficient_percentiles.len(), 5);
    assert_eq!(summary.p_value_percentiles.len(), 5);
    assert!(summary.distribution.is_none());

    for w in summary.coefficient_percentiles.windows(2) {
        assert!(w[0] <= w[1]);
    }
    for w in summary.p_value_percentiles.windows(2) {
        assert!(w[0] <= w[1]);
    }
}

#[test]
fn test_kendall_censored_end_to_end() {
    let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
    let y: Vec<f64> = x.iter().map(|v| 1.5 * v + 3.0).collect();
    let xlim = vec![Limit::Detection; 20];
    let mut ylim = vec![Limit::Detection; 20];
    ylim[3] = Limit::Upper;
    ylim[11] = Limit::Upper;
    ylim[17] = Limit::Lower;

    let plain = kendall_tau(&x, &y, &xlim, &ylim).unwrap();
    assert!(plain.coefficient > 0.7);

    let dx = vec![0.3; 20];
    let dy = vec![0.3; 20];
    let config = MonteCarloConfig {
        n_boot: Some(400),
        n_perturb: Some(1),
        seed: Some(31),
        return_dist: true,
        ..Default::default()
    };

    let summary = sampled(
        mc_kendall(&x, &y, &xlim, &ylim, Some(&dx), Some(&dy), &config).unwrap(),
    );

    assert_eq!(summary.trials, 400);
    assert_eq!(summary.distribution.as_ref().unwrap().coefficients.len(), 400);
    // Degenerate resamples are rare for 20 well-separated points.
    assert!(summary.undefined_trials < 40);

    let median = summary.coefficient_percentiles[1];
    assert!(median > 0.4 && median <= 1.0);
}

#[test]
fn test_kendall_deterministic_path_and_advisory() {
    let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
    let y = x.clone();
    let lims = vec![Limit::Detection; 10];

    let out = mc_kendall(&x, &y, &lims, &lims, None, None, &MonteCarloConfig::default()).unwrap();
    match out {
        MonteCarloOutcome::Deterministic { estimate, warning } => {
            assert!((estimate.coefficient - 1.0).abs() < 1e-12);
            assert!(warning.is_some());
        }
        MonteCarloOutcome::Sampled(_) => panic!("expected deterministic outcome"),
    }
}

#[test]
fn test_perturbation_only_keeps_censored_kendall_points_fixed() {
    // With zero uncertainty on detections and censored points exempt, every
    // perturbation trial sees the original dataset.
    let x: Vec<f64> = (0..12).map(|i| i as f64).collect();
    let y: Vec<f64> = x.iter().map(|v| v * v).collect();
    let mut xlim = vec![Limit::Detection; 12];
    xlim[0] = Limit::Upper;
    xlim[7] = Limit::Lower;
    let ylim = vec![Limit::Detection; 12];

    let plain = kendall_tau(&x, &y, &xlim, &ylim).unwrap();

    let dx = vec![0.0; 12];
    let dy = vec![0.0; 12];
    let config = MonteCarloConfig {
        n_perturb: Some(50),
        seed: Some(64),
        return_dist: true,
        ..Default::default()
    };
    let summary = sampled(
        mc_kendall(&x, &y, &xlim, &ylim, Some(&dx), Some(&dy), &config).unwrap(),
    );

    for &tau in &summary.distribution.as_ref().unwrap().coefficients {
        assert!((tau - plain.coefficient).abs() < 1e-12);
    }
}
