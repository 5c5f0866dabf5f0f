// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Residual scoring of predictions against held-out targets.
//!
//! Pairs where either side carries the missing sentinel are excluded; the
//! sentinel itself is returned when too few pairs survive to define the
//! statistic.

/// Pearson correlation between observations and predictions.
///
/// Returns `missing` when fewer than two pairs survive or when either
/// surviving side has zero variance.
pub fn pearson_rho(obs: &[f64], pred: &[f64], missing: f64) -> f64 {
    assert_eq!(
        obs.len(),
        pred.len(),
        "pearson_rho requires aligned slices; got {} and {}",
        obs.len(),
        pred.len()
    );

    let mut n = 0usize;
    let mut sum_a = 0.0;
    let mut sum_b = 0.0;
    for (&a, &b) in obs.iter().zip(pred) {
        if a != missing && b != missing {
            n += 1;
            sum_a += a;
            sum_b += b;
        }
    }
    if n < 2 {
        return missing;
    }

    let mean_a = sum_a / n as f64;
    let mean_b = sum_b / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&a, &b) in obs.iter().zip(pred) {
        if a != missing && b != missing {
            let da = a - mean_a;
            let db = b - mean_b;
            cov += da * db;
            var_a += da * da;
            var_b += db * db;
        }
    }

    if var_a <= 0.0 || var_b <= 0.0 {
        return missing;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

/// Mean absolute error between observations and predictions.
///
/// Returns `missing` when no pair survives.
pub fn mean_absolute_error(obs: &[f64], pred: &[f64], missing: f64) -> f64 {
    assert_eq!(
        obs.len(),
        pred.len(),
        "mean_absolute_error requires aligned slices; got {} and {}",
        obs.len(),
        pred.len()
    );

    let mut n = 0usize;
    let mut total = 0.0;
    for (&a, &b) in obs.iter().zip(pred) {
        if a != missing && b != missing {
            n += 1;
            total += (a - b).abs();
        }
    }
    if n == 0 {
        return missing;
    }
    total / n as f64
}
