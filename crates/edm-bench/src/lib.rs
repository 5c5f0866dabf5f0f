// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Shared fixtures for the criterion benchmarks.

use edm_core::MISSING;

/// Logistic-map trajectory, the standard chaotic benchmark input.
pub fn logistic_map(n: usize, x0: f64) -> Vec<f64> {
    let mut x = Vec::with_capacity(n);
    let mut value = x0;
    for _ in 0..n {
        x.push(value);
        value = 3.9 * value * (1.0 - value);
    }
    x
}

/// One-step-ahead target: y[i] = x[i + 1].
pub fn shifted_target(x: &[f64]) -> Vec<f64> {
    let mut y: Vec<f64> = x[1..].to_vec();
    y.push(MISSING);
    y
}
