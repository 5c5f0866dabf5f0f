// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::neighbors::Neighbors;

/// Simplex projection: the exponentially weighted mean of the neighbours'
/// targets.
///
/// Weights are `exp(-theta * sqrt(d_j / d_base))` against the closest
/// selected distance. Neighbours whose target is missing drop out and the
/// weights renormalise over the survivors; `None` when no target survives
/// or the base distance is degenerate.
pub fn simplex_prediction(
    theta: f64,
    neighbors: &Neighbors,
    y: &[f64],
    missing: f64,
) -> Option<f64> {
    let d_base = *neighbors.dists.first()?;
    if d_base <= 0.0 {
        return None;
    }

    let mut weight_sum = 0.0;
    let mut weighted_targets = 0.0;
    for (&ind, &d) in neighbors.inds.iter().zip(&neighbors.dists) {
        let target = y[ind];
        if target == missing {
            continue;
        }
        let w = (-theta * (d / d_base).sqrt()).exp();
        weight_sum += w;
        weighted_targets += w * target;
    }

    if weight_sum > 0.0 {
        Some(weighted_targets / weight_sum)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::simplex_prediction;
    use crate::neighbors::Neighbors;
    use edm_core::MISSING;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual}, |diff|={diff}, tol={tol}"
        );
    }

    fn neighbors(entries: &[(usize, f64)]) -> Neighbors {
        Neighbors {
            inds: entries.iter().map(|&(i, _)| i).collect(),
            dists: entries.iter().map(|&(_, d)| d).collect(),
        }
    }

    #[test]
    fn theta_zero_reduces_to_the_uniform_mean() {
        let sel = neighbors(&[(0, 1.0), (1, 2.0), (2, 9.0)]);
        let y = [3.0, 6.0, 9.0];
        let got = simplex_prediction(0.0, &sel, &y, MISSING).expect("prediction");
        assert_close(got, 6.0, 1e-12);
    }

    #[test]
    fn weights_follow_the_documented_kernel() {
        let sel = neighbors(&[(0, 1.0), (1, 4.0)]);
        let y = [10.0, 20.0];
        let theta = 1.5;

        let w0 = (-theta * 1.0_f64).exp();
        let w1 = (-theta * 2.0_f64).exp();
        let expected = (w0 * 10.0 + w1 * 20.0) / (w0 + w1);

        let got = simplex_prediction(theta, &sel, &y, MISSING).expect("prediction");
        assert_close(got, expected, 1e-12);
    }

    #[test]
    fn prediction_stays_within_the_surviving_target_hull() {
        let sel = neighbors(&[(0, 0.5), (1, 1.0), (2, 2.0), (3, 4.0)]);
        let y = [1.0, -3.0, 7.0, 2.0];

        for theta in [0.0, 0.5, 1.0, 4.0] {
            let got = simplex_prediction(theta, &sel, &y, MISSING).expect("prediction");
            assert!((-3.0..=7.0).contains(&got), "theta={theta} escaped hull: {got}");
        }
    }

    #[test]
    fn missing_targets_drop_out_and_weights_renormalise() {
        let sel = neighbors(&[(0, 1.0), (1, 2.0), (2, 3.0)]);
        let y = [5.0, MISSING, 11.0];
        let theta = 1.0;

        let w0 = (-theta * 1.0_f64).exp();
        let w2 = (-theta * 3.0_f64.sqrt()).exp();
        let expected = (w0 * 5.0 + w2 * 11.0) / (w0 + w2);

        let got = simplex_prediction(theta, &sel, &y, MISSING).expect("prediction");
        assert_close(got, expected, 1e-12);
    }

    #[test]
    fn degenerate_inputs_yield_none() {
        let all_missing = neighbors(&[(0, 1.0), (1, 2.0)]);
        assert!(simplex_prediction(1.0, &all_missing, &[MISSING, MISSING], MISSING).is_none());

        let zero_base = neighbors(&[(0, 0.0)]);
        assert!(simplex_prediction(1.0, &zero_base, &[5.0], MISSING).is_none());

        assert!(simplex_prediction(1.0, &Neighbors::default(), &[], MISSING).is_none());
    }
}
