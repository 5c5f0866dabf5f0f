// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::neighbors::Neighbors;
use edm_core::EdmError;
use edm_manifold::Manifold;
use nalgebra::{DMatrix, DVector, SVD};

/// One fitted local map: the prediction and the coefficient vector
/// `[intercept, c_1, ..., c_E_actual]`.
#[derive(Clone, Debug, PartialEq)]
pub struct SmapFit {
    pub prediction: f64,
    pub coefficients: Vec<f64>,
}

/// S-map: a locally weighted linear regression over the selected
/// neighbours, solved through a thin SVD so rank-deficient neighbourhoods
/// degrade to the minimum-norm solution instead of blowing up.
///
/// Raw distances are softened to `sqrt(d)`, mean-normalised and mapped
/// through `exp(-theta * w / mean(w))`; design rows are the weighted
/// library rows with a leading weight column for the intercept. Neighbours
/// with a missing target or any missing library cell are dropped. Unless
/// `force_compute` is set, fewer surviving rows than `E_actual + 1` is an
/// insufficient-unique condition.
pub fn smap_prediction(
    theta: f64,
    neighbors: &Neighbors,
    m: &Manifold,
    query_row: &[f64],
    force_compute: bool,
) -> Result<SmapFit, EdmError> {
    let count = neighbors.len();
    let e_actual = m.e_actual();
    let missing = m.missing();

    if count < 2 {
        return Err(EdmError::insufficient_unique(format!(
            "S-map requires at least 2 neighbours; got {count}"
        )));
    }

    let mut weights = Vec::with_capacity(count);
    let mut mean_w = 0.0;
    for &d in &neighbors.dists {
        let w = d.sqrt();
        mean_w += w;
        weights.push(w);
    }
    mean_w /= count as f64;
    for w in &mut weights {
        *w = (-theta * (*w / mean_w)).exp();
    }

    // Keep only rows that can enter the regression.
    let mut kept_rows = Vec::with_capacity(count);
    for (pos, &ind) in neighbors.inds.iter().enumerate() {
        if m.y(ind) == missing || m.any_missing(ind) {
            continue;
        }
        kept_rows.push((pos, ind));
    }

    let rows = kept_rows.len();
    if rows == 0 {
        return Err(EdmError::insufficient_unique(
            "S-map found no neighbour with a complete row and target",
        ));
    }
    if rows < e_actual + 1 && !force_compute {
        return Err(EdmError::insufficient_unique(format!(
            "S-map regression needs {} complete rows; got {rows}",
            e_actual + 1
        )));
    }

    let mut design = DMatrix::<f64>::zeros(rows, e_actual + 1);
    let mut response = DVector::<f64>::zeros(rows);
    for (r, &(pos, ind)) in kept_rows.iter().enumerate() {
        let w = weights[pos];
        design[(r, 0)] = w;
        let row = m.row(ind);
        for j in 0..e_actual {
            design[(r, j + 1)] = w * row[j];
        }
        response[r] = w * m.y(ind);
    }

    let svd = SVD::new(design, true, true);
    let cutoff = svd
        .singular_values
        .iter()
        .fold(0.0f64, |acc, &s| acc.max(s))
        * f64::EPSILON
        * (rows.max(e_actual + 1)) as f64;
    let solution = svd
        .solve(&response, cutoff)
        .map_err(|msg| EdmError::numerical_issue(msg))?;

    let coefficients: Vec<f64> = solution.iter().copied().collect();

    let mut prediction = coefficients[0];
    for (j, &c) in coefficients.iter().skip(1).enumerate() {
        let q = query_row[j];
        if q != missing {
            prediction += c * q;
        }
    }

    Ok(SmapFit { prediction, coefficients })
}
