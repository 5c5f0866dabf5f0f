// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Curve-matching distance between two manifold rows.
//!
//! Each row is read as `T` channels of `E` time points (primary series,
//! optional time deltas, lagged extras); the kernel builds a pairwise cost
//! matrix over the surviving time columns and hands it to an earth-mover
//! solver. Unlagged extras and the panel penalty form a baseline added to
//! every cell, so they price the match without joining the transport.

use crate::emd::{earth_mover_distance, sinkhorn_distance};
use crate::lp::DistanceIndexPairs;
use edm_core::{ColumnMetric, EdmError, ExecutionContext, Options, TransportSolver};
use edm_manifold::{LaggedObs, Manifold};

const ASPECT_EPSILON: f64 = 1e-6;

/// Dense cost matrix over surviving time columns of one row pair.
#[derive(Clone, Debug, PartialEq)]
pub struct CostMatrix {
    pub costs: Vec<f64>,
    pub len_i: usize,
    pub len_j: usize,
}

fn column_missing_flags(obs: &LaggedObs<'_>, missing: f64) -> Vec<bool> {
    (0..obs.e())
        .map(|t| (0..obs.channels()).any(|k| obs.get(k, t) == missing))
        .collect()
}

/// Time-axis scaling for the dt channel, from the library row's spread.
fn time_axis_scale(obs: &LaggedObs<'_>, missing: f64, aspect_ratio: f64) -> f64 {
    let mut min_data = f64::INFINITY;
    let mut max_data = f64::NEG_INFINITY;
    let mut max_time = 0.0f64;

    for t in 0..obs.e() {
        let x = obs.get(0, t);
        if x != missing {
            min_data = min_data.min(x);
            max_data = max_data.max(x);
        }
        let dt = obs.get(1, t);
        if dt != missing && dt > max_time {
            max_time = dt;
        }
    }
    if min_data > max_data {
        min_data = 0.0;
        max_data = 0.0;
    }

    aspect_ratio * (max_data - min_data + ASPECT_EPSILON) / (max_time + ASPECT_EPSILON)
}

/// Builds the pairwise cost matrix for library row `i` against query row
/// `query`, or `None` when no time column survives on either side.
pub fn wasserstein_cost_matrix(
    m: &Manifold,
    mp: &Manifold,
    i: usize,
    query: usize,
    opts: &Options,
) -> Option<CostMatrix> {
    let missing = m.missing();
    let skip_missing = opts.missing_distance == 0.0;

    let m_obs = m.lagged_obs(i);
    let q_obs = mp.lagged_obs(query);
    let m_missing = column_missing_flags(&m_obs, missing);
    let q_missing = column_missing_flags(&q_obs, missing);

    let len_i = if skip_missing {
        m_obs.e() - m_missing.iter().filter(|&&b| b).count()
    } else {
        m_obs.e()
    };
    let len_j = if skip_missing {
        q_obs.e() - q_missing.iter().filter(|&&b| b).count()
    } else {
        q_obs.e()
    };
    if len_i == 0 || len_j == 0 {
        return None;
    }

    let has_dt = m.e_dt() > 0;
    let gamma = if has_dt {
        time_axis_scale(&m_obs, missing, opts.aspect_ratio)
    } else {
        1.0
    };

    let channels = m_obs.channels();

    // Row-independent baseline: unlagged extras plus the panel penalty.
    let mut baseline = 0.0;
    for v in 0..m.num_unlagged_extras() {
        let x = m.unlagged_extra(i, v);
        let y = mp.unlagged_extra(query, v);
        if x == missing || y == missing {
            baseline += opts.missing_distance;
        } else {
            baseline += match opts.metric(channels + v) {
                ColumnMetric::Diff => (x - y).abs(),
                ColumnMetric::CheckSame => {
                    if x != y { 1.0 } else { 0.0 }
                }
            };
        }
    }
    if opts.panel_mode && opts.idw > 0.0 && m.panel(i) != mp.panel(query) {
        baseline += opts.idw;
    }

    let mut costs = vec![baseline; len_i * len_j];

    for k in 0..channels {
        let metric = opts.metric(k);
        let mut n = 0usize;
        for nn in 0..m_obs.e() {
            if skip_missing && m_missing[nn] {
                continue;
            }
            let mut mm_out = 0usize;
            for mm in 0..q_obs.e() {
                if skip_missing && q_missing[mm] {
                    continue;
                }

                let mut dist = if m_missing[nn] || q_missing[mm] {
                    opts.missing_distance
                } else {
                    let a = m_obs.get(k, nn);
                    let b = q_obs.get(k, mm);
                    match metric {
                        ColumnMetric::Diff => (a - b).abs(),
                        ColumnMetric::CheckSame => {
                            if a != b { 1.0 } else { 0.0 }
                        }
                    }
                };

                // The dt channel carries the rescaled time axis.
                if has_dt && k == 1 {
                    dist *= gamma;
                }

                costs[n * len_j + mm_out] += dist;
                mm_out += 1;
            }
            n += 1;
        }
    }

    Some(CostMatrix { costs, len_i, len_j })
}

fn solve(matrix: &CostMatrix, transport: TransportSolver) -> f64 {
    match transport {
        TransportSolver::Exact => {
            earth_mover_distance(&matrix.costs, matrix.len_i, matrix.len_j)
        }
        TransportSolver::Sinkhorn { epsilon, stop_err } => {
            sinkhorn_distance(&matrix.costs, matrix.len_i, matrix.len_j, epsilon, stop_err)
        }
    }
}

/// Curve-matching distances from query row `query` to each candidate.
///
/// Candidates whose transport cost is zero, subnormal or non-finite drop
/// out. Cancellation is polled between cost-matrix construction and the
/// transport solve, since the solve dominates long tasks.
pub fn wasserstein_distances(
    query: usize,
    opts: &Options,
    m: &Manifold,
    mp: &Manifold,
    candidates: &[usize],
    ctx: &ExecutionContext<'_>,
) -> Result<DistanceIndexPairs, EdmError> {
    let mut out = DistanceIndexPairs::with_capacity(candidates.len());

    for &i in candidates {
        let Some(matrix) = wasserstein_cost_matrix(m, mp, i, query, opts) else {
            continue;
        };

        ctx.check_cancelled()?;

        let dist = solve(&matrix, opts.transport);
        if dist.is_normal() {
            out.inds.push(i);
            out.dists.push(dist);
        }
    }

    Ok(out)
}
