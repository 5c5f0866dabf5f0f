// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use edm_core::{ColumnMetric, DistanceKind, Options};
use edm_manifold::Manifold;

/// Valid candidate indices paired with their distances, equal length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DistanceIndexPairs {
    pub inds: Vec<usize>,
    pub dists: Vec<f64>,
}

impl DistanceIndexPairs {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inds: Vec::with_capacity(capacity),
            dists: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.inds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inds.is_empty()
    }
}

/// Distances from query row `query` of `mp` to each library candidate under
/// the Euclidean or mean-absolute-error metric.
///
/// A candidate drops out when its distance is zero (an identical row would
/// self-match) or when a missing cell is met under `missing_distance = 0`.
/// With a positive `missing_distance` each missing cell contributes that
/// value as its raw per-column difference instead.
pub fn lp_distances(
    query: usize,
    opts: &Options,
    m: &Manifold,
    mp: &Manifold,
    candidates: &[usize],
) -> DistanceIndexPairs {
    debug_assert_eq!(m.e_actual(), mp.e_actual());

    let missing = m.missing();
    let e_actual = m.e_actual();
    let query_row = mp.row(query);
    let mut out = DistanceIndexPairs::with_capacity(candidates.len());

    for &i in candidates {
        let mut dist = 0.0;

        // Observations from different panels start from the mismatch penalty.
        if opts.panel_mode && opts.idw > 0.0 && m.panel(i) != mp.panel(query) {
            dist += opts.idw;
        }

        let row = m.row(i);
        let mut pair_missing = false;

        for j in 0..e_actual {
            let a = row[j];
            let b = query_row[j];

            let raw = if a == missing || b == missing {
                if opts.missing_distance == 0.0 {
                    pair_missing = true;
                    break;
                }
                opts.missing_distance
            } else {
                match opts.metric(j) {
                    ColumnMetric::Diff => a - b,
                    ColumnMetric::CheckSame => {
                        if a != b { 1.0 } else { 0.0 }
                    }
                }
            };

            if opts.distance == DistanceKind::MeanAbsoluteError {
                dist += raw.abs() / e_actual as f64;
            } else {
                dist += raw * raw;
            }
        }

        if pair_missing || dist == 0.0 {
            continue;
        }

        out.inds.push(i);
        out.dists.push(if opts.distance == DistanceKind::MeanAbsoluteError {
            dist
        } else {
            dist.sqrt()
        });
    }

    out
}
