// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::EdmError;
use std::str::FromStr;

/// Prediction algorithm.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Algorithm {
    /// Weighted mean over the nearest neighbours.
    #[default]
    Simplex,
    /// Locally weighted linear regression over the nearest neighbours.
    SMap,
}

impl FromStr for Algorithm {
    type Err = EdmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            // The empty string historically defaults to simplex projection.
            "" | "simplex" => Ok(Self::Simplex),
            "smap" => Ok(Self::SMap),
            other => Err(EdmError::invalid_algorithm(format!(
                "expected \"simplex\" or \"smap\", got {other:?}"
            ))),
        }
    }
}

/// Distance family used to compare a query row against library rows.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DistanceKind {
    #[default]
    Euclidean,
    MeanAbsoluteError,
    /// Optimal-transport curve matching over the lagged channels.
    Wasserstein,
}

impl FromStr for DistanceKind {
    type Err = EdmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "euclidean" | "l2" => Ok(Self::Euclidean),
            "mae" | "meanabsoluteerror" | "l1" => Ok(Self::MeanAbsoluteError),
            "wasserstein" => Ok(Self::Wasserstein),
            other => Err(EdmError::invalid_input(format!(
                "unknown distance {other:?}; expected \"euclidean\", \"mae\" or \"wasserstein\""
            ))),
        }
    }
}

/// Per-column comparison rule.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColumnMetric {
    /// Continuous data: absolute difference.
    #[default]
    Diff,
    /// Unordered categorical data: 0 when equal, 1 otherwise.
    CheckSame,
}

/// Earth-mover solver for the Wasserstein distance.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum TransportSolver {
    /// Exact min-cost-flow transport.
    #[default]
    Exact,
    /// Entropy-regularised approximation. Unstable for small `epsilon`;
    /// non-finite outputs are filtered downstream.
    Sinkhorn { epsilon: f64, stop_err: f64 },
}

/// Configuration record for one prediction invocation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    /// Embedding dimension E for this invocation.
    pub e: usize,
    pub algorithm: Algorithm,
    pub distance: DistanceKind,
    /// Per-manifold-column metric table. Empty means all [`ColumnMetric::Diff`].
    pub metrics: Vec<ColumnMetric>,
    /// Weighting sharpness values. Simplex may use several; the engine loops
    /// the full sequence for either algorithm.
    pub thetas: Vec<f64>,
    /// Neighbour count; `k <= 0` means "all valid" (`-1` is the documented
    /// alias for the same thing).
    pub k: isize,
    /// 0 rejects any row pair with a missing cell; a positive value is
    /// substituted per missing cell.
    pub missing_distance: f64,
    pub panel_mode: bool,
    /// Penalty added when query and library rows belong to different panels.
    pub idw: f64,
    /// Wasserstein time-axis rescaling.
    pub aspect_ratio: f64,
    /// Materialise S-map coefficient rows.
    pub save_mode: bool,
    /// Number of coefficient columns written per prediction under
    /// `save_mode`; 0 means the full `E_actual + 1`.
    pub num_coeff_cols: usize,
    /// Proceed with an S-map regression even when under-determined.
    pub force_compute: bool,
    /// Substitute the coprediction series into the query lag block.
    pub copredict: bool,
    /// Worker threads; 0 picks the available parallelism. Always clamped to
    /// the logical-core count.
    pub nthreads: usize,
    pub transport: TransportSolver,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            e: 2,
            algorithm: Algorithm::Simplex,
            distance: DistanceKind::Euclidean,
            metrics: Vec::new(),
            thetas: vec![1.0],
            k: 0,
            missing_distance: 0.0,
            panel_mode: false,
            idw: 0.0,
            aspect_ratio: 1.0,
            save_mode: false,
            num_coeff_cols: 0,
            force_compute: false,
            copredict: false,
            nthreads: 0,
            transport: TransportSolver::Exact,
        }
    }
}

impl Options {
    /// Validates every field that does not depend on manifold shape.
    pub fn validate(&self) -> Result<(), EdmError> {
        if self.e == 0 {
            return Err(EdmError::invalid_input("Options.e must be >= 1; got 0"));
        }

        if self.thetas.is_empty() {
            return Err(EdmError::invalid_input(
                "Options.thetas must contain at least one value",
            ));
        }
        for (i, theta) in self.thetas.iter().copied().enumerate() {
            if !theta.is_finite() || theta < 0.0 {
                return Err(EdmError::invalid_input(format!(
                    "Options.thetas[{i}] must be finite and >= 0; got {theta}"
                )));
            }
        }

        if !self.missing_distance.is_finite() || self.missing_distance < 0.0 {
            return Err(EdmError::invalid_input(format!(
                "Options.missing_distance must be finite and >= 0; got {}",
                self.missing_distance
            )));
        }

        if !self.idw.is_finite() || self.idw < 0.0 {
            return Err(EdmError::invalid_input(format!(
                "Options.idw must be finite and >= 0; got {}",
                self.idw
            )));
        }

        if !self.aspect_ratio.is_finite() || self.aspect_ratio < 0.0 {
            return Err(EdmError::invalid_input(format!(
                "Options.aspect_ratio must be finite and >= 0; got {}",
                self.aspect_ratio
            )));
        }

        if let TransportSolver::Sinkhorn { epsilon, stop_err } = self.transport {
            if !epsilon.is_finite() || epsilon <= 0.0 {
                return Err(EdmError::invalid_input(format!(
                    "TransportSolver::Sinkhorn requires epsilon > 0; got {epsilon}"
                )));
            }
            if !stop_err.is_finite() || stop_err <= 0.0 {
                return Err(EdmError::invalid_input(format!(
                    "TransportSolver::Sinkhorn requires stop_err > 0; got {stop_err}"
                )));
            }
        }

        Ok(())
    }

    /// Validates shape-dependent fields against the manifold width.
    pub fn validate_for(&self, e_actual: usize) -> Result<(), EdmError> {
        self.validate()?;

        if !self.metrics.is_empty() {
            if self.metrics.len() < e_actual {
                return Err(EdmError::too_few_variables(format!(
                    "metrics table has {} entries, manifold has {e_actual} columns",
                    self.metrics.len()
                )));
            }
            if self.metrics.len() > e_actual {
                return Err(EdmError::too_many_variables(format!(
                    "metrics table has {} entries, manifold has {e_actual} columns",
                    self.metrics.len()
                )));
            }
        }

        if self.save_mode && self.num_coeff_cols > e_actual + 1 {
            return Err(EdmError::invalid_input(format!(
                "Options.num_coeff_cols must be <= E_actual + 1 = {}; got {}",
                e_actual + 1,
                self.num_coeff_cols
            )));
        }

        Ok(())
    }

    /// Metric for column `j`, defaulting to [`ColumnMetric::Diff`] when the
    /// table was left empty.
    #[inline]
    pub fn metric(&self, j: usize) -> ColumnMetric {
        self.metrics.get(j).copied().unwrap_or_default()
    }

    /// Effective coefficient-column count under `save_mode`.
    pub fn coeff_cols(&self, e_actual: usize) -> usize {
        if !self.save_mode {
            return 0;
        }
        if self.num_coeff_cols == 0 {
            e_actual + 1
        } else {
            self.num_coeff_cols
        }
    }
}
