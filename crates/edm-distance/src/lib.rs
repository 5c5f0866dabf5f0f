// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod emd;
pub mod lp;
pub mod wasserstein;

pub use emd::{earth_mover_distance, sinkhorn_distance};
pub use lp::{DistanceIndexPairs, lp_distances};
pub use wasserstein::{CostMatrix, wasserstein_cost_matrix, wasserstein_distances};
