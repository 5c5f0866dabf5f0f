// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod engine;
pub mod neighbors;
pub mod simplex;
pub mod smap;

pub use engine::{Prediction, PredictionHandle, predict, predict_async};
pub use neighbors::{Neighbors, select_neighbors};
pub use simplex::simplex_prediction;
pub use smap::{SmapFit, smap_prediction};
