// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod generator;
pub mod manifold;

pub use generator::ManifoldGenerator;
pub use manifold::{LaggedObs, Manifold};
