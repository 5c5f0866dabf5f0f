// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod control;
pub mod error;
pub mod execution_context;
pub mod observability;
pub mod options;
pub mod sampling;

pub use control::CancelToken;
pub use error::{EdmError, ReturnCode};
pub use execution_context::ExecutionContext;
pub use observability::{ConsoleSink, IoSink, NullSink};
pub use options::{Algorithm, ColumnMetric, DistanceKind, Options, TransportSolver};
pub use sampling::{
    crossfold_split, full_split, library_split, median, median_split, rank, SplitMasks,
};

/// Sentinel marking gaps in cells, distances, and outputs.
///
/// Chosen far outside the natural range of observational data; cells are
/// compared against it with `==`. Generators may carry a different sentinel
/// when a host's data can collide with this one.
pub const MISSING: f64 = 1.0e+100;

/// Returns true when `value` is the default missing sentinel.
#[inline]
pub fn is_missing(value: f64) -> bool {
    value == MISSING
}
