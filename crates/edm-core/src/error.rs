// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::error::Error;
use std::fmt;

/// Error taxonomy for the EDM engine.
///
/// Errors never cross the worker boundary: a task folds its condition into a
/// [`ReturnCode`] slot and the engine aggregates the worst code. `EdmError`
/// itself surfaces only from validation before scheduling starts, or from the
/// host-facing constructors and parsers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EdmError {
    /// Malformed input: shape mismatch, out-of-domain option value.
    InvalidInput(String),
    /// Unrecognised algorithm name or variant.
    InvalidAlgorithm(String),
    /// Too few usable neighbours or regression rows for a well-posed answer.
    InsufficientUnique(String),
    /// Fewer input columns than the invocation requires.
    TooFewVariables(String),
    /// More input columns than the invocation accepts.
    TooManyVariables(String),
    /// Requested a path that is not implemented.
    NotImplemented(String),
    /// A size or budget limit was exceeded.
    ResourceLimit(String),
    /// A computation produced a non-finite or degenerate value.
    NumericalIssue(String),
    /// The host's cancellation flag was observed.
    Cancelled,
    /// Anything that escaped the categories above.
    Unknown(String),
}

impl EdmError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_algorithm(msg: impl Into<String>) -> Self {
        Self::InvalidAlgorithm(msg.into())
    }

    pub fn insufficient_unique(msg: impl Into<String>) -> Self {
        Self::InsufficientUnique(msg.into())
    }

    pub fn too_few_variables(msg: impl Into<String>) -> Self {
        Self::TooFewVariables(msg.into())
    }

    pub fn too_many_variables(msg: impl Into<String>) -> Self {
        Self::TooManyVariables(msg.into())
    }

    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::NotImplemented(msg.into())
    }

    pub fn resource_limit(msg: impl Into<String>) -> Self {
        Self::ResourceLimit(msg.into())
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }

    pub fn cancelled() -> Self {
        Self::Cancelled
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }

    /// Maps the error onto the closed return-code set.
    pub fn return_code(&self) -> ReturnCode {
        match self {
            Self::InvalidAlgorithm(_) => ReturnCode::InvalidAlgorithm,
            Self::InsufficientUnique(_) => ReturnCode::InsufficientUnique,
            Self::TooFewVariables(_) => ReturnCode::TooFewVariables,
            Self::TooManyVariables(_) => ReturnCode::TooManyVariables,
            Self::NotImplemented(_) => ReturnCode::NotImplemented,
            Self::Cancelled => ReturnCode::BreakHit,
            Self::InvalidInput(_)
            | Self::ResourceLimit(_)
            | Self::NumericalIssue(_)
            | Self::Unknown(_) => ReturnCode::UnknownError,
        }
    }
}

impl fmt::Display for EdmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::InvalidAlgorithm(msg) => write!(f, "invalid algorithm: {msg}"),
            Self::InsufficientUnique(msg) => {
                write!(f, "insufficient unique observations: {msg}")
            }
            Self::TooFewVariables(msg) => write!(f, "too few variables: {msg}"),
            Self::TooManyVariables(msg) => write!(f, "too many variables: {msg}"),
            Self::NotImplemented(msg) => write!(f, "not implemented: {msg}"),
            Self::ResourceLimit(msg) => write!(f, "resource limit exceeded: {msg}"),
            Self::NumericalIssue(msg) => write!(f, "numerical issue: {msg}"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Unknown(msg) => write!(f, "unknown error: {msg}"),
        }
    }
}

impl Error for EdmError {}

/// Closed per-task and aggregate return-code set.
///
/// Discriminants encode the aggregation order: the aggregate code for a run
/// is the maximum over every task that ran. `InsufficientUnique` is the
/// warning-class soft code; codes above `BreakHit` are fatal.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ReturnCode {
    #[default]
    Success = 0,
    InsufficientUnique = 1,
    BreakHit = 2,
    InvalidAlgorithm = 3,
    TooFewVariables = 4,
    TooManyVariables = 5,
    NotImplemented = 6,
    UnknownError = 7,
}

impl ReturnCode {
    /// True for codes that abort the run rather than degrade it.
    pub fn is_fatal(self) -> bool {
        self > Self::BreakHit
    }

    /// True for the warning-class soft code.
    pub fn is_warning(self) -> bool {
        self == Self::InsufficientUnique
    }

    /// Worst of two codes under the aggregation order.
    pub fn worst(self, other: Self) -> Self {
        self.max(other)
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::InsufficientUnique => "insufficient unique observations",
            Self::BreakHit => "break hit",
            Self::InvalidAlgorithm => "invalid algorithm",
            Self::TooFewVariables => "too few variables",
            Self::TooManyVariables => "too many variables",
            Self::NotImplemented => "not implemented",
            Self::UnknownError => "unknown error",
        };
        f.write_str(name)
    }
}

impl From<&EdmError> for ReturnCode {
    fn from(err: &EdmError) -> Self {
        err.return_code()
    }
}
