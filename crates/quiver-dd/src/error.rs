//! Error types for the decision-diagram package.

use thiserror::Error;

/// Errors produced while constructing gate diagrams.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DdError {
    /// The line-role descriptor names no target line.
    #[error("gate layout has no target line")]
    MissingTarget,

    /// More than one line is marked as target.
    #[error("gate layout has two target lines ({first} and {second})")]
    DuplicateTarget {
        /// Variable of the first target.
        first: usize,
        /// Variable of the second target.
        second: usize,
    },

    /// A dense amplitude list over this many variables would not fit.
    #[error("dense listing of {vars} variables exceeds the limit of {limit}")]
    DenseTooLarge { vars: usize, limit: usize },
}

/// Result type for decision-diagram operations.
pub type DdResult<T> = Result<T, DdError>;
