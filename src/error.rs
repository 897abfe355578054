//! Error types for amips.

use thiserror::Error;

/// Errors that can occur while building or querying a MIP index.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AmipError {
    /// Invalid parameter value (zero sizes, non-positive scale, ratio <= 1, ...).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Vector or buffer length does not match the declared dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Input that makes the transform undefined (e.g. every vector is zero).
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// The nearest-neighbor backend failed to build over the augmented data.
    #[error("index construction failed: {0}")]
    IndexBuild(String),

    /// The nearest-neighbor backend failed while answering a query.
    #[error("query failed: {0}")]
    Query(String),
}

impl AmipError {
    /// True for errors caused by caller-supplied configuration or input.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AmipError::InvalidParameter(_)
                | AmipError::DimensionMismatch { .. }
                | AmipError::DegenerateInput(_)
        )
    }
}

/// Result type for amips operations.
pub type Result<T> = std::result::Result<T, AmipError>;
