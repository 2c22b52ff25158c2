//! Error types for jet clustering runs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum JetError {
    #[error("Invalid clustering parameter: {0}")]
    InvalidParameter(String),

    #[error("Centroid requested over a cluster with zero total energy")]
    EmptyCluster,

    /// Internal invariant violation of the kT recombination loop.
    #[error("No finite minimum distance found with {remaining} pseudo-particles remaining")]
    DegenerateMinimum { remaining: usize },

    #[error("Grid error: {0}")]
    Grid(String),
}

/// Result type for clustering operations
pub type JetResult<T> = Result<T, JetError>;

/// Fail with `InvalidParameter` unless `value` is finite and strictly positive.
pub(crate) fn ensure_positive(name: &str, value: f64) -> JetResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(JetError::InvalidParameter(format!(
            "{name} must be finite and > 0, got {value}"
        )))
    }
}

/// Fail with `InvalidParameter` unless `value` is finite and non-negative.
pub(crate) fn ensure_non_negative(name: &str, value: f64) -> JetResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(JetError::InvalidParameter(format!(
            "{name} must be finite and >= 0, got {value}"
        )))
    }
}
