//! Error types for style estimation.

use crate::optimizer::OptimizerError;
use rbsa_data::DataError;
use thiserror::Error;

/// Errors that can occur while fitting a style model.
///
/// Numeric degeneracies (empty selections, zero residual variance, too few
/// observations for an information criterion) are reported through NaN
/// diagnostics instead. Only structural problems end up here.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Insufficient data for estimation
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Optimizer rejected its inputs
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    /// Data access error
    #[error(transparent)]
    Data(#[from] DataError),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// Sampling distribution could not be constructed
    #[error("Sampling error: {0}")]
    Sampling(String),
}
