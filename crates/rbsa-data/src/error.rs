//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Dates are not strictly increasing
    #[error("Time index of {name} is not strictly increasing at position {position}")]
    UnorderedIndex {
        /// Series or matrix the index belongs to
        name: String,
        /// First offending position
        position: usize,
    },

    /// Length mismatch between two aligned pieces of data
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// An asset name appears more than once
    #[error("Duplicate asset name: {0}")]
    DuplicateAsset(String),

    /// An asset name was requested but is not present
    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    /// Not enough observations for the requested operation
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Missing data
    #[error("Missing data for {symbol}: {reason}")]
    MissingData {
        /// Symbol that was queried
        symbol: String,
        /// Reason for missing data
        reason: String,
    },

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Statistical distribution could not be constructed
    #[error("Statistics error: {0}")]
    Stats(#[from] statrs::StatsError),
}
