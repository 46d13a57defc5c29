//! Error types for ranking, substitution and reporting.

use rbsa_data::DataError;
use rbsa_models::ModelError;
use thiserror::Error;

/// Errors raised while post-processing candidates.
///
/// Rules that cannot be evaluated for a candidate are not errors; they are
/// reported as [`RuleOutcome::Inapplicable`](crate::substitution::RuleOutcome).
#[derive(Debug, Error)]
pub enum OutputError {
    /// Malformed substitution rule
    #[error("Invalid substitution rule '{name}': {reason}")]
    InvalidRule {
        /// Rule name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Refit or evaluation failed
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Data access failed
    #[error(transparent)]
    Data(#[from] DataError),
}
