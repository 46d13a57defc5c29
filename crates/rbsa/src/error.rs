//! Error types for the analysis pipeline.

use rbsa_data::DataError;
use rbsa_models::ModelError;
use rbsa_output::OutputError;
use thiserror::Error;

/// Errors that stop a style analysis.
///
/// A single approach failing is not one of them; failures are recorded in
/// the outcome and the remaining approaches carry on.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Input preparation failed
    #[error(transparent)]
    Data(#[from] DataError),

    /// Model configuration or estimation failed
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Ranking or substitution failed
    #[error(transparent)]
    Output(#[from] OutputError),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Every enabled approach failed
    #[error("No approach produced a candidate")]
    NoCandidates,
}
