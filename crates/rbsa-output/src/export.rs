//! CSV and JSON export of ranked candidates.
//!
//! CSV output is flat: one summary row per candidate, or one row per
//! candidate and asset for weights. JSON output keeps the full nested
//! candidate including diagnostics and substitution history.

use crate::ranking::RankedCandidate;
use rbsa_models::Approach;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

/// One candidate's weight on one asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightExport {
    /// Candidate rank
    pub rank: usize,
    /// Producing approach
    pub approach: Approach,
    /// Asset name
    pub asset: String,
    /// Weight
    pub weight: f64,
}

/// Fit statistics of one ranked candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateSummaryExport {
    /// Candidate rank
    pub rank: usize,
    /// Producing approach
    pub approach: Approach,
    /// Number of assets
    pub n_assets: usize,
    /// R²
    pub r2: f64,
    /// Adjusted R²
    pub adj_r2: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute error
    pub mae: f64,
    /// AIC
    pub aic: f64,
    /// Small-sample AIC
    pub aicc: f64,
    /// BIC
    pub bic: f64,
    /// Composite score
    pub composite: f64,
    /// Whether substitution changed the candidate
    pub substituted: bool,
    /// Assets joined with `|`
    pub assets: String,
}

impl From<&RankedCandidate> for CandidateSummaryExport {
    fn from(r: &RankedCandidate) -> Self {
        let d = &r.candidate.diagnostics;
        Self {
            rank: r.rank,
            approach: r.candidate.approach,
            n_assets: r.candidate.n_assets(),
            r2: d.r2,
            adj_r2: d.adj_r2,
            rmse: d.rmse,
            mae: d.mae,
            aic: d.aic,
            aicc: d.aicc,
            bic: d.bic,
            composite: r.composite,
            substituted: r.candidate.is_substituted(),
            assets: r.candidate.selected.join("|"),
        }
    }
}

/// Weight rows for every ranked candidate, in rank order.
pub fn weight_rows(ranked: &[RankedCandidate]) -> Vec<WeightExport> {
    ranked
        .iter()
        .flat_map(|r| {
            r.candidate.weights.iter().map(move |w| WeightExport {
                rank: r.rank,
                approach: r.candidate.approach,
                asset: w.asset.clone(),
                weight: w.weight,
            })
        })
        .collect()
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn csv_string<T: Serialize>(records: impl IntoIterator<Item = T>) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in records {
        wtr.serialize(record)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

fn json_string<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String, ExportError> {
    if pretty {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

impl Exporter for Vec<WeightExport> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => csv_string(self),
            ExportFormat::Json => json_string(self, false),
            ExportFormat::PrettyJson => json_string(self, true),
        }
    }
}

/// Ranked candidates export as summary rows in CSV and full records in JSON.
impl Exporter for Vec<RankedCandidate> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => csv_string(self.iter().map(CandidateSummaryExport::from)),
            ExportFormat::Json => json_string(self, false),
            ExportFormat::PrettyJson => json_string(self, true),
        }
    }
}
