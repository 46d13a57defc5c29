//! Style analysis reports.

use crate::ranking::{CompositeWeights, LARGE_SAMPLE, RankedCandidate};
use chrono::{DateTime, Utc};
use rbsa_models::{AnalysisMode, AssetWeight, WeightVector};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Asset classes in display order, each with its usual tickers.
///
/// Assets outside every class are listed after these, alphabetically.
pub const ASSET_HIERARCHY: &[(&str, &[&str])] = &[
    ("us_broad", &["IWV", "VTI", "ITOT"]),
    ("us_large", &["SPY", "IVV", "VOO", "IWB", "VV"]),
    ("us_large_growth", &["IWF", "VUG"]),
    ("us_large_value", &["IWD", "VTV"]),
    ("us_mid", &["IJH", "MDY", "VO"]),
    ("us_small", &["IWM", "IJR", "VB"]),
    ("us_small_growth", &["IWO", "VBK"]),
    ("us_small_value", &["IWN", "VBR"]),
    ("intl_developed", &["EFA", "VEA", "IEFA"]),
    ("emerging", &["EEM", "VWO", "IEMG"]),
    ("bonds_broad", &["AGG", "BND"]),
    ("treasury_short", &["SHY", "VGSH"]),
    ("treasury_intermediate", &["IEF", "VGIT"]),
    ("treasury_long", &["TLT", "VGLT"]),
    ("tips", &["TIP", "VTIP", "SCHP"]),
    ("corporate_ig", &["LQD", "VCIT"]),
    ("high_yield", &["HYG", "JNK"]),
    ("municipal", &["MUB", "VTEB"]),
    ("cash", &["BIL", "SHV"]),
    ("real_estate", &["VNQ", "IYR"]),
    ("gold", &["GLD", "IAU"]),
    ("commodities", &["DBC", "GSG", "PDBC"]),
];

fn hierarchy_position(asset: &str) -> Option<(usize, usize)> {
    ASSET_HIERARCHY.iter().enumerate().find_map(|(class, (_, tickers))| {
        tickers
            .iter()
            .position(|t| *t == asset)
            .map(|pos| (class, pos))
    })
}

/// Weights ordered by asset class, unclassified assets last and alphabetical.
pub fn hierarchy_order(weights: &WeightVector) -> Vec<&AssetWeight> {
    let mut ordered: Vec<&AssetWeight> = weights.iter().collect();
    ordered.sort_by(|a, b| {
        match (hierarchy_position(&a.asset), hierarchy_position(&b.asset)) {
            (Some(pa), Some(pb)) => pa.cmp(&pb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.asset.cmp(&b.asset),
        }
    });
    ordered
}

/// Explanation of the composite weights used for `n_obs` observations.
pub fn composite_note(n_obs: usize) -> String {
    let w = CompositeWeights::for_sample_size(n_obs);
    let pct = |v: f64| format!("{:.0}%", v * 100.0);
    let regime = if n_obs < LARGE_SAMPLE {
        format!("Small sample detected (n<{LARGE_SAMPLE}): AICc emphasized, BIC de-emphasized")
    } else {
        format!("Large sample (n≥{LARGE_SAMPLE}): BIC emphasized")
    };
    format!(
        "Note: Composite score uses n={n_obs} → weights: R²={}, Adj-R²={}, AICc={}, BIC={}\n{regime}\nLower AIC/AICc/BIC is better. Higher composite score is better.",
        pct(w.r2),
        pct(w.adj_r2),
        pct(w.aicc),
        pct(w.bic),
    )
}

/// Statistics and asset rows for each ranked candidate.
pub fn format_candidates(ranked: &[RankedCandidate], show_substitution_label: bool) -> String {
    let mut out = String::new();
    for r in ranked {
        let c = &r.candidate;
        let d = &c.diagnostics;
        let label = if show_substitution_label && c.is_substituted() {
            ", after substitution"
        } else {
            ""
        };
        out.push_str(&format!("Candidate {} ({}{label}):\n", r.rank, c.approach));
        out.push_str(&format!(
            "  Statistics: n_assets={}, R²={:.6}, Adj-R²={:.6}, RMSE={:.6}, MAE={:.6}, AIC={:.2}, AICc={:.2}, BIC={:.2}, Composite={:.6}\n",
            c.n_assets(),
            d.r2,
            d.adj_r2,
            d.rmse,
            d.mae,
            d.aic,
            d.aicc,
            d.bic,
            r.composite,
        ));
        let assets: Vec<String> = hierarchy_order(&c.weights)
            .into_iter()
            .map(|w| format!("{}({:.3})", w.asset, w.weight))
            .collect();
        if assets.is_empty() {
            out.push_str("  Assets:     (none)\n");
        } else {
            out.push_str(&format!("  Assets:     {}\n", assets.join(", ")));
        }
        out.push('\n');
    }
    out
}

/// Final style analysis report for one fund.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleReport {
    /// Fund being analyzed.
    pub fund: String,

    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,

    /// Ranking mode.
    pub mode: AnalysisMode,

    /// Number of observations in the fit.
    pub n_obs: usize,

    /// Ranked candidates, best first.
    pub candidates: Vec<RankedCandidate>,
}

impl StyleReport {
    /// Create a new report.
    pub fn new(fund: String, mode: AnalysisMode, candidates: Vec<RankedCandidate>) -> Self {
        let n_obs = candidates
            .first()
            .map_or(0, |r| r.candidate.diagnostics.n_obs);
        Self {
            fund,
            timestamp: Utc::now(),
            mode,
            n_obs,
            candidates,
        }
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON report to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Plain-text report.
    pub fn to_text(&self) -> String {
        let rule = "=".repeat(100);
        let mut out = format!("{rule}\nFINAL RESULTS: {}\n{rule}\n\n", self.fund);
        out.push_str(&format_candidates(&self.candidates, true));
        if !self.candidates.is_empty() {
            out.push_str(&"-".repeat(100));
            out.push('\n');
            out.push_str(&composite_note(self.n_obs));
            out.push('\n');
        }
        out.push_str(&rule);
        out.push('\n');
        out
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    fund: Option<String>,
    mode: AnalysisMode,
    candidates: Vec<RankedCandidate>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fund name.
    pub fn fund(mut self, fund: impl Into<String>) -> Self {
        self.fund = Some(fund.into());
        self
    }

    /// Set the ranking mode.
    pub const fn mode(mut self, mode: AnalysisMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the ranked candidates.
    pub fn candidates(mut self, candidates: Vec<RankedCandidate>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Build the report.
    pub fn build(self) -> StyleReport {
        StyleReport::new(self.fund.unwrap_or_default(), self.mode, self.candidates)
    }
}
