//! End-to-end style analysis.
//!
//! 1. Prepare inputs: align, excess returns, winsorize, clean, split the
//!    selection universe from substitution-only assets.
//! 2. Optionally test the fund for smoothing and de-smooth it.
//! 3. Run the enabled approaches in parallel on the selection universe.
//! 4. Rank, substitute within the top candidates against the full universe,
//!    rank again.

use crate::error::AnalysisError;
use rayon::prelude::*;
use rbsa_data::{
    DesmoothConfig, DesmoothReport, PreparedData, PreprocessConfig, ReturnMatrix, ReturnSeries,
    desmooth_if_needed, prepare,
};
use rbsa_models::{Approach, Candidate, ModelConfig, StyleOptions, estimator};
use rbsa_output::{
    RankedCandidate, ReportBuilder, StyleReport, SubstitutionAnalysis, SubstitutionConfig,
    SubstitutionEngine, SubstitutionRule, rank,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Complete analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Approach options
    pub options: StyleOptions,

    /// Approaches to run (default: all four)
    pub approaches: Vec<Approach>,

    /// Substitution rules (default: none)
    pub substitution_rules: Vec<SubstitutionRule>,

    /// Substitution thresholds
    pub substitution: SubstitutionConfig,

    /// Number of top-ranked candidates run through substitution (default: 3)
    pub top_n: usize,

    /// Input preparation
    pub preprocess: PreprocessConfig,

    /// Fund de-smoothing (default: disabled)
    pub desmooth: DesmoothConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            options: StyleOptions::default(),
            approaches: Approach::ALL.to_vec(),
            substitution_rules: Vec::new(),
            substitution: SubstitutionConfig::default(),
            top_n: 3,
            preprocess: PreprocessConfig::default(),
            desmooth: DesmoothConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Default configuration with the given approach options.
    pub fn from_options(options: StyleOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Per-approach configuration derived from the options.
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig::from_options(&self.options)
    }

    /// Substitution thresholds with the budget constraint taken from the options.
    pub fn substitution_config(&self) -> SubstitutionConfig {
        SubstitutionConfig {
            sum_to_one: !self.options.allow_cash_less_than_one,
            ..self.substitution
        }
    }

    /// Check every part of the configuration.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.approaches.is_empty() {
            return Err(AnalysisError::InvalidConfig("no approach enabled".to_string()));
        }
        let level = self.desmooth.significance_level;
        if !(level > 0.0 && level < 1.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "significance_level must be in (0, 1), got {level}"
            )));
        }
        self.model_config().validate()?;
        self.preprocess.validate()?;
        for rule in &self.substitution_rules {
            rule.validate()?;
        }
        Ok(())
    }
}

/// What one approach produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApproachResult {
    /// The approach produced a candidate
    Fitted {
        /// Approach
        approach: Approach,
        /// Fitted candidate
        candidate: Box<Candidate>,
    },
    /// The approach failed
    Failed {
        /// Approach
        approach: Approach,
        /// Error message
        error: String,
    },
}

impl ApproachResult {
    /// Approach this result belongs to.
    pub const fn approach(&self) -> Approach {
        match self {
            Self::Fitted { approach, .. } | Self::Failed { approach, .. } => *approach,
        }
    }

    /// The candidate, if the approach succeeded.
    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            Self::Fitted { candidate, .. } => Some(candidate.as_ref()),
            Self::Failed { .. } => None,
        }
    }
}

/// Everything a style analysis produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// Fund name
    pub fund: String,
    /// De-smoothing test and result, when enabled
    pub desmooth: Option<DesmoothReport>,
    /// One result per enabled approach, in configuration order
    pub approach_results: Vec<ApproachResult>,
    /// Ranking before substitution
    pub initial_ranking: Vec<RankedCandidate>,
    /// Substitution analyses of the top candidates
    pub substitutions: Vec<SubstitutionAnalysis>,
    /// Ranking after substitution
    pub final_ranking: Vec<RankedCandidate>,
    /// Configuration used
    pub config: AnalysisConfig,
}

impl AnalysisOutcome {
    /// Best candidate after substitution.
    pub fn best(&self) -> Option<&Candidate> {
        self.final_ranking.first().map(|r| &r.candidate)
    }

    /// Report over the final ranking.
    pub fn report(&self) -> StyleReport {
        ReportBuilder::new()
            .fund(self.fund.clone())
            .mode(self.config.options.analysis_mode)
            .candidates(self.final_ranking.clone())
            .build()
    }
}

/// Style analysis runner.
#[derive(Debug, Clone)]
pub struct StyleAnalysis {
    config: AnalysisConfig,
}

impl StyleAnalysis {
    /// Create a runner after validating the configuration.
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Runner configuration.
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Prepare raw returns and run the analysis.
    ///
    /// # Arguments
    /// * `fund` - Fund returns
    /// * `assets` - Candidate asset returns, selection and substitution-only
    /// * `risk_free` - Optional risk-free series; returns become excess returns
    pub fn run(
        &self,
        fund: &ReturnSeries,
        assets: &ReturnMatrix,
        risk_free: Option<&ReturnSeries>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let data = prepare(fund, assets, risk_free, &self.config.preprocess)?;
        self.run_prepared(&data)
    }

    /// Run the analysis on already prepared inputs.
    pub fn run_prepared(&self, data: &PreparedData) -> Result<AnalysisOutcome, AnalysisError> {
        let (fund, desmooth) = if self.config.desmooth.enabled {
            let (series, report) = desmooth_if_needed(&data.fund, self.config.desmooth.significance_level)?;
            (series, Some(report))
        } else {
            (data.fund.clone(), None)
        };

        let approach_results = self.run_approaches(&data.selection, &fund);
        let candidates: Vec<Candidate> = approach_results
            .iter()
            .filter_map(ApproachResult::candidate)
            .cloned()
            .collect();
        if candidates.is_empty() {
            return Err(AnalysisError::NoCandidates);
        }

        let mode = self.config.options.analysis_mode;
        let initial_ranking = rank(candidates, mode);
        let engine = SubstitutionEngine::new(
            self.config.substitution_rules.clone(),
            self.config.substitution_config(),
        )?;
        let run = engine.process(&initial_ranking, self.config.top_n, &data.full, &fund, mode)?;

        if let Some(best) = run.ranking.first() {
            info!(
                fund = fund.name(),
                approach = %best.candidate.approach,
                assets = ?best.candidate.selected,
                r2 = best.candidate.diagnostics.r2,
                "style analysis complete"
            );
        }

        Ok(AnalysisOutcome {
            fund: fund.name().to_string(),
            desmooth,
            approach_results,
            initial_ranking,
            substitutions: run.analyses,
            final_ranking: run.ranking,
            config: self.config.clone(),
        })
    }

    fn run_approaches(&self, assets: &ReturnMatrix, fund: &ReturnSeries) -> Vec<ApproachResult> {
        let model = self.config.model_config();
        self.config
            .approaches
            .par_iter()
            .map(|&approach| match estimator(approach, &model).fit(assets, fund) {
                Ok(candidate) => {
                    info!(
                        %approach,
                        assets = candidate.n_assets(),
                        r2 = candidate.diagnostics.r2,
                        "approach fitted"
                    );
                    ApproachResult::Fitted {
                        approach,
                        candidate: Box::new(candidate),
                    }
                }
                Err(e) => {
                    warn!(%approach, error = %e, "approach failed");
                    ApproachResult::Failed {
                        approach,
                        error: e.to_string(),
                    }
                }
            })
            .collect()
    }
}
