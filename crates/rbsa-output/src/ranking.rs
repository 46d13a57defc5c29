//! Cross-approach ranking.
//!
//! The primary order uses one fit metric: R² in-sample, negated RMSE in
//! prediction mode. The composite score blends R², adjusted R², AICc and
//! BIC with weights that depend on the sample size:
//!
//! | n       | R²   | Adj R² | AICc | BIC  |
//! |---------|------|--------|------|------|
//! | < 60    | 0.15 | 0.35   | 0.40 | 0.10 |
//! | ≥ 60    | 0.10 | 0.30   | 0.20 | 0.40 |
//!
//! AICc and BIC enter negated. Undefined metrics score −∞, so sorting is a
//! total order.

use rbsa_models::{AnalysisMode, Candidate};
use serde::{Deserialize, Serialize};

/// Sample size from which the large-sample composite weights apply.
pub const LARGE_SAMPLE: usize = 60;

/// Weights of the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeWeights {
    /// Weight on R²
    pub r2: f64,
    /// Weight on adjusted R²
    pub adj_r2: f64,
    /// Weight on −AICc
    pub aicc: f64,
    /// Weight on −BIC
    pub bic: f64,
}

impl CompositeWeights {
    /// Weights for `n_obs` observations.
    pub const fn for_sample_size(n_obs: usize) -> Self {
        if n_obs < LARGE_SAMPLE {
            Self {
                r2: 0.15,
                adj_r2: 0.35,
                aicc: 0.40,
                bic: 0.10,
            }
        } else {
            Self {
                r2: 0.10,
                adj_r2: 0.30,
                aicc: 0.20,
                bic: 0.40,
            }
        }
    }
}

fn finite_or_neg_inf(v: f64) -> f64 {
    if v.is_finite() { v } else { f64::NEG_INFINITY }
}

/// Primary ranking score; higher is better.
pub fn selection_score(candidate: &Candidate, mode: AnalysisMode) -> f64 {
    let d = &candidate.diagnostics;
    match mode {
        AnalysisMode::InSample => {
            if d.r2.is_nan() { f64::NEG_INFINITY } else { d.r2 }
        }
        AnalysisMode::Prediction => {
            if d.rmse.is_nan() { f64::NEG_INFINITY } else { -d.rmse }
        }
    }
}

/// Composite score; higher is better.
pub fn composite_score(candidate: &Candidate) -> f64 {
    let d = &candidate.diagnostics;
    let w = CompositeWeights::for_sample_size(d.n_obs);
    let parts = [
        finite_or_neg_inf(d.r2),
        finite_or_neg_inf(d.adj_r2),
        finite_or_neg_inf(-d.aicc),
        finite_or_neg_inf(-d.bic),
    ];
    if parts.iter().any(|p| p.is_infinite()) {
        return f64::NEG_INFINITY;
    }
    w.r2 * parts[0] + w.adj_r2 * parts[1] + w.aicc * parts[2] + w.bic * parts[3]
}

/// A candidate with its position in a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// 1-based rank
    pub rank: usize,
    /// Score the ranking sorted on
    pub score: f64,
    /// Composite score
    pub composite: f64,
    /// The candidate
    pub candidate: Candidate,
}

fn ranked_by(candidates: Vec<Candidate>, score: impl Fn(&Candidate) -> f64) -> Vec<RankedCandidate> {
    let mut scored: Vec<(f64, Candidate)> = candidates.into_iter().map(|c| (score(&c), c)).collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored
        .into_iter()
        .enumerate()
        .map(|(i, (score, candidate))| RankedCandidate {
            rank: i + 1,
            score,
            composite: composite_score(&candidate),
            candidate,
        })
        .collect()
}

/// Rank best first on the mode's fit metric. Ties keep input order.
pub fn rank(candidates: Vec<Candidate>, mode: AnalysisMode) -> Vec<RankedCandidate> {
    ranked_by(candidates, |c| selection_score(c, mode))
}

/// Rank best first on the composite score. Ties keep input order.
pub fn rank_by_composite(candidates: Vec<Candidate>) -> Vec<RankedCandidate> {
    ranked_by(candidates, composite_score)
}
