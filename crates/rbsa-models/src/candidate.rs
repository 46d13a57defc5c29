//! Fitted style allocations.

use crate::approach::bayesian::PosteriorSummary;
use crate::diagnostics::Diagnostics;
use crate::error::ModelError;
use crate::hac::HacEstimator;
use crate::optimizer::{ConstrainedOptimizer, OptimizerConfig, SolverStatus};
use ndarray::{Array1, Array2};
use rbsa_data::{ReturnMatrix, ReturnSeries};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Estimation approach that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approach {
    /// Constrained forward stepwise selection
    Stepwise,
    /// Elastic-net selection with constrained refit
    Regularized,
    /// Spike-and-slab MCMC
    Bayesian,
    /// Correlation clustering, one medoid per cluster
    ClusterGuided,
}

impl Approach {
    /// All approaches in report order.
    pub const ALL: [Self; 4] = [
        Self::Stepwise,
        Self::Regularized,
        Self::Bayesian,
        Self::ClusterGuided,
    ];

    /// Single-letter report label.
    pub const fn letter(self) -> char {
        match self {
            Self::Stepwise => 'A',
            Self::Regularized => 'B',
            Self::Bayesian => 'C',
            Self::ClusterGuided => 'D',
        }
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Method {}", self.letter())
    }
}

/// One asset and its allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetWeight {
    /// Asset name
    pub asset: String,
    /// Non-negative weight
    pub weight: f64,
}

/// Ordered asset to weight mapping.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightVector(Vec<AssetWeight>);

impl WeightVector {
    /// Pair names with weights.
    ///
    /// # Errors
    /// [`ModelError::DimensionMismatch`] when the lengths differ.
    pub fn from_parts<S: AsRef<str>>(names: &[S], weights: &Array1<f64>) -> Result<Self, ModelError> {
        if names.len() != weights.len() {
            return Err(ModelError::DimensionMismatch {
                expected: names.len(),
                actual: weights.len(),
            });
        }
        Ok(Self(
            names
                .iter()
                .zip(weights.iter())
                .map(|(name, &weight)| AssetWeight {
                    asset: name.as_ref().to_string(),
                    weight,
                })
                .collect(),
        ))
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no assets.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &AssetWeight> {
        self.0.iter()
    }

    /// Weight of `asset`, if present.
    pub fn get(&self, asset: &str) -> Option<f64> {
        self.0.iter().find(|w| w.asset == asset).map(|w| w.weight)
    }

    /// Asset names in order.
    pub fn assets(&self) -> Vec<String> {
        self.0.iter().map(|w| w.asset.clone()).collect()
    }

    /// Weights in order.
    pub fn values(&self) -> Array1<f64> {
        self.0.iter().map(|w| w.weight).collect()
    }

    /// Sum of the weights.
    pub fn total(&self) -> f64 {
        self.0.iter().map(|w| w.weight).sum()
    }
}

/// How a candidate's asset list was rewritten after fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubstitutionRecord {
    /// Components replaced by their composite
    Consolidation {
        /// Replaced components
        from: Vec<String>,
        /// Composite asset
        to: String,
        /// Adjusted R² after the replacement
        adj_r2: f64,
    },
    /// Composite replaced by its components
    Expansion {
        /// Replaced composite
        from: String,
        /// Component assets
        to: Vec<String>,
    },
}

/// A fitted style allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Producing approach
    pub approach: Approach,
    /// Selected assets, in selection order
    pub selected: Vec<String>,
    /// Weights of the selected assets
    pub weights: WeightVector,
    /// Fitted fund returns
    pub fitted: Array1<f64>,
    /// Fund returns minus fitted returns
    pub residuals: Array1<f64>,
    /// Fit statistics
    pub diagnostics: Diagnostics,
    /// Selection before substitution
    pub original_selected: Vec<String>,
    /// Substitutions applied, in order
    pub substitutions_applied: Vec<SubstitutionRecord>,
    /// Cluster count that produced the candidate (cluster-guided only)
    pub cluster_count: Option<usize>,
    /// Posterior summary over the whole universe (Bayesian only)
    pub posterior: Option<PosteriorSummary>,
    /// Status of the final refit
    pub solver_status: SolverStatus,
    /// Newey-West standard errors of the weights
    pub standard_errors: Option<Array1<f64>>,
}

impl Candidate {
    /// Refit `selected` against the fund with the constrained optimizer.
    ///
    /// An empty selection yields empty weights, zero fitted values and
    /// residuals equal to the fund returns.
    ///
    /// # Errors
    /// Unknown asset names and length mismatches between `fund` and
    /// `assets`.
    pub fn fit<S: AsRef<str>>(
        approach: Approach,
        assets: &ReturnMatrix,
        fund: &ReturnSeries,
        selected: &[S],
        sum_to_one: bool,
    ) -> Result<Self, ModelError> {
        check_lengths(assets, fund)?;
        let x = assets.design(selected)?;
        let y = fund.values();
        let output = ConstrainedOptimizer::new(OptimizerConfig::with_sum_to_one(sum_to_one))
            .solve(&x, y)?;
        let weights = WeightVector::from_parts(selected, &output.weights)?;
        Ok(Self::assemble(approach, &x, y, weights, output.status))
    }

    /// Evaluate fixed weights without re-optimizing.
    ///
    /// # Errors
    /// Unknown asset names and length mismatches between `fund` and
    /// `assets`.
    pub fn from_weights(
        approach: Approach,
        assets: &ReturnMatrix,
        fund: &ReturnSeries,
        weights: WeightVector,
    ) -> Result<Self, ModelError> {
        check_lengths(assets, fund)?;
        let x = assets.design(&weights.assets())?;
        Ok(Self::assemble(
            approach,
            &x,
            fund.values(),
            weights,
            SolverStatus::Converged { iterations: 0 },
        ))
    }

    fn assemble(
        approach: Approach,
        x: &Array2<f64>,
        y: &Array1<f64>,
        weights: WeightVector,
        solver_status: SolverStatus,
    ) -> Self {
        let w = weights.values();
        let fitted = x.dot(&w);
        let residuals = y - &fitted;
        let k = weights.len();
        let diagnostics = Diagnostics::from_residuals(y.view(), residuals.view(), k);
        let standard_errors = if k > 0 {
            HacEstimator::default().standard_errors(x, &residuals).ok()
        } else {
            None
        };
        let selected = weights.assets();
        Self {
            approach,
            original_selected: selected.clone(),
            selected,
            weights,
            fitted,
            residuals,
            diagnostics,
            substitutions_applied: Vec::new(),
            cluster_count: None,
            posterior: None,
            solver_status,
            standard_errors,
        }
    }

    /// Tag with the cluster count that produced this candidate.
    pub fn with_cluster_count(mut self, k: usize) -> Self {
        self.cluster_count = Some(k);
        self
    }

    /// Attach a posterior summary.
    pub fn with_posterior(mut self, posterior: PosteriorSummary) -> Self {
        self.posterior = Some(posterior);
        self
    }

    /// Number of selected assets.
    pub fn n_assets(&self) -> usize {
        self.selected.len()
    }

    /// Whether substitution changed this candidate.
    pub fn is_substituted(&self) -> bool {
        !self.substitutions_applied.is_empty()
    }
}

fn check_lengths(assets: &ReturnMatrix, fund: &ReturnSeries) -> Result<(), ModelError> {
    if assets.n_obs() != fund.len() {
        return Err(ModelError::DimensionMismatch {
            expected: assets.n_obs(),
            actual: fund.len(),
        });
    }
    Ok(())
}

/// A style estimation approach.
pub trait StyleEstimator {
    /// Approach implemented by this estimator.
    fn approach(&self) -> Approach;

    /// Estimate the fund's style from the asset universe.
    ///
    /// # Arguments
    /// * `assets` - Aligned, cleaned asset returns
    /// * `fund` - Fund returns on the same dates
    fn fit(&self, assets: &ReturnMatrix, fund: &ReturnSeries) -> Result<Candidate, ModelError>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    /// Month-end dates starting January 2015.
    pub(crate) fn monthly_dates(n: usize) -> Vec<NaiveDate> {
        (0..n)
            .map(|i| {
                let year = 2015 + (i / 12) as i32;
                let month = (i % 12) as u32 + 1;
                NaiveDate::from_ymd_opt(year, month, 28).unwrap()
            })
            .collect()
    }

    /// Deterministic pseudo-random returns in [-0.05, 0.05).
    pub(crate) fn lcg_returns(seed: u64, n: usize) -> Vec<f64> {
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 11) as f64 / (1u64 << 53) as f64 - 0.5) * 0.1
            })
            .collect()
    }

    /// Asset universe built from named LCG columns.
    pub(crate) fn universe(names: &[&str], n: usize) -> ReturnMatrix {
        let mut values = Array2::zeros((n, names.len()));
        for (j, _) in names.iter().enumerate() {
            let col = lcg_returns(j as u64 + 1, n);
            for (i, v) in col.into_iter().enumerate() {
                values[[i, j]] = v;
            }
        }
        ReturnMatrix::new(
            monthly_dates(n),
            names.iter().map(|s| s.to_string()).collect(),
            values,
        )
        .unwrap()
    }

    /// Fund series mixing universe columns with the given weights.
    pub(crate) fn mixed_fund(assets: &ReturnMatrix, mix: &[(&str, f64)]) -> ReturnSeries {
        let mut y = Array1::zeros(assets.n_obs());
        for (name, w) in mix {
            y = y + &assets.column(name).unwrap().mapv(|v| v * w);
        }
        ReturnSeries::new("FUND", assets.dates().to_vec(), y.to_vec()).unwrap()
    }

    #[test]
    fn test_fit_recovers_mix() {
        let assets = universe(&["SPY", "AGG", "EFA"], 60);
        let fund = mixed_fund(&assets, &[("SPY", 0.6), ("AGG", 0.4)]);
        let c = Candidate::fit(Approach::Stepwise, &assets, &fund, &["SPY", "AGG"], true).unwrap();
        assert_relative_eq!(c.weights.get("SPY").unwrap(), 0.6, epsilon = 1e-6);
        assert_relative_eq!(c.weights.get("AGG").unwrap(), 0.4, epsilon = 1e-6);
        assert_relative_eq!(c.diagnostics.r2, 1.0, epsilon = 1e-8);
        assert_eq!(c.original_selected, c.selected);
        assert!(c.substitutions_applied.is_empty());
        assert!(c.standard_errors.is_some());
    }

    #[test]
    fn test_empty_selection() {
        let assets = universe(&["SPY", "AGG"], 24);
        let fund = mixed_fund(&assets, &[("SPY", 1.0)]);
        let none: [&str; 0] = [];
        let c = Candidate::fit(Approach::Bayesian, &assets, &fund, &none, true).unwrap();
        assert!(c.weights.is_empty());
        assert!(c.fitted.iter().all(|&v| v == 0.0));
        assert_eq!(c.residuals, *fund.values());
        assert!(c.diagnostics.r2.is_nan());
        assert!(c.standard_errors.is_none());
    }

    #[test]
    fn test_unknown_asset_is_error() {
        let assets = universe(&["SPY"], 12);
        let fund = mixed_fund(&assets, &[("SPY", 1.0)]);
        assert!(Candidate::fit(Approach::Stepwise, &assets, &fund, &["QQQ"], true).is_err());
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let assets = universe(&["SPY"], 12);
        let short = universe(&["SPY"], 10);
        let fund = mixed_fund(&short, &[("SPY", 1.0)]);
        assert!(matches!(
            Candidate::fit(Approach::Stepwise, &assets, &fund, &["SPY"], true),
            Err(ModelError::DimensionMismatch { expected: 12, actual: 10 })
        ));
    }

    #[test]
    fn test_weight_vector_serializes_as_list() {
        let w = WeightVector::from_parts(&["IWB"], &ndarray::array![1.0]).unwrap();
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, r#"[{"asset":"IWB","weight":1.0}]"#);
    }

    #[test]
    fn test_substitution_record_tag() {
        let rec = SubstitutionRecord::Expansion {
            from: "IWB".to_string(),
            to: vec!["IWF".to_string(), "IWD".to_string()],
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["type"], "expansion");
        assert_eq!(Approach::ClusterGuided.to_string(), "Method D");
    }
}
