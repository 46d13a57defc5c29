//! Typed configuration for the style estimation approaches.
//!
//! Hosts usually hold the flat option bundle ([`StyleOptions`]) and derive
//! the per-approach configs from it with [`ModelConfig::from_options`].
//! Validation happens once, in [`ModelConfig::validate`].

use crate::clustering::Linkage;
use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// Metric used to compare fits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Higher R² is better
    #[default]
    InSample,
    /// Lower RMSE is better
    Prediction,
}

/// Flat option bundle as supplied by a host configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StyleOptions {
    /// Maximum number of assets chosen by stepwise selection (default: 6)
    pub max_subset_size: usize,
    /// Drop the budget constraint so weights may sum below one (default: false)
    pub allow_cash_less_than_one: bool,
    /// Minimum metric improvement to accept another asset (default: 1e-3)
    pub stepwise_epsilon: f64,
    /// Elastic-net mixing values to test (default: [0.1, 0.5, 0.7, 0.9, 0.95, 1.0])
    pub alpha_grid: Vec<f64>,
    /// Penalty strengths per mixing value (default: 100)
    pub lambda_grid_points: usize,
    /// Total MCMC iterations (default: 5000)
    pub mcmc_samples: usize,
    /// Discarded MCMC iterations (default: 1000)
    pub mcmc_burnin: usize,
    /// Posterior inclusion probability needed for selection (default: 0.5)
    pub pip_threshold: f64,
    /// MCMC random seed (default: 42)
    pub mcmc_seed: u64,
    /// Smallest cluster count (default: 2)
    pub cluster_k_min: usize,
    /// Largest cluster count (default: 6)
    pub cluster_k_max: usize,
    /// Linkage criterion (default: average)
    pub linkage: Linkage,
    /// Fit comparison metric (default: in_sample)
    pub analysis_mode: AnalysisMode,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            max_subset_size: 6,
            allow_cash_less_than_one: false,
            stepwise_epsilon: 1e-3,
            alpha_grid: vec![0.1, 0.5, 0.7, 0.9, 0.95, 1.0],
            lambda_grid_points: 100,
            mcmc_samples: 5000,
            mcmc_burnin: 1000,
            pip_threshold: 0.5,
            mcmc_seed: 42,
            cluster_k_min: 2,
            cluster_k_max: 6,
            linkage: Linkage::Average,
            analysis_mode: AnalysisMode::InSample,
        }
    }
}

/// Constrained stepwise selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StepwiseConfig {
    /// Maximum subset size (default: 6)
    pub max_subset_size: usize,
    /// Required improvement per round (default: 1e-3)
    pub epsilon: f64,
    /// Fit metric (default: in-sample R²)
    pub mode: AnalysisMode,
    /// Weights sum to one (default: true)
    pub sum_to_one: bool,
}

impl Default for StepwiseConfig {
    fn default() -> Self {
        Self {
            max_subset_size: 6,
            epsilon: 1e-3,
            mode: AnalysisMode::InSample,
            sum_to_one: true,
        }
    }
}

/// Elastic-net guided selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegularizedConfig {
    /// L1 mixing values; 0 (pure ridge) is skipped (default: [0.1, 0.5, 0.7, 0.9, 0.95, 1.0])
    pub alpha_grid: Vec<f64>,
    /// Penalty strengths on the log grid (default: 100)
    pub lambda_grid_points: usize,
    /// Ratio of smallest to largest penalty (default: 1e-3)
    pub lambda_min_ratio: f64,
    /// Cross-validation folds (default: 5)
    pub cv_folds: usize,
    /// Coordinate-descent sweeps per fit (default: 10000)
    pub max_iter: usize,
    /// Coordinate-descent convergence tolerance (default: 1e-4)
    pub tolerance: f64,
    /// Fraction of mixing values that must select an asset (default: 0.5)
    pub vote_fraction: f64,
    /// Weights sum to one in the refit (default: true)
    pub sum_to_one: bool,
}

impl Default for RegularizedConfig {
    fn default() -> Self {
        Self {
            alpha_grid: vec![0.1, 0.5, 0.7, 0.9, 0.95, 1.0],
            lambda_grid_points: 100,
            lambda_min_ratio: 1e-3,
            cv_folds: 5,
            max_iter: 10_000,
            tolerance: 1e-4,
            vote_fraction: 0.5,
            sum_to_one: true,
        }
    }
}

/// Bayesian spike-and-slab sampling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BayesianConfig {
    /// Total iterations (default: 5000)
    pub samples: usize,
    /// Discarded leading iterations (default: 1000)
    pub burnin: usize,
    /// Selection threshold on the inclusion probability (default: 0.5)
    pub pip_threshold: f64,
    /// Prior inclusion probability per asset (default: 0.3)
    pub prior_inclusion: f64,
    /// Inverse-gamma shape of the residual variance prior (default: 2.0)
    pub variance_shape: f64,
    /// Inverse-gamma scale of the residual variance prior (default: 0.01)
    pub variance_scale: f64,
    /// Initial residual variance (default: 0.001)
    pub initial_variance: f64,
    /// Dirichlet proposal concentration multiplier (default: 100)
    pub proposal_concentration: f64,
    /// Dirichlet proposal concentration floor (default: 0.1)
    pub proposal_floor: f64,
    /// Random seed (default: 42)
    pub seed: u64,
}

impl Default for BayesianConfig {
    fn default() -> Self {
        Self {
            samples: 5000,
            burnin: 1000,
            pip_threshold: 0.5,
            prior_inclusion: 0.3,
            variance_shape: 2.0,
            variance_scale: 0.01,
            initial_variance: 0.001,
            proposal_concentration: 100.0,
            proposal_floor: 0.1,
            seed: 42,
        }
    }
}

/// Cluster-guided selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ClusterConfig {
    /// Smallest cluster count (default: 2)
    pub k_min: usize,
    /// Largest cluster count (default: 6)
    pub k_max: usize,
    /// Linkage criterion (default: average)
    pub linkage: Linkage,
    /// Stepwise selection run on each medoid set
    pub stepwise: StepwiseConfig,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            k_min: 2,
            k_max: 6,
            linkage: Linkage::Average,
            stepwise: StepwiseConfig::default(),
        }
    }
}

/// Configuration for all four approaches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ModelConfig {
    /// Constrained stepwise selection
    pub stepwise: StepwiseConfig,
    /// Elastic-net guided selection
    pub regularized: RegularizedConfig,
    /// Bayesian spike-and-slab sampling
    pub bayesian: BayesianConfig,
    /// Cluster-guided selection
    pub cluster: ClusterConfig,
}

impl ModelConfig {
    /// Derive per-approach configs from the flat option bundle.
    pub fn from_options(options: &StyleOptions) -> Self {
        let sum_to_one = !options.allow_cash_less_than_one;
        let stepwise = StepwiseConfig {
            max_subset_size: options.max_subset_size,
            epsilon: options.stepwise_epsilon,
            mode: options.analysis_mode,
            sum_to_one,
        };
        Self {
            stepwise,
            regularized: RegularizedConfig {
                alpha_grid: options.alpha_grid.clone(),
                lambda_grid_points: options.lambda_grid_points,
                sum_to_one,
                ..RegularizedConfig::default()
            },
            bayesian: BayesianConfig {
                samples: options.mcmc_samples,
                burnin: options.mcmc_burnin,
                pip_threshold: options.pip_threshold,
                seed: options.mcmc_seed,
                ..BayesianConfig::default()
            },
            cluster: ClusterConfig {
                k_min: options.cluster_k_min,
                k_max: options.cluster_k_max,
                linkage: options.linkage,
                stepwise,
            },
        }
    }

    /// Parse a JSON document holding a [`StyleOptions`] bundle.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let options: StyleOptions = serde_json::from_str(json)?;
        let config = Self::from_options(&options);
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter range.
    pub fn validate(&self) -> Result<(), ModelError> {
        let invalid = |msg: String| Err(ModelError::InvalidParameter(msg));

        for step in [&self.stepwise, &self.cluster.stepwise] {
            if step.max_subset_size == 0 {
                return invalid("max_subset_size must be at least 1".to_string());
            }
            if !(step.epsilon >= 0.0) {
                return invalid(format!("stepwise_epsilon must be >= 0, got {}", step.epsilon));
            }
        }

        let reg = &self.regularized;
        if reg.alpha_grid.iter().any(|a| !(0.0..=1.0).contains(a)) {
            return invalid(format!("alpha_grid values must be in [0, 1], got {:?}", reg.alpha_grid));
        }
        if !reg.alpha_grid.iter().any(|&a| a > 0.0) {
            return invalid("alpha_grid needs at least one value above 0".to_string());
        }
        if reg.lambda_grid_points == 0 {
            return invalid("lambda_grid_points must be at least 1".to_string());
        }
        if reg.cv_folds < 2 {
            return invalid(format!("cv_folds must be at least 2, got {}", reg.cv_folds));
        }
        if !(reg.lambda_min_ratio > 0.0 && reg.lambda_min_ratio < 1.0) {
            return invalid(format!(
                "lambda_min_ratio must be in (0, 1), got {}",
                reg.lambda_min_ratio
            ));
        }

        let bayes = &self.bayesian;
        if bayes.burnin >= bayes.samples {
            return invalid(format!(
                "mcmc_burnin ({}) must be smaller than mcmc_samples ({})",
                bayes.burnin, bayes.samples
            ));
        }
        if !(0.0..=1.0).contains(&bayes.pip_threshold) {
            return invalid(format!("pip_threshold must be in [0, 1], got {}", bayes.pip_threshold));
        }
        if !(bayes.prior_inclusion > 0.0 && bayes.prior_inclusion < 1.0) {
            return invalid(format!(
                "prior_inclusion must be in (0, 1), got {}",
                bayes.prior_inclusion
            ));
        }
        if !(bayes.variance_shape > 0.0 && bayes.variance_scale > 0.0 && bayes.initial_variance > 0.0)
        {
            return invalid("variance prior parameters must be positive".to_string());
        }
        if !(bayes.proposal_concentration > 0.0 && bayes.proposal_floor > 0.0) {
            return invalid("proposal concentration must be positive".to_string());
        }

        let cluster = &self.cluster;
        if cluster.k_min == 0 || cluster.k_min > cluster.k_max {
            return invalid(format!(
                "cluster range [{}, {}] is empty",
                cluster.k_min, cluster.k_max
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ModelConfig::from_options(&StyleOptions::default());
        assert!(config.validate().is_ok());
        assert!(config.stepwise.sum_to_one);
        assert_eq!(config.bayesian.seed, 42);
        assert_eq!(config.cluster.linkage, Linkage::Average);
    }

    #[test]
    fn test_mcmc_seed_reaches_sampler() {
        let config = ModelConfig::from_json(r#"{"mcmc_seed": 7}"#).unwrap();
        assert_eq!(config.bayesian.seed, 7);
    }

    #[test]
    fn test_allow_cash_disables_budget() {
        let options = StyleOptions {
            allow_cash_less_than_one: true,
            ..Default::default()
        };
        let config = ModelConfig::from_options(&options);
        assert!(!config.stepwise.sum_to_one);
        assert!(!config.regularized.sum_to_one);
        assert!(!config.cluster.stepwise.sum_to_one);
    }

    #[test]
    fn test_burnin_must_be_below_samples() {
        let options = StyleOptions {
            mcmc_samples: 100,
            mcmc_burnin: 100,
            ..Default::default()
        };
        assert!(ModelConfig::from_options(&options).validate().is_err());
    }

    #[test]
    fn test_from_json_partial_document() {
        let config = ModelConfig::from_json(
            r#"{"max_subset_size": 3, "analysis_mode": "prediction", "linkage": "ward"}"#,
        )
        .unwrap();
        assert_eq!(config.stepwise.max_subset_size, 3);
        assert_eq!(config.stepwise.mode, AnalysisMode::Prediction);
        assert_eq!(config.cluster.linkage, Linkage::Ward);
        assert_eq!(config.regularized.lambda_grid_points, 100);
    }

    #[test]
    fn test_invalid_cluster_range() {
        let options = StyleOptions {
            cluster_k_min: 5,
            cluster_k_max: 2,
            ..Default::default()
        };
        assert!(ModelConfig::from_options(&options).validate().is_err());
    }
}
