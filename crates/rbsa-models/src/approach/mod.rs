//! The four style estimation approaches.
//!
//! Each approach implements [`StyleEstimator`] and ends with a constrained
//! refit of the assets it selected:
//!
//! - [`StepwiseSelector`]: greedy forward selection on R² or RMSE
//! - [`RegularizedSelector`]: elastic-net votes across L1 mixing values
//! - [`SpikeSlabSampler`]: posterior inclusion probabilities by MCMC
//! - [`ClusterGuidedSelector`]: stepwise over correlation-cluster medoids

pub mod bayesian;
pub mod cluster_guided;
pub mod elastic_net;
pub mod regularized;
pub mod stepwise;

pub use bayesian::{PosteriorSamples, PosteriorSummary, SpikeSlabSampler};
pub use cluster_guided::ClusterGuidedSelector;
pub use regularized::RegularizedSelector;
pub use stepwise::{StepwiseSelection, StepwiseSelector};

use crate::candidate::{Approach, StyleEstimator};
use crate::config::ModelConfig;

/// Estimator for `approach` configured from `config`.
pub fn estimator(approach: Approach, config: &ModelConfig) -> Box<dyn StyleEstimator + Send + Sync> {
    match approach {
        Approach::Stepwise => Box::new(StepwiseSelector::new(config.stepwise)),
        Approach::Regularized => Box::new(RegularizedSelector::new(config.regularized.clone())),
        Approach::Bayesian => Box::new(SpikeSlabSampler::new(config.bayesian)),
        Approach::ClusterGuided => Box::new(ClusterGuidedSelector::new(config.cluster)),
    }
}
