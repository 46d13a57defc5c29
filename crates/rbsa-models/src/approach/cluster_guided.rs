//! Approach D: stepwise selection over cluster medoids.
//!
//! For every cluster count in `[k_min, k_max]` the universe is clustered on
//! correlation distance, one medoid is drawn per cluster and stepwise
//! selection runs on the medoids. The lowest-RMSE fit wins; ties keep the
//! smaller cluster count.

use super::stepwise::StepwiseSelector;
use crate::candidate::{Approach, Candidate, StyleEstimator};
use crate::clustering::{cluster, correlation_distance, medoid};
use crate::config::ClusterConfig;
use crate::error::ModelError;
use rayon::prelude::*;
use rbsa_data::{ReturnMatrix, ReturnSeries};
use tracing::{debug, info};

/// Cluster-guided selector.
#[derive(Debug, Clone, Default)]
pub struct ClusterGuidedSelector {
    config: ClusterConfig,
}

impl ClusterGuidedSelector {
    /// Create a new selector with the given configuration
    pub const fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    /// Selector configuration.
    pub const fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Medoid asset names for `k` clusters.
    pub fn medoids(&self, assets: &ReturnMatrix, k: usize) -> Vec<String> {
        let corr = assets.correlation();
        let dist = correlation_distance(&corr);
        cluster(&dist, self.config.linkage, k)
            .iter()
            .filter_map(|group| medoid(&corr, group))
            .map(|j| assets.names()[j].clone())
            .collect()
    }

    /// One candidate per evaluated cluster count, ascending.
    ///
    /// Counts above the universe size collapse to the universe size.
    ///
    /// # Errors
    /// [`ModelError::InvalidParameter`] for an empty cluster range.
    pub fn sweep(&self, assets: &ReturnMatrix, fund: &ReturnSeries) -> Result<Vec<Candidate>, ModelError> {
        let ClusterConfig { k_min, k_max, .. } = self.config;
        if k_min == 0 || k_min > k_max {
            return Err(ModelError::InvalidParameter(format!(
                "cluster range [{k_min}, {k_max}] is empty"
            )));
        }
        let n = assets.n_assets();
        if n == 0 {
            let none: [&str; 0] = [];
            return Ok(vec![Candidate::fit(
                Approach::ClusterGuided,
                assets,
                fund,
                &none,
                self.config.stepwise.sum_to_one,
            )?]);
        }
        let upper = k_max.min(n);
        let lower = k_min.min(upper);

        let stepwise = StepwiseSelector::new(self.config.stepwise);
        (lower..=upper)
            .into_par_iter()
            .map(|k| -> Result<Candidate, ModelError> {
                let medoids = self.medoids(assets, k);
                let subset = assets.select(&medoids)?;
                let selection = stepwise.select(&subset, fund)?;
                let candidate = Candidate::fit(
                    Approach::ClusterGuided,
                    assets,
                    fund,
                    &selection.selected,
                    self.config.stepwise.sum_to_one,
                )?
                .with_cluster_count(k);
                debug!(
                    k,
                    ?medoids,
                    rmse = candidate.diagnostics.rmse,
                    "cluster count evaluated"
                );
                Ok(candidate)
            })
            .collect()
    }
}

impl StyleEstimator for ClusterGuidedSelector {
    fn approach(&self) -> Approach {
        Approach::ClusterGuided
    }

    fn fit(&self, assets: &ReturnMatrix, fund: &ReturnSeries) -> Result<Candidate, ModelError> {
        let mut best: Option<Candidate> = None;
        for candidate in self.sweep(assets, fund)? {
            let rmse = rmse_or_inf(&candidate);
            if best.as_ref().is_none_or(|b| rmse < rmse_or_inf(b)) {
                best = Some(candidate);
            }
        }
        let best = best.ok_or_else(|| {
            ModelError::InvalidParameter("cluster sweep produced no candidate".to_string())
        })?;
        info!(
            k = ?best.cluster_count,
            assets = best.n_assets(),
            rmse = best.diagnostics.rmse,
            "cluster-guided selection complete"
        );
        Ok(best)
    }
}

fn rmse_or_inf(candidate: &Candidate) -> f64 {
    let rmse = candidate.diagnostics.rmse;
    if rmse.is_nan() { f64::INFINITY } else { rmse }
}
