//! Approach B: elastic-net guided selection with a constrained refit.
//!
//! Each L1 mixing value gets its own cross-validated elastic net on
//! standardized asset returns. An asset survives when enough mixing values
//! keep it nonzero; the survivors are refit with the constrained optimizer.

use super::elastic_net::{ElasticNetCv, standardize};
use crate::candidate::{Approach, Candidate, StyleEstimator};
use crate::config::RegularizedConfig;
use crate::error::ModelError;
use rayon::prelude::*;
use rbsa_data::{ReturnMatrix, ReturnSeries};
use tracing::{debug, info};

/// Coefficients at or below this magnitude count as zero.
pub const SELECTION_THRESHOLD: f64 = 1e-10;

/// Votes gathered across the mixing grid.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteTally {
    /// Mixing values actually fitted
    pub tested: Vec<f64>,
    /// Votes per asset, in universe order
    pub votes: Vec<usize>,
    /// Minimum votes needed to keep an asset
    pub threshold: usize,
    /// Coefficients of the last fitted mixing value
    pub last_coefficients: Vec<f64>,
}

/// Elastic-net guided selector.
#[derive(Debug, Clone, Default)]
pub struct RegularizedSelector {
    config: RegularizedConfig,
}

impl RegularizedSelector {
    /// Create a new selector with the given configuration
    pub const fn new(config: RegularizedConfig) -> Self {
        Self { config }
    }

    /// Selector configuration.
    pub const fn config(&self) -> &RegularizedConfig {
        &self.config
    }

    /// Fit every mixing value and count how often each asset is kept.
    ///
    /// # Errors
    /// [`ModelError::InvalidParameter`] when no mixing value is above zero,
    /// plus the elastic-net fitting errors.
    pub fn tally(&self, assets: &ReturnMatrix, fund: &ReturnSeries) -> Result<VoteTally, ModelError> {
        let tested: Vec<f64> = self
            .config
            .alpha_grid
            .iter()
            .copied()
            .filter(|&a| a > 0.0)
            .collect();
        if tested.is_empty() {
            return Err(ModelError::InvalidParameter(
                "alpha_grid has no value above 0".to_string(),
            ));
        }

        let x = standardize(assets.values());
        let y = fund.values();
        let fits = tested
            .par_iter()
            .map(|&l1_ratio| {
                ElasticNetCv {
                    l1_ratio,
                    n_lambdas: self.config.lambda_grid_points,
                    lambda_min_ratio: self.config.lambda_min_ratio,
                    folds: self.config.cv_folds,
                    max_iter: self.config.max_iter,
                    tolerance: self.config.tolerance,
                }
                .fit(&x, y)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut votes = vec![0; assets.n_assets()];
        for (l1_ratio, fit) in tested.iter().zip(&fits) {
            let kept: Vec<&str> = fit
                .coefficients
                .iter()
                .zip(assets.names())
                .filter(|(c, _)| c.abs() > SELECTION_THRESHOLD)
                .map(|(_, name)| name.as_str())
                .collect();
            debug!(l1_ratio, ?kept, "elastic net selection");
            for (v, c) in votes.iter_mut().zip(fit.coefficients.iter()) {
                if c.abs() > SELECTION_THRESHOLD {
                    *v += 1;
                }
            }
        }

        let threshold = ((self.config.vote_fraction * tested.len() as f64).ceil() as usize).max(1);
        let last_coefficients = fits
            .last()
            .map(|f| f.coefficients.to_vec())
            .unwrap_or_default();
        Ok(VoteTally {
            tested,
            votes,
            threshold,
            last_coefficients,
        })
    }

    /// Assets kept by the vote, falling back to the largest last coefficient.
    pub fn select(&self, assets: &ReturnMatrix, fund: &ReturnSeries) -> Result<Vec<String>, ModelError> {
        if assets.n_assets() == 0 {
            return Ok(Vec::new());
        }
        let tally = self.tally(assets, fund)?;
        let kept: Vec<String> = tally
            .votes
            .iter()
            .zip(assets.names())
            .filter(|(v, _)| **v >= tally.threshold)
            .map(|(_, name)| name.clone())
            .collect();
        if !kept.is_empty() {
            return Ok(kept);
        }

        let fallback = tally
            .last_coefficients
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (j, c)| match best {
                Some((_, b)) if b >= c.abs() => best,
                _ => Some((j, c.abs())),
            })
            .map(|(j, _)| assets.names()[j].clone());
        debug!(?fallback, "no asset reached the vote threshold");
        Ok(fallback.into_iter().collect())
    }
}

impl StyleEstimator for RegularizedSelector {
    fn approach(&self) -> Approach {
        Approach::Regularized
    }

    fn fit(&self, assets: &ReturnMatrix, fund: &ReturnSeries) -> Result<Candidate, ModelError> {
        if assets.n_obs() != fund.len() {
            return Err(ModelError::DimensionMismatch {
                expected: assets.n_obs(),
                actual: fund.len(),
            });
        }
        let selected = self.select(assets, fund)?;
        let candidate = Candidate::fit(
            Approach::Regularized,
            assets,
            fund,
            &selected,
            self.config.sum_to_one,
        )?;
        info!(
            assets = candidate.n_assets(),
            r2 = candidate.diagnostics.r2,
            "regularized selection complete"
        );
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::tests::{lcg_returns, mixed_fund, universe};
    use rstest::rstest;

    #[test]
    fn test_selects_true_components() {
        let assets = universe(&["SPY", "AGG", "EFA", "GLD", "IWM", "TLT"], 120);
        let fund = mixed_fund(&assets, &[("SPY", 0.5), ("GLD", 0.5)]);
        let c = RegularizedSelector::default().fit(&assets, &fund).unwrap();
        assert!(c.selected.contains(&"SPY".to_string()));
        assert!(c.selected.contains(&"GLD".to_string()));
        assert!(c.diagnostics.r2 > 0.99);
        assert!((c.weights.total() - 1.0).abs() < 1e-6);
    }

    #[rstest]
    #[case(1, 1)]
    #[case(2, 1)]
    #[case(5, 3)]
    #[case(6, 3)]
    fn test_vote_threshold(#[case] grid_len: usize, #[case] expected: usize) {
        let assets = universe(&["SPY", "AGG"], 40);
        let fund = mixed_fund(&assets, &[("SPY", 1.0)]);
        let selector = RegularizedSelector::new(RegularizedConfig {
            alpha_grid: vec![0.5; grid_len],
            lambda_grid_points: 10,
            ..Default::default()
        });
        let tally = selector.tally(&assets, &fund).unwrap();
        assert_eq!(tally.threshold, expected);
        assert_eq!(tally.tested.len(), grid_len);
    }

    #[test]
    fn test_pure_ridge_is_skipped() {
        let assets = universe(&["SPY", "AGG"], 40);
        let fund = mixed_fund(&assets, &[("SPY", 1.0)]);
        let selector = RegularizedSelector::new(RegularizedConfig {
            alpha_grid: vec![0.0, 1.0],
            lambda_grid_points: 10,
            ..Default::default()
        });
        assert_eq!(selector.tally(&assets, &fund).unwrap().tested, vec![1.0]);

        let ridge_only = RegularizedSelector::new(RegularizedConfig {
            alpha_grid: vec![0.0],
            ..Default::default()
        });
        assert!(matches!(
            ridge_only.tally(&assets, &fund),
            Err(ModelError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_unrelated_fund_still_selects_something() {
        let assets = universe(&["SPY", "AGG", "EFA"], 60);
        let noise = lcg_returns(1234, 60);
        let fund = ReturnSeries::new("FUND", assets.dates().to_vec(), noise).unwrap();
        let selected = RegularizedSelector::default().select(&assets, &fund).unwrap();
        assert!(!selected.is_empty());
    }
}
