//! Approach A: constrained forward stepwise selection.
//!
//! Starting from the empty set, every round refits the current selection
//! plus each unselected asset and keeps the best trial. The first round is
//! accepted unconditionally. Later rounds must beat the running best by
//! more than `epsilon` (R² up in-sample, RMSE down in prediction mode).

use crate::candidate::{Approach, Candidate, StyleEstimator};
use crate::config::{AnalysisMode, StepwiseConfig};
use crate::diagnostics::r_squared;
use crate::error::ModelError;
use crate::optimizer::{ConstrainedOptimizer, OptimizerConfig};
use ndarray::{Array1, Axis};
use rbsa_data::{ReturnMatrix, ReturnSeries};
use tracing::{debug, info};

/// Outcome of the greedy search, before the final refit.
#[derive(Debug, Clone, PartialEq)]
pub struct StepwiseSelection {
    /// Accepted assets in acceptance order
    pub selected: Vec<String>,
    /// Fit metric after each accepted round (R² or RMSE)
    pub history: Vec<f64>,
}

/// Forward stepwise selector.
#[derive(Debug, Clone, Default)]
pub struct StepwiseSelector {
    config: StepwiseConfig,
}

impl StepwiseSelector {
    /// Create a new selector with the given configuration
    pub const fn new(config: StepwiseConfig) -> Self {
        Self { config }
    }

    /// Selector configuration.
    pub const fn config(&self) -> &StepwiseConfig {
        &self.config
    }

    /// Run the greedy search.
    ///
    /// # Errors
    /// [`ModelError::DimensionMismatch`] when `fund` and `assets` differ in
    /// length.
    pub fn select(
        &self,
        assets: &ReturnMatrix,
        fund: &ReturnSeries,
    ) -> Result<StepwiseSelection, ModelError> {
        if assets.n_obs() != fund.len() {
            return Err(ModelError::DimensionMismatch {
                expected: assets.n_obs(),
                actual: fund.len(),
            });
        }
        let optimizer =
            ConstrainedOptimizer::new(OptimizerConfig::with_sum_to_one(self.config.sum_to_one));
        let y = fund.values();
        let x = assets.values();

        let mut chosen: Vec<usize> = Vec::new();
        let mut remaining: Vec<usize> = (0..assets.n_assets()).collect();
        let mut history = Vec::new();
        let mut best_score = f64::NEG_INFINITY;

        while chosen.len() < self.config.max_subset_size && !remaining.is_empty() {
            let mut trials = Vec::with_capacity(remaining.len());
            for (pos, &j) in remaining.iter().enumerate() {
                let mut columns = chosen.clone();
                columns.push(j);
                let design = x.select(Axis(1), &columns);
                let weights = optimizer.solve(&design, y)?.weights;
                let residuals = y - &design.dot(&weights);
                let metric = self.metric(y, &residuals);
                trials.push((pos, metric, self.score(metric)));
            }
            // Stable: ties keep universe order.
            trials.sort_by(|a, b| b.2.total_cmp(&a.2));

            let (pos, metric, score) = trials[0];
            let round = chosen.len() + 1;
            if round > 1 && !(score - best_score > self.config.epsilon) {
                debug!(
                    round,
                    asset = %assets.names()[remaining[pos]],
                    improvement = score - best_score,
                    "stepwise stopped: improvement below epsilon"
                );
                break;
            }

            let j = remaining.remove(pos);
            debug!(round, asset = %assets.names()[j], metric, "stepwise accepted asset");
            chosen.push(j);
            history.push(metric);
            best_score = score;
        }

        Ok(StepwiseSelection {
            selected: chosen.iter().map(|&j| assets.names()[j].clone()).collect(),
            history,
        })
    }

    fn metric(&self, y: &Array1<f64>, residuals: &Array1<f64>) -> f64 {
        match self.config.mode {
            AnalysisMode::InSample => r_squared(y.view(), residuals.view()),
            AnalysisMode::Prediction => {
                (residuals.iter().map(|e| e * e).sum::<f64>() / residuals.len() as f64).sqrt()
            }
        }
    }

    /// Higher is better; NaN ranks last.
    fn score(&self, metric: f64) -> f64 {
        let s = match self.config.mode {
            AnalysisMode::InSample => metric,
            AnalysisMode::Prediction => -metric,
        };
        if s.is_nan() { f64::NEG_INFINITY } else { s }
    }
}

impl StyleEstimator for StepwiseSelector {
    fn approach(&self) -> Approach {
        Approach::Stepwise
    }

    fn fit(&self, assets: &ReturnMatrix, fund: &ReturnSeries) -> Result<Candidate, ModelError> {
        let selection = self.select(assets, fund)?;
        let candidate = Candidate::fit(
            Approach::Stepwise,
            assets,
            fund,
            &selection.selected,
            self.config.sum_to_one,
        )?;
        info!(
            assets = candidate.n_assets(),
            r2 = candidate.diagnostics.r2,
            "stepwise selection complete"
        );
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::tests::{mixed_fund, monthly_dates, universe};
    use approx::assert_relative_eq;
    use ndarray::Array2;
    use rstest::rstest;

    #[test]
    fn test_duplicate_columns_select_one() {
        let base = universe(&["SPY"], 48);
        let col = base.column("SPY").unwrap().to_owned();
        let mut values = Array2::zeros((48, 2));
        values.column_mut(0).assign(&col);
        values.column_mut(1).assign(&col);
        let assets = ReturnMatrix::new(
            monthly_dates(48),
            vec!["SPY".to_string(), "IVV".to_string()],
            values,
        )
        .unwrap();
        let fund = ReturnSeries::new("FUND", monthly_dates(48), col.to_vec()).unwrap();

        let selector = StepwiseSelector::default();
        let selection = selector.select(&assets, &fund).unwrap();
        assert_eq!(selection.selected, vec!["SPY".to_string()]);
        assert_eq!(selection.history.len(), 1);

        let c = selector.fit(&assets, &fund).unwrap();
        assert_relative_eq!(c.weights.get("SPY").unwrap(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(c.diagnostics.r2, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_finds_true_components() {
        let assets = universe(&["SPY", "AGG", "EFA", "GLD", "IWM"], 120);
        let fund = mixed_fund(&assets, &[("AGG", 0.3), ("EFA", 0.7)]);
        let c = StepwiseSelector::default().fit(&assets, &fund).unwrap();
        let mut selected = c.selected.clone();
        selected.sort();
        assert_eq!(selected, vec!["AGG".to_string(), "EFA".to_string()]);
        assert_relative_eq!(c.weights.get("EFA").unwrap(), 0.7, epsilon = 1e-6);
    }

    #[rstest]
    #[case(AnalysisMode::InSample)]
    #[case(AnalysisMode::Prediction)]
    fn test_running_best_is_monotone(#[case] mode: AnalysisMode) {
        let assets = universe(&["A", "B", "C", "D", "E", "F"], 60);
        let mut fund = mixed_fund(&assets, &[("A", 0.4), ("C", 0.35), ("F", 0.25)]);
        let noise = crate::candidate::tests::lcg_returns(99, 60);
        let noisy: Vec<f64> = fund
            .values()
            .iter()
            .zip(noise)
            .map(|(v, e)| v + 0.2 * e)
            .collect();
        fund = ReturnSeries::new("FUND", fund.dates().to_vec(), noisy).unwrap();

        let selector = StepwiseSelector::new(StepwiseConfig {
            mode,
            epsilon: 0.0,
            ..Default::default()
        });
        let selection = selector.select(&assets, &fund).unwrap();
        for pair in selection.history.windows(2) {
            match mode {
                AnalysisMode::InSample => assert!(pair[1] > pair[0]),
                AnalysisMode::Prediction => assert!(pair[1] < pair[0]),
            }
        }
    }

    #[test]
    fn test_respects_max_subset_size() {
        let assets = universe(&["A", "B", "C", "D"], 40);
        let fund = mixed_fund(&assets, &[("A", 0.25), ("B", 0.25), ("C", 0.25), ("D", 0.25)]);
        let selector = StepwiseSelector::new(StepwiseConfig {
            max_subset_size: 2,
            epsilon: 0.0,
            ..Default::default()
        });
        assert_eq!(selector.select(&assets, &fund).unwrap().selected.len(), 2);
    }

    #[test]
    fn test_empty_universe_is_degenerate() {
        let assets = ReturnMatrix::new(monthly_dates(12), Vec::new(), Array2::zeros((12, 0))).unwrap();
        let fund = ReturnSeries::new("FUND", monthly_dates(12), vec![0.01; 12]).unwrap();
        let c = StepwiseSelector::default().fit(&assets, &fund).unwrap();
        assert!(c.selected.is_empty());
        assert_eq!(c.residuals, *fund.values());
    }
}
