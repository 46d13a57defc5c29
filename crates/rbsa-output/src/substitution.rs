//! Substitution and consolidation of fitted allocations.
//!
//! A rule ties a composite asset to its components, for example IWB to
//! IWF + IWD. Bottom-up rules try to collapse the components into the
//! composite, carrying over their summed weight without re-optimizing.
//! Top-down rules try to split the composite into its components and
//! re-optimize the expanded set jointly.
//!
//! | Test          | Recommended when                 |
//! |---------------|----------------------------------|
//! | consolidation | ΔR² > −0.001 or ΔAdj R² > 0      |
//! | expansion     | ΔR² > 0.001 or ΔAdj R² > 0       |
//!
//! When several composites are recommended for the same component group,
//! the one with the highest adjusted R² is applied. Consolidations are
//! applied before expansions.

use crate::error::OutputError;
use crate::ranking::{RankedCandidate, rank};
use ndarray::Array1;
use rbsa_data::{ReturnMatrix, ReturnSeries};
use rbsa_models::{AnalysisMode, Candidate, SubstitutionRecord, WeightVector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Whether a rule consolidates components or expands a composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Components collapse into the composite
    #[default]
    #[serde(rename = "bottom-up")]
    BottomUp,
    /// Composite splits into its components
    #[serde(rename = "top-down")]
    TopDown,
}

/// Relationship between a composite asset and its components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionRule {
    /// Rule name
    pub name: String,
    /// Composite asset
    pub substitute: String,
    /// Component assets
    pub components: Vec<String>,
    /// Test direction (default: bottom-up)
    #[serde(default)]
    pub direction: Direction,
}

impl SubstitutionRule {
    /// Create a new rule.
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        substitute: impl Into<String>,
        components: impl IntoIterator<Item = S>,
        direction: Direction,
    ) -> Self {
        Self {
            name: name.into(),
            substitute: substitute.into(),
            components: components.into_iter().map(Into::into).collect(),
            direction,
        }
    }

    /// Check the rule is well formed.
    pub fn validate(&self) -> Result<(), OutputError> {
        let invalid = |reason: &str| {
            Err(OutputError::InvalidRule {
                name: self.name.clone(),
                reason: reason.to_string(),
            })
        };
        if self.components.is_empty() {
            return invalid("no components");
        }
        if self.components.contains(&self.substitute) {
            return invalid("substitute is one of its own components");
        }
        Ok(())
    }

    /// Rule assets absent from `universe`.
    pub fn missing_assets(&self, universe: &ReturnMatrix) -> Vec<String> {
        std::iter::once(&self.substitute)
            .chain(&self.components)
            .filter(|a| !universe.contains(a))
            .cloned()
            .collect()
    }
}

/// Materiality thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstitutionConfig {
    /// Largest R² loss a consolidation may cause (default: 0.001)
    pub consolidation_tolerance: f64,
    /// R² gain that justifies an expansion (default: 0.001)
    pub expansion_threshold: f64,
    /// R² change that makes a weight swap material (default: 0.001)
    pub swap_materiality: f64,
    /// Renormalize consolidated weights and refit expansions on the simplex (default: true)
    pub sum_to_one: bool,
}

impl Default for SubstitutionConfig {
    fn default() -> Self {
        Self {
            consolidation_tolerance: 0.001,
            expansion_threshold: 0.001,
            swap_materiality: 0.001,
            sum_to_one: true,
        }
    }
}

/// Fit before and after a substitution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitComparison {
    /// R² before
    pub r2_before: f64,
    /// R² after
    pub r2_after: f64,
    /// Adjusted R² before
    pub adj_r2_before: f64,
    /// Adjusted R² after
    pub adj_r2_after: f64,
    /// RMSE before
    pub rmse_before: f64,
    /// RMSE after
    pub rmse_after: f64,
}

impl FitComparison {
    fn between(before: &Candidate, after: &Candidate) -> Self {
        Self {
            r2_before: before.diagnostics.r2,
            r2_after: after.diagnostics.r2,
            adj_r2_before: before.diagnostics.adj_r2,
            adj_r2_after: after.diagnostics.adj_r2,
            rmse_before: before.diagnostics.rmse,
            rmse_after: after.diagnostics.rmse,
        }
    }

    /// Change in R².
    pub fn delta_r2(&self) -> f64 {
        self.r2_after - self.r2_before
    }

    /// Change in adjusted R².
    pub fn delta_adj_r2(&self) -> f64 {
        self.adj_r2_after - self.adj_r2_before
    }
}

/// Effect of exchanging the weights of a two-component group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapTest {
    /// Weights after the exchange
    pub swapped: WeightVector,
    /// R² with the swapped weights
    pub r2: f64,
    /// Change in R² against the original weights
    pub delta_r2: f64,
    /// Whether the change exceeds the materiality threshold
    pub materially_different: bool,
}

/// Result of testing one applicable rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTest {
    /// Fit before and after
    pub comparison: FitComparison,
    /// Whether the substitution should be applied
    pub recommended: bool,
    /// Candidate after the substitution
    pub substituted: Candidate,
    /// Weight-swap diagnostic (two-component consolidations only)
    pub swap: Option<SwapTest>,
}

/// What happened when a rule met a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RuleOutcome {
    /// Some rule assets are not in the universe
    Inapplicable {
        /// Missing assets
        missing: Vec<String>,
    },
    /// The candidate does not hold the assets the rule acts on
    NotTriggered,
    /// Components collapsed into the composite
    Consolidation(RuleTest),
    /// Composite split into components
    Expansion(RuleTest),
}

impl RuleOutcome {
    /// The test, if the rule was evaluated.
    pub const fn test(&self) -> Option<&RuleTest> {
        match self {
            Self::Consolidation(t) | Self::Expansion(t) => Some(t),
            Self::Inapplicable { .. } | Self::NotTriggered => None,
        }
    }
}

/// One rule evaluated against one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    /// Rule name
    pub rule: String,
    /// Outcome
    pub outcome: RuleOutcome,
}

/// Every rule tested against one candidate, plus the resulting candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionAnalysis {
    /// Candidate as ranked before substitution
    pub original: Candidate,
    /// Rule outcomes, in rule order
    pub evaluations: Vec<RuleEvaluation>,
    /// Candidate after the recommended substitutions
    pub result: Candidate,
}

/// Analyses for the processed candidates and the new ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionRun {
    /// One analysis per processed candidate, in input rank order
    pub analyses: Vec<SubstitutionAnalysis>,
    /// Ranking after substitution
    pub ranking: Vec<RankedCandidate>,
}

/// Applies substitution rules to candidates.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionEngine {
    rules: Vec<SubstitutionRule>,
    config: SubstitutionConfig,
}

impl SubstitutionEngine {
    /// Create an engine after validating every rule.
    pub fn new(rules: Vec<SubstitutionRule>, config: SubstitutionConfig) -> Result<Self, OutputError> {
        for rule in &rules {
            rule.validate()?;
        }
        Ok(Self { rules, config })
    }

    /// Configured rules.
    pub fn rules(&self) -> &[SubstitutionRule] {
        &self.rules
    }

    /// Test one rule against a candidate.
    ///
    /// `universe` must contain every asset the candidate holds; it usually
    /// also holds substitution-only assets.
    pub fn evaluate(
        &self,
        rule: &SubstitutionRule,
        candidate: &Candidate,
        universe: &ReturnMatrix,
        fund: &ReturnSeries,
    ) -> Result<RuleOutcome, OutputError> {
        let missing = rule.missing_assets(universe);
        if !missing.is_empty() {
            warn!(rule = %rule.name, ?missing, "substitution rule skipped: assets not in universe");
            return Ok(RuleOutcome::Inapplicable { missing });
        }

        let outcome = match rule.direction {
            Direction::BottomUp => {
                if !rule.components.iter().all(|c| candidate.weights.get(c).is_some()) {
                    return Ok(RuleOutcome::NotTriggered);
                }
                let weights = consolidate(&candidate.weights, rule, self.config.sum_to_one)?;
                let substituted = Candidate::from_weights(candidate.approach, universe, fund, weights)?;
                let comparison = FitComparison::between(candidate, &substituted);
                let recommended = comparison.delta_r2() > -self.config.consolidation_tolerance
                    || comparison.delta_adj_r2() > 0.0;
                let swap = if rule.components.len() == 2 {
                    Some(self.swap_test(rule, candidate, universe, fund)?)
                } else {
                    None
                };
                RuleOutcome::Consolidation(RuleTest {
                    comparison,
                    recommended,
                    substituted,
                    swap,
                })
            }
            Direction::TopDown => {
                if candidate.weights.get(&rule.substitute).is_none() {
                    return Ok(RuleOutcome::NotTriggered);
                }
                let substituted = expand(candidate, rule, universe, fund, self.config.sum_to_one)?;
                let comparison = FitComparison::between(candidate, &substituted);
                let recommended = comparison.delta_r2() > self.config.expansion_threshold
                    || comparison.delta_adj_r2() > 0.0;
                RuleOutcome::Expansion(RuleTest {
                    comparison,
                    recommended,
                    substituted,
                    swap: None,
                })
            }
        };
        if let Some(test) = outcome.test() {
            debug!(
                rule = %rule.name,
                delta_r2 = test.comparison.delta_r2(),
                delta_adj_r2 = test.comparison.delta_adj_r2(),
                recommended = test.recommended,
                "substitution rule tested"
            );
        }
        Ok(outcome)
    }

    fn swap_test(
        &self,
        rule: &SubstitutionRule,
        candidate: &Candidate,
        universe: &ReturnMatrix,
        fund: &ReturnSeries,
    ) -> Result<SwapTest, OutputError> {
        let (a, b) = (&rule.components[0], &rule.components[1]);
        let wa = candidate.weights.get(a).unwrap_or(0.0);
        let wb = candidate.weights.get(b).unwrap_or(0.0);
        let values: Array1<f64> = candidate
            .weights
            .iter()
            .map(|w| {
                if &w.asset == a {
                    wb
                } else if &w.asset == b {
                    wa
                } else {
                    w.weight
                }
            })
            .collect();
        let swapped = WeightVector::from_parts(&candidate.weights.assets(), &values)
            .map_err(OutputError::from)?;
        let evaluated = Candidate::from_weights(candidate.approach, universe, fund, swapped.clone())?;
        let delta_r2 = evaluated.diagnostics.r2 - candidate.diagnostics.r2;
        Ok(SwapTest {
            swapped,
            r2: evaluated.diagnostics.r2,
            delta_r2,
            materially_different: delta_r2.abs() > self.config.swap_materiality,
        })
    }

    /// Test every rule against a candidate and apply the recommended ones.
    pub fn analyze(
        &self,
        candidate: &Candidate,
        universe: &ReturnMatrix,
        fund: &ReturnSeries,
    ) -> Result<SubstitutionAnalysis, OutputError> {
        let evaluations = self
            .rules
            .iter()
            .map(|rule| {
                Ok(RuleEvaluation {
                    rule: rule.name.clone(),
                    outcome: self.evaluate(rule, candidate, universe, fund)?,
                })
            })
            .collect::<Result<Vec<_>, OutputError>>()?;
        let result = self.apply(candidate, &evaluations, universe, fund)?;
        Ok(SubstitutionAnalysis {
            original: candidate.clone(),
            evaluations,
            result,
        })
    }

    fn apply(
        &self,
        candidate: &Candidate,
        evaluations: &[RuleEvaluation],
        universe: &ReturnMatrix,
        fund: &ReturnSeries,
    ) -> Result<Candidate, OutputError> {
        // Best recommended consolidation per component group, first seen wins ties.
        let mut groups: Vec<(Vec<String>, &SubstitutionRule, f64)> = Vec::new();
        for (rule, eval) in self.rules.iter().zip(evaluations) {
            let RuleOutcome::Consolidation(test) = &eval.outcome else {
                continue;
            };
            if !test.recommended {
                continue;
            }
            let mut key = rule.components.clone();
            key.sort();
            let adj_r2 = test.comparison.adj_r2_after;
            match groups.iter_mut().find(|(k, _, _)| *k == key) {
                Some(group) if adj_r2 > group.2 => {
                    group.1 = rule;
                    group.2 = adj_r2;
                }
                Some(_) => {}
                None => groups.push((key, rule, adj_r2)),
            }
        }

        let mut weights = candidate.weights.clone();
        let mut records = Vec::new();
        let mut solver_status = candidate.solver_status.clone();

        for (_, rule, adj_r2) in &groups {
            if !rule.components.iter().all(|c| weights.get(c).is_some()) {
                continue;
            }
            weights = consolidate(&weights, rule, self.config.sum_to_one)?;
            info!(from = ?rule.components, to = %rule.substitute, "consolidation applied");
            records.push(SubstitutionRecord::Consolidation {
                from: rule.components.clone(),
                to: rule.substitute.clone(),
                adj_r2: *adj_r2,
            });
        }

        for (rule, eval) in self.rules.iter().zip(evaluations) {
            let RuleOutcome::Expansion(test) = &eval.outcome else {
                continue;
            };
            if !test.recommended || weights.get(&rule.substitute).is_none() {
                continue;
            }
            let current = Candidate::from_weights(candidate.approach, universe, fund, weights.clone())?;
            let expanded = expand(&current, rule, universe, fund, self.config.sum_to_one)?;
            weights = expanded.weights;
            solver_status = expanded.solver_status;
            info!(from = %rule.substitute, to = ?rule.components, "expansion applied");
            records.push(SubstitutionRecord::Expansion {
                from: rule.substitute.clone(),
                to: rule.components.clone(),
            });
        }

        if records.is_empty() {
            let mut unchanged = candidate.clone();
            unchanged.original_selected = candidate.selected.clone();
            unchanged.substitutions_applied = Vec::new();
            return Ok(unchanged);
        }

        let mut result = Candidate::from_weights(candidate.approach, universe, fund, weights)?;
        result.original_selected = candidate.selected.clone();
        result.substitutions_applied = records;
        result.solver_status = solver_status;
        result.cluster_count = candidate.cluster_count;
        result.posterior = candidate.posterior.clone();
        Ok(result)
    }

    /// Substitute within the top `top_n` candidates and re-rank everything.
    ///
    /// Candidates beyond `top_n` are carried into the new ranking unchanged.
    pub fn process(
        &self,
        ranked: &[RankedCandidate],
        top_n: usize,
        universe: &ReturnMatrix,
        fund: &ReturnSeries,
        mode: AnalysisMode,
    ) -> Result<SubstitutionRun, OutputError> {
        let analyses = ranked
            .iter()
            .take(top_n)
            .map(|r| self.analyze(&r.candidate, universe, fund))
            .collect::<Result<Vec<_>, _>>()?;
        let candidates = analyses
            .iter()
            .map(|a| a.result.clone())
            .chain(ranked.iter().skip(top_n).map(|r| r.candidate.clone()))
            .collect();
        Ok(SubstitutionRun {
            analyses,
            ranking: rank(candidates, mode),
        })
    }
}

/// Replace a rule's components by its composite, summing their weights.
fn consolidate(
    weights: &WeightVector,
    rule: &SubstitutionRule,
    sum_to_one: bool,
) -> Result<WeightVector, OutputError> {
    let mut names = Vec::with_capacity(weights.len());
    let mut values = Vec::with_capacity(weights.len());
    let mut merged = 0.0;
    for w in weights.iter() {
        if rule.components.contains(&w.asset) || w.asset == rule.substitute {
            merged += w.weight;
        } else {
            names.push(w.asset.clone());
            values.push(w.weight);
        }
    }
    names.push(rule.substitute.clone());
    values.push(merged);

    let mut values = Array1::from(values);
    let total = values.sum();
    if sum_to_one && total > 0.0 {
        values /= total;
    }
    Ok(WeightVector::from_parts(&names, &values)?)
}

/// Replace a rule's composite by its components and re-optimize.
fn expand(
    candidate: &Candidate,
    rule: &SubstitutionRule,
    universe: &ReturnMatrix,
    fund: &ReturnSeries,
    sum_to_one: bool,
) -> Result<Candidate, OutputError> {
    let mut selected: Vec<String> = candidate
        .weights
        .assets()
        .into_iter()
        .filter(|a| *a != rule.substitute)
        .collect();
    for c in &rule.components {
        if !selected.contains(c) {
            selected.push(c.clone());
        }
    }
    Ok(Candidate::fit(candidate.approach, universe, fund, &selected, sum_to_one)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use ndarray::Array2;
    use rbsa_models::Approach;

    fn dates(n: usize) -> Vec<NaiveDate> {
        (0..n)
            .map(|i| NaiveDate::from_ymd_opt(2010 + (i / 12) as i32, (i % 12) as u32 + 1, 1).unwrap())
            .collect()
    }

    fn noise(seed: u64, n: usize) -> Vec<f64> {
        let mut state = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 11) as f64 / (1u64 << 53) as f64 - 0.5) * 0.08
            })
            .collect()
    }

    /// IWF and IWD independent, IWB their average, IWM unrelated.
    fn universe(n: usize) -> ReturnMatrix {
        let iwf = noise(1, n);
        let iwd = noise(2, n);
        let iwm = noise(3, n);
        let mut values = Array2::zeros((n, 4));
        for i in 0..n {
            values[[i, 0]] = iwf[i];
            values[[i, 1]] = iwd[i];
            values[[i, 2]] = 0.5 * (iwf[i] + iwd[i]);
            values[[i, 3]] = iwm[i];
        }
        ReturnMatrix::new(
            dates(n),
            ["IWF", "IWD", "IWB", "IWM"].iter().map(|s| s.to_string()).collect(),
            values,
        )
        .unwrap()
    }

    fn fund(universe: &ReturnMatrix, mix: &[(&str, f64)]) -> ReturnSeries {
        let mut y = Array1::zeros(universe.n_obs());
        for (name, w) in mix {
            y = y + &universe.column(name).unwrap().mapv(|v| v * w);
        }
        ReturnSeries::new("FUND", universe.dates().to_vec(), y.to_vec()).unwrap()
    }

    fn rule() -> SubstitutionRule {
        SubstitutionRule::new("large cap", "IWB", ["IWF", "IWD"], Direction::BottomUp)
    }

    #[test]
    fn test_rule_validation() {
        assert!(rule().validate().is_ok());
        let empty = SubstitutionRule::new("empty", "IWB", Vec::<String>::new(), Direction::BottomUp);
        assert!(empty.validate().is_err());
        let circular = SubstitutionRule::new("circular", "IWB", ["IWB", "IWF"], Direction::BottomUp);
        assert!(SubstitutionEngine::new(vec![circular], SubstitutionConfig::default()).is_err());
    }

    #[test]
    fn test_direction_serde() {
        let json = r#"{"name":"r","substitute":"IWM","components":["IWO","IWN"],"direction":"top-down"}"#;
        let parsed: SubstitutionRule = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.direction, Direction::TopDown);
        let json = r#"{"name":"r","substitute":"IWB","components":["IWF","IWD"]}"#;
        let parsed: SubstitutionRule = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.direction, Direction::BottomUp);
    }

    #[test]
    fn test_consolidate_sums_weights() {
        let weights =
            WeightVector::from_parts(&["IWF", "AGG", "IWD"], &ndarray::array![0.3, 0.4, 0.3]).unwrap();
        let merged = consolidate(&weights, &rule(), true).unwrap();
        assert_eq!(merged.assets(), vec!["AGG".to_string(), "IWB".to_string()]);
        assert_relative_eq!(merged.get("IWB").unwrap(), 0.6);
        assert_relative_eq!(merged.total(), 1.0);
    }

    #[test]
    fn test_inapplicable_when_asset_missing() {
        let u = universe(48);
        let f = fund(&u, &[("IWF", 0.5), ("IWD", 0.5)]);
        let c = Candidate::fit(Approach::Stepwise, &u, &f, &["IWF", "IWD"], true).unwrap();
        let engine = SubstitutionEngine::default();
        let missing = SubstitutionRule::new("mid", "IJH", ["IWF", "IWD"], Direction::BottomUp);
        let outcome = engine.evaluate(&missing, &c, &u, &f).unwrap();
        assert_eq!(
            outcome,
            RuleOutcome::Inapplicable {
                missing: vec!["IJH".to_string()]
            }
        );
    }

    #[test]
    fn test_not_triggered_without_all_components() {
        let u = universe(48);
        let f = fund(&u, &[("IWF", 1.0)]);
        let c = Candidate::fit(Approach::Stepwise, &u, &f, &["IWF"], true).unwrap();
        let engine = SubstitutionEngine::default();
        assert_eq!(
            engine.evaluate(&rule(), &c, &u, &f).unwrap(),
            RuleOutcome::NotTriggered
        );
    }

    #[test]
    fn test_asymmetric_mix_keeps_components() {
        let u = universe(60);
        let f = fund(&u, &[("IWF", 0.9), ("IWD", 0.1)]);
        let c = Candidate::fit(Approach::Stepwise, &u, &f, &["IWF", "IWD"], true).unwrap();
        let engine = SubstitutionEngine::new(vec![rule()], SubstitutionConfig::default()).unwrap();
        let analysis = engine.analyze(&c, &u, &f).unwrap();

        let test = analysis.evaluations[0].outcome.test().unwrap();
        assert!(!test.recommended);
        let swap = test.swap.as_ref().unwrap();
        assert!(swap.materially_different);
        assert_relative_eq!(swap.swapped.get("IWF").unwrap(), 0.1, epsilon = 1e-6);

        assert_eq!(analysis.result.selected, c.selected);
        assert!(analysis.result.substitutions_applied.is_empty());
        assert_eq!(analysis.result.original_selected, c.selected);
    }

    #[test]
    fn test_expansion_recovers_components() {
        let u = universe(60);
        let f = fund(&u, &[("IWF", 0.8), ("IWD", 0.2)]);
        let c = Candidate::fit(Approach::Regularized, &u, &f, &["IWB"], true).unwrap();
        let split = SubstitutionRule::new("split", "IWB", ["IWF", "IWD"], Direction::TopDown);
        let engine = SubstitutionEngine::new(vec![split], SubstitutionConfig::default()).unwrap();
        let analysis = engine.analyze(&c, &u, &f).unwrap();

        assert!(matches!(analysis.evaluations[0].outcome, RuleOutcome::Expansion(ref t) if t.recommended));
        let result = &analysis.result;
        assert_eq!(result.selected, vec!["IWF".to_string(), "IWD".to_string()]);
        assert_relative_eq!(result.weights.get("IWF").unwrap(), 0.8, epsilon = 1e-6);
        assert_eq!(
            result.substitutions_applied,
            vec![SubstitutionRecord::Expansion {
                from: "IWB".to_string(),
                to: vec!["IWF".to_string(), "IWD".to_string()],
            }]
        );
        assert_eq!(result.original_selected, vec!["IWB".to_string()]);
    }

    #[test]
    fn test_best_composite_wins_group() {
        let u = universe(60);
        let f = fund(&u, &[("IWF", 0.5), ("IWD", 0.5)]);
        let c = Candidate::fit(Approach::Stepwise, &u, &f, &["IWF", "IWD"], true).unwrap();
        let poor = SubstitutionRule::new("poor", "IWM", ["IWD", "IWF"], Direction::BottomUp);
        let engine = SubstitutionEngine::new(
            vec![poor, rule()],
            SubstitutionConfig {
                consolidation_tolerance: 10.0,
                ..Default::default()
            },
        )
        .unwrap();
        let analysis = engine.analyze(&c, &u, &f).unwrap();
        assert_eq!(analysis.result.selected, vec!["IWB".to_string()]);
        assert_eq!(analysis.result.substitutions_applied.len(), 1);
    }
}
