//! Full pipeline runs on synthetic index returns.

use approx::assert_relative_eq;
use chrono::NaiveDate;
use ndarray::Array2;
use rbsa::data::{PreprocessConfig, ReturnMatrix, ReturnSeries};
use rbsa::models::{AnalysisMode, Approach, StyleOptions, SubstitutionRecord};
use rbsa::output::{Direction, SubstitutionRule};
use rbsa::{AnalysisConfig, ApproachResult, StyleAnalysis};
use rstest::rstest;

const N: usize = 72;

fn dates() -> Vec<NaiveDate> {
    (0..N)
        .map(|i| NaiveDate::from_ymd_opt(2016 + (i / 12) as i32, (i % 12) as u32 + 1, 1).unwrap())
        .collect()
}

fn noise(seed: u64, scale: f64) -> Vec<f64> {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(1);
    (0..N)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 11) as f64 / (1u64 << 53) as f64 - 0.5) * scale
        })
        .collect()
}

/// SPY, AGG, EFA, IWF, IWD independent; IWB is half IWF and half IWD.
fn universe() -> ReturnMatrix {
    let names = ["SPY", "AGG", "EFA", "IWF", "IWD", "IWB"];
    let columns = [
        noise(1, 0.10),
        noise(2, 0.03),
        noise(3, 0.12),
        noise(4, 0.11),
        noise(5, 0.09),
    ];
    let mut values = Array2::zeros((N, names.len()));
    for i in 0..N {
        for (j, col) in columns.iter().enumerate() {
            values[[i, j]] = col[i];
        }
        values[[i, 5]] = 0.5 * columns[3][i] + 0.5 * columns[4][i];
    }
    ReturnMatrix::new(dates(), names.iter().map(|s| s.to_string()).collect(), values).unwrap()
}

fn fund(universe: &ReturnMatrix, mix: &[(&str, f64)], noise_scale: f64) -> ReturnSeries {
    let eps = noise(99, noise_scale);
    let mut y = eps;
    for (name, w) in mix {
        for (yi, xi) in y.iter_mut().zip(universe.column(name).unwrap().iter()) {
            *yi += w * xi;
        }
    }
    ReturnSeries::new("FUND", dates(), y).unwrap()
}

fn fast_options() -> StyleOptions {
    StyleOptions {
        max_subset_size: 4,
        mcmc_samples: 600,
        mcmc_burnin: 100,
        lambda_grid_points: 20,
        cluster_k_min: 2,
        cluster_k_max: 4,
        ..Default::default()
    }
}

#[test]
fn test_balanced_fund_recovers_mix() {
    let universe = universe();
    let fund = fund(&universe, &[("SPY", 0.6), ("AGG", 0.4)], 0.002);
    let config = AnalysisConfig {
        preprocess: PreprocessConfig {
            selection_universe: Some(vec!["SPY".into(), "AGG".into(), "EFA".into(), "IWF".into(), "IWD".into()]),
            ..Default::default()
        },
        ..AnalysisConfig::from_options(fast_options())
    };
    let outcome = StyleAnalysis::new(config).unwrap().run(&fund, &universe, None).unwrap();

    let approaches: Vec<Approach> = outcome.approach_results.iter().map(ApproachResult::approach).collect();
    assert_eq!(approaches, Approach::ALL.to_vec());
    let fitted = outcome
        .approach_results
        .iter()
        .filter(|r| r.candidate().is_some())
        .count();
    assert_eq!(outcome.initial_ranking.len(), fitted);
    assert_eq!(outcome.final_ranking.len(), fitted);
    assert_eq!(outcome.substitutions.len(), fitted.min(3));

    for ranked in &outcome.final_ranking {
        let c = &ranked.candidate;
        assert!(c.weights.iter().all(|w| w.weight >= -1e-9));
        if !c.weights.is_empty() {
            assert_relative_eq!(c.weights.total(), 1.0, epsilon = 1e-6);
        }
    }

    let best = outcome.best().unwrap();
    assert!(best.diagnostics.r2 > 0.95);
    assert_relative_eq!(best.weights.get("SPY").unwrap(), 0.6, epsilon = 0.05);
    assert_relative_eq!(best.weights.get("AGG").unwrap(), 0.4, epsilon = 0.05);

    let scores: Vec<f64> = outcome.final_ranking.iter().map(|r| r.score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));

    let text = outcome.report().to_text();
    assert!(text.contains("Candidate 1 (Method "));
    assert!(text.contains("Large sample (n≥60)"));
}

#[test]
fn test_growth_value_blend_consolidates() {
    let universe = universe();
    let fund = fund(&universe, &[("IWF", 0.5), ("IWD", 0.5)], 0.0);
    let config = AnalysisConfig {
        approaches: vec![Approach::Stepwise],
        substitution_rules: vec![SubstitutionRule::new(
            "large cap blend",
            "IWB",
            ["IWF", "IWD"],
            Direction::BottomUp,
        )],
        preprocess: PreprocessConfig {
            selection_universe: Some(vec!["SPY".into(), "AGG".into(), "EFA".into(), "IWF".into(), "IWD".into()]),
            ..Default::default()
        },
        ..AnalysisConfig::from_options(fast_options())
    };
    let outcome = StyleAnalysis::new(config).unwrap().run(&fund, &universe, None).unwrap();

    let before = &outcome.initial_ranking[0].candidate;
    let mut selected = before.selected.clone();
    selected.sort();
    assert_eq!(selected, vec!["IWD".to_string(), "IWF".to_string()]);

    let after = outcome.best().unwrap();
    assert_eq!(after.selected, vec!["IWB".to_string()]);
    assert_relative_eq!(after.weights.get("IWB").unwrap(), 1.0, epsilon = 1e-9);
    assert!(matches!(
        after.substitutions_applied.as_slice(),
        [SubstitutionRecord::Consolidation { to, .. }] if to == "IWB"
    ));
    assert!(outcome.report().to_text().contains("after substitution"));
}

#[rstest]
#[case(AnalysisMode::InSample)]
#[case(AnalysisMode::Prediction)]
fn test_ranking_follows_mode(#[case] mode: AnalysisMode) {
    let universe = universe();
    let fund = fund(&universe, &[("EFA", 0.3), ("SPY", 0.5), ("AGG", 0.2)], 0.01);
    let options = StyleOptions {
        analysis_mode: mode,
        ..fast_options()
    };
    let config = AnalysisConfig {
        approaches: vec![Approach::Stepwise, Approach::Regularized, Approach::ClusterGuided],
        ..AnalysisConfig::from_options(options)
    };
    let outcome = StyleAnalysis::new(config).unwrap().run(&fund, &universe, None).unwrap();
    let metric: Vec<f64> = outcome
        .final_ranking
        .iter()
        .map(|r| match mode {
            AnalysisMode::InSample => r.candidate.diagnostics.r2,
            AnalysisMode::Prediction => -r.candidate.diagnostics.rmse,
        })
        .collect();
    assert!(metric.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_outcome_serializes() {
    let universe = universe();
    let fund = fund(&universe, &[("SPY", 1.0)], 0.001);
    let mut config = AnalysisConfig::from_options(fast_options());
    config.approaches = vec![Approach::Stepwise];
    config.desmooth.enabled = true;
    let outcome = StyleAnalysis::new(config).unwrap().run(&fund, &universe, None).unwrap();
    assert!(outcome.desmooth.is_some());

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["approach_results"][0]["status"], "fitted");
    assert_eq!(json["approach_results"][0]["approach"], "stepwise");
    assert_eq!(json["fund"], "FUND");
}
