//! Style analysis of a synthetic balanced fund.

use chrono::NaiveDate;
use ndarray::Array2;
use rbsa::data::{ReturnMatrix, ReturnSeries};
use rbsa::models::StyleOptions;
use rbsa::output::{Direction, ExportFormat, Exporter, SubstitutionRule, weight_rows};
use rbsa::{AnalysisConfig, StyleAnalysis};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== RBSA Style Demo ===\n");

    let n = 60;
    let dates: Vec<NaiveDate> = (0..n)
        .filter_map(|i| NaiveDate::from_ymd_opt(2019 + (i / 12) as i32, (i % 12) as u32 + 1, 1))
        .collect();

    // Deterministic pseudo-returns for four indices; IWB blends IWF and IWD.
    let mut state = 42_u64;
    let mut draw = |scale: f64| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 11) as f64 / (1u64 << 53) as f64 - 0.5) * scale
    };
    let names = ["IWF", "IWD", "AGG", "EFA", "IWB"];
    let mut values = Array2::zeros((n, names.len()));
    for i in 0..n {
        values[[i, 0]] = draw(0.10);
        values[[i, 1]] = draw(0.08);
        values[[i, 2]] = draw(0.02);
        values[[i, 3]] = draw(0.12);
        values[[i, 4]] = 0.5 * values[[i, 0]] + 0.5 * values[[i, 1]];
    }
    let assets = ReturnMatrix::new(dates.clone(), names.iter().map(|s| s.to_string()).collect(), values)?;

    // 30% growth, 30% value, 40% bonds plus a little tracking error.
    let fund_values: Vec<f64> = (0..n)
        .map(|i| {
            0.3 * assets.values()[[i, 0]] + 0.3 * assets.values()[[i, 1]] + 0.4 * assets.values()[[i, 2]]
                + draw(0.002)
        })
        .collect();
    let fund = ReturnSeries::new("BALANCED", dates, fund_values)?;

    let mut config = AnalysisConfig::from_options(StyleOptions {
        mcmc_samples: 2000,
        mcmc_burnin: 500,
        ..Default::default()
    });
    config.substitution_rules = vec![SubstitutionRule::new(
        "large cap blend",
        "IWB",
        ["IWF", "IWD"],
        Direction::BottomUp,
    )];
    config.preprocess.selection_universe = Some(vec![
        "IWF".to_string(),
        "IWD".to_string(),
        "AGG".to_string(),
        "EFA".to_string(),
    ]);

    let outcome = StyleAnalysis::new(config)?.run(&fund, &assets, None)?;

    println!("{}", outcome.report().to_text());

    println!("Weights (CSV):");
    println!("{}", weight_rows(&outcome.final_ranking).export_to_string(ExportFormat::Csv)?);

    Ok(())
}
