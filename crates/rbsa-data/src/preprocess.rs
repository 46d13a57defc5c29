//! Alignment, cleaning and transformation of fund and asset returns.
//!
//! The usual order is: align the fund with the asset universe on common
//! dates, subtract the risk-free rate, winsorize, then drop whatever is
//! still incomplete.

use crate::error::{DataError, Result};
use crate::matrix::ReturnMatrix;
use crate::series::ReturnSeries;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Preprocessing configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Tail fraction clipped on each side of every column (default: 0.0, off).
    pub winsorize_pct: f64,

    /// Assets eligible for selection. `None` keeps every asset (default).
    /// Assets outside this list remain available for substitution.
    pub selection_universe: Option<Vec<String>>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            winsorize_pct: 0.0,
            selection_universe: None,
        }
    }
}

impl PreprocessConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..0.5).contains(&self.winsorize_pct) {
            return Err(DataError::InvalidParameter(format!(
                "winsorize_pct must be in [0, 0.5), got {}",
                self.winsorize_pct
            )));
        }
        Ok(())
    }
}

/// Fund and asset returns on an identical date index.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedReturns {
    /// Fund returns.
    pub fund: ReturnSeries,
    /// Asset returns.
    pub assets: ReturnMatrix,
}

/// Cleaned inputs ready for style analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedData {
    /// Fund (excess) returns.
    pub fund: ReturnSeries,
    /// Assets eligible for selection.
    pub selection: ReturnMatrix,
    /// Selection assets plus substitution-only assets.
    pub full: ReturnMatrix,
}

/// Restrict a fund series and an asset matrix to their common dates.
pub fn align(fund: &ReturnSeries, assets: &ReturnMatrix) -> Result<AlignedReturns> {
    let mut fund_values = Vec::new();
    let mut dates = Vec::new();
    let mut rows = Vec::new();
    for (i, d) in assets.dates().iter().enumerate() {
        if let Some(v) = fund.get(*d) {
            fund_values.push(v);
            dates.push(*d);
            rows.push(i);
        }
    }
    if dates.is_empty() {
        return Err(DataError::MissingData {
            symbol: fund.name().to_string(),
            reason: "no dates in common with the asset universe".to_string(),
        });
    }
    debug!(
        fund = fund.name(),
        common = dates.len(),
        fund_obs = fund.len(),
        asset_obs = assets.n_obs(),
        "aligned fund with asset universe"
    );
    Ok(AlignedReturns {
        fund: ReturnSeries::new(fund.name(), dates, fund_values)?,
        assets: assets.take_rows(&rows),
    })
}

/// Subtract a risk-free series from every asset column.
///
/// The risk-free series must share the matrix's index.
pub fn excess_returns(assets: &ReturnMatrix, risk_free: &ReturnSeries) -> Result<ReturnMatrix> {
    check_same_index(assets, risk_free)?;
    let rf = risk_free.values();
    Ok(assets.map_columns(|col| &col - rf))
}

/// Subtract a risk-free series from a fund series on the same index.
pub fn excess_series(fund: &ReturnSeries, risk_free: &ReturnSeries) -> Result<ReturnSeries> {
    if fund.dates() != risk_free.dates() {
        return Err(DataError::DimensionMismatch {
            expected: fund.len(),
            actual: risk_free.len(),
        });
    }
    fund.with_values(fund.values() - risk_free.values())
}

/// Clip every column at its `p` and `1 - p` quantiles.
///
/// `p <= 0` returns the matrix unchanged.
pub fn winsorize(assets: &ReturnMatrix, p: f64) -> ReturnMatrix {
    if p <= 0.0 {
        return assets.clone();
    }
    assets.map_columns(|col| winsorize_values(col, p))
}

/// Clip a series at its `p` and `1 - p` quantiles.
pub fn winsorize_series(series: &ReturnSeries, p: f64) -> Result<ReturnSeries> {
    if p <= 0.0 {
        return Ok(series.clone());
    }
    series.with_values(winsorize_values(series.values().view(), p))
}

fn winsorize_values(values: ArrayView1<'_, f64>, p: f64) -> Array1<f64> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return values.to_owned();
    }
    finite.sort_by(f64::total_cmp);
    let lower = quantile_sorted(&finite, p);
    let upper = quantile_sorted(&finite, 1.0 - p);
    values.mapv(|v| if v.is_finite() { v.clamp(lower, upper) } else { v })
}

/// Quantile with linear interpolation between order statistics.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Drop dates with a missing fund value, then asset columns with any
/// missing value.
pub fn clean(aligned: &AlignedReturns) -> Result<AlignedReturns> {
    let rows: Vec<usize> = aligned
        .fund
        .values()
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, _)| i)
        .collect();
    let assets = aligned.assets.take_rows(&rows).drop_incomplete_columns();
    let dropped = aligned.assets.n_assets() - assets.n_assets();
    if dropped > 0 {
        debug!(dropped, "dropped incomplete asset columns");
    }
    Ok(AlignedReturns {
        fund: aligned.fund.dropna(),
        assets,
    })
}

/// Full preparation: align, excess returns, winsorize, clean, split the
/// selection universe from the full universe.
pub fn prepare(
    fund: &ReturnSeries,
    assets: &ReturnMatrix,
    risk_free: Option<&ReturnSeries>,
    config: &PreprocessConfig,
) -> Result<PreparedData> {
    config.validate()?;
    let aligned = align(fund, assets)?;

    let (fund, assets) = match risk_free {
        Some(rf) => {
            let rf = align(rf, &aligned.assets)?;
            if rf.fund.len() != aligned.fund.len() {
                return Err(DataError::DimensionMismatch {
                    expected: aligned.fund.len(),
                    actual: rf.fund.len(),
                });
            }
            (
                excess_series(&aligned.fund, &rf.fund)?,
                excess_returns(&aligned.assets, &rf.fund)?,
            )
        }
        None => (aligned.fund, aligned.assets),
    };

    let fund = winsorize_series(&fund, config.winsorize_pct)?;
    let assets = winsorize(&assets, config.winsorize_pct);
    let cleaned = clean(&AlignedReturns { fund, assets })?;

    let selection = match &config.selection_universe {
        Some(names) => {
            let present: Vec<&String> = names.iter().filter(|n| cleaned.assets.contains(n)).collect();
            cleaned.assets.select(&present)?
        }
        None => cleaned.assets.clone(),
    };
    debug!(
        selection = selection.n_assets(),
        full = cleaned.assets.n_assets(),
        n_obs = cleaned.fund.len(),
        "prepared analysis inputs"
    );

    Ok(PreparedData {
        fund: cleaned.fund,
        selection,
        full: cleaned.assets,
    })
}

fn check_same_index(assets: &ReturnMatrix, series: &ReturnSeries) -> Result<()> {
    if assets.dates() != series.dates() {
        return Err(DataError::DimensionMismatch {
            expected: assets.n_obs(),
            actual: series.len(),
        });
    }
    Ok(())
}
