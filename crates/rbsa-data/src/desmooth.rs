//! AR(1) autocorrelation testing and Geltner de-smoothing.
//!
//! Funds priced from appraisals or stale marks report returns that are
//! smoother than the underlying assets. The observed series is modelled as
//!
//! r_obs(t) = ρ r_obs(t-1) + (1 - ρ) r_true(t)
//!
//! and de-smoothing inverts it:
//!
//! r_true(t) = (r_obs(t) - ρ r_obs(t-1)) / (1 - ρ)
//!
//! Reference: Geltner, D. (1993), "Estimating Market Values from Appraised
//! Values without Assuming an Efficient Market".

use crate::error::{DataError, Result};
use crate::series::ReturnSeries;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, StudentsT};
use tracing::{debug, info, warn};

/// Minimum observations for the AR(1) test.
pub const MIN_AR1_OBSERVATIONS: usize = 10;

/// De-smoothing configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DesmoothConfig {
    /// Whether to test and de-smooth the fund series (default: false)
    pub enabled: bool,

    /// p-value threshold for the AR(1) coefficient (default: 0.05)
    pub significance_level: f64,
}

impl Default for DesmoothConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            significance_level: 0.05,
        }
    }
}

/// Result of the AR(1) autocorrelation test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ar1Test {
    /// Estimated AR(1) coefficient ρ
    pub coefficient: f64,
    /// Two-sided p-value of ρ
    pub p_value: f64,
    /// Lag-1 Ljung-Box p-value
    pub ljung_box_p_value: f64,
    /// ρ is positive and significant at the configured level
    pub is_significant: bool,
    /// Number of non-missing observations used
    pub n_obs: usize,
    /// Reason the test was skipped, if it was
    pub skipped: Option<String>,
}

impl Ar1Test {
    fn skipped(n_obs: usize, reason: String) -> Self {
        Self {
            coefficient: 0.0,
            p_value: 1.0,
            ljung_box_p_value: 1.0,
            is_significant: false,
            n_obs,
            skipped: Some(reason),
        }
    }

    /// Whether the series should be de-smoothed.
    pub const fn requires_desmoothing(&self) -> bool {
        self.is_significant
    }
}

/// Outcome of [`desmooth_if_needed`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DesmoothReport {
    /// AR(1) test on the original series
    pub test: Ar1Test,
    /// Whether de-smoothing was applied
    pub desmoothed: bool,
    /// Sample volatility of the original series
    pub original_volatility: f64,
    /// Sample volatility after de-smoothing
    pub desmoothed_volatility: Option<f64>,
    /// Relative volatility change in percent
    pub volatility_increase_pct: Option<f64>,
    /// AR(1) test on the de-smoothed series
    pub retest: Option<Ar1Test>,
}

/// Test a return series for first-order autocorrelation.
///
/// Fits `r_t = a + ρ r_{t-1}` by OLS and t-tests ρ. Fewer than
/// [`MIN_AR1_OBSERVATIONS`] observations yield a skipped, non-significant
/// result rather than an error.
pub fn test_ar1(series: &ReturnSeries, significance_level: f64) -> Result<Ar1Test> {
    let clean = series.dropna();
    let r = clean.values();
    let n = r.len();
    if n < MIN_AR1_OBSERVATIONS {
        return Ok(Ar1Test::skipped(
            n,
            format!("Insufficient data: {n} obs (need >= {MIN_AR1_OBSERVATIONS})"),
        ));
    }

    let x: Vec<f64> = r.iter().take(n - 1).copied().collect();
    let y: Vec<f64> = r.iter().skip(1).copied().collect();
    let m = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / m;
    let y_mean = y.iter().sum::<f64>() / m;
    let sxx: f64 = x.iter().map(|v| (v - x_mean).powi(2)).sum();
    let sxy: f64 = x
        .iter()
        .zip(&y)
        .map(|(a, b)| (a - x_mean) * (b - y_mean))
        .sum();
    if sxx <= 0.0 {
        return Ok(Ar1Test::skipped(n, "Constant series".to_string()));
    }
    let rho = sxy / sxx;
    let intercept = y_mean - rho * x_mean;
    let ssr: f64 = x
        .iter()
        .zip(&y)
        .map(|(a, b)| (b - intercept - rho * a).powi(2))
        .sum();
    let dof = m - 2.0;
    let se = (ssr / dof / sxx).sqrt();

    let p_value = if se > 0.0 {
        let t = rho / se;
        let dist = StudentsT::new(0.0, 1.0, dof)?;
        2.0 * (1.0 - dist.cdf(t.abs()))
    } else if rho != 0.0 {
        0.0
    } else {
        1.0
    };

    let ljung_box_p_value = ljung_box_lag1(&r.to_vec())?;
    let is_significant = p_value < significance_level && rho > 0.0;
    debug!(rho, p_value, ljung_box_p_value, n, "AR(1) test");

    Ok(Ar1Test {
        coefficient: rho,
        p_value,
        ljung_box_p_value,
        is_significant,
        n_obs: n,
        skipped: None,
    })
}

fn ljung_box_lag1(r: &[f64]) -> Result<f64> {
    let n = r.len() as f64;
    let mean = r.iter().sum::<f64>() / n;
    let denom: f64 = r.iter().map(|v| (v - mean).powi(2)).sum();
    if denom <= 0.0 {
        return Ok(1.0);
    }
    let num: f64 = r
        .windows(2)
        .map(|w| (w[0] - mean) * (w[1] - mean))
        .sum();
    let rho1 = num / denom;
    let q = n * (n + 2.0) * rho1 * rho1 / (n - 1.0);
    let chi2 = ChiSquared::new(1.0)?;
    Ok(1.0 - chi2.cdf(q))
}

/// Apply Geltner de-smoothing with coefficient `rho`.
///
/// Missing values are dropped first; the first observation is kept as is.
///
/// # Errors
/// Returns [`DataError::InvalidParameter`] unless `0 < rho < 1`.
pub fn geltner_desmooth(series: &ReturnSeries, rho: f64) -> Result<ReturnSeries> {
    if !(rho > 0.0 && rho < 1.0) {
        return Err(DataError::InvalidParameter(format!(
            "AR(1) coefficient must be in (0, 1), got {rho}"
        )));
    }
    let clean = series.dropna();
    let r = clean.values();
    let mut out = r.clone();
    for t in 1..r.len() {
        out[t] = (r[t] - rho * r[t - 1]) / (1.0 - rho);
    }
    clean.with_values(out)
}

/// Test the series and de-smooth it when ρ is positive and significant.
///
/// Returns the (possibly) transformed series with a report that includes the
/// volatility impact and a re-test of the de-smoothed series.
pub fn desmooth_if_needed(
    series: &ReturnSeries,
    significance_level: f64,
) -> Result<(ReturnSeries, DesmoothReport)> {
    let test = test_ar1(series, significance_level)?;
    let original_volatility = series.std_dev();

    if !test.requires_desmoothing() {
        return Ok((
            series.clone(),
            DesmoothReport {
                test,
                desmoothed: false,
                original_volatility,
                desmoothed_volatility: None,
                volatility_increase_pct: None,
                retest: None,
            },
        ));
    }

    let desmoothed = geltner_desmooth(series, test.coefficient)?;
    let desmoothed_volatility = desmoothed.std_dev();
    let increase = (desmoothed_volatility / original_volatility - 1.0) * 100.0;
    let retest = test_ar1(&desmoothed, significance_level)?;
    info!(
        series = series.name(),
        rho = test.coefficient,
        original_volatility,
        desmoothed_volatility,
        "applied Geltner de-smoothing"
    );
    if retest.is_significant {
        warn!(
            series = series.name(),
            rho = retest.coefficient,
            "significant autocorrelation remains after de-smoothing"
        );
    }

    Ok((
        desmoothed,
        DesmoothReport {
            test,
            desmoothed: true,
            original_volatility,
            desmoothed_volatility: Some(desmoothed_volatility),
            volatility_increase_pct: Some(increase),
            retest: Some(retest),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Months, NaiveDate};

    fn monthly(values: Vec<f64>) -> ReturnSeries {
        let start = NaiveDate::from_ymd_opt(2015, 1, 31).unwrap();
        let dates = (0..values.len())
            .map(|i| start.checked_add_months(Months::new(i as u32)).unwrap())
            .collect();
        ReturnSeries::new("FUND", dates, values).unwrap()
    }

    /// Smoothed series: r_t = 0.6 r_{t-1} + 0.4 e_t with a deterministic
    /// pseudo-random shock.
    fn smoothed(n: usize) -> ReturnSeries {
        let mut state: u64 = 12345;
        let mut prev = 0.0;
        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let e = ((state >> 33) as f64 / (1u64 << 31) as f64 - 0.5) * 0.1;
            let r = 0.6 * prev + 0.4 * e;
            values.push(r);
            prev = r;
        }
        monthly(values)
    }

    #[test]
    fn test_ar1_insufficient_data() {
        let s = monthly(vec![0.01; 5]);
        let test = test_ar1(&s, 0.05).unwrap();
        assert!(test.skipped.is_some());
        assert!(!test.is_significant);
        assert_eq!(test.n_obs, 5);
        assert_relative_eq!(test.p_value, 1.0);
    }

    #[test]
    fn test_ar1_detects_smoothing() {
        let test = test_ar1(&smoothed(200), 0.05).unwrap();
        assert!(test.skipped.is_none());
        assert!(test.coefficient > 0.4 && test.coefficient < 0.8);
        assert!(test.is_significant);
        assert!(test.ljung_box_p_value < 0.05);
    }

    #[test]
    fn test_geltner_formula() {
        let s = monthly(vec![0.01, 0.02, 0.03]);
        let d = geltner_desmooth(&s, 0.5).unwrap();
        assert_relative_eq!(d.values()[0], 0.01);
        assert_relative_eq!(d.values()[1], (0.02 - 0.005) / 0.5, epsilon = 1e-12);
        assert_relative_eq!(d.values()[2], (0.03 - 0.01) / 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_geltner_rejects_invalid_rho() {
        let s = monthly(vec![0.01, 0.02]);
        assert!(geltner_desmooth(&s, 0.0).is_err());
        assert!(geltner_desmooth(&s, 1.0).is_err());
        assert!(geltner_desmooth(&s, -0.2).is_err());
    }

    #[test]
    fn test_desmooth_if_needed_raises_volatility() {
        let (out, report) = desmooth_if_needed(&smoothed(200), 0.05).unwrap();
        assert!(report.desmoothed);
        assert_eq!(out.len(), 200);
        let vol = report.desmoothed_volatility.unwrap();
        assert!(vol > report.original_volatility);
        assert!(report.volatility_increase_pct.unwrap() > 0.0);
        assert!(report.retest.is_some());
    }

    #[test]
    fn test_desmooth_if_needed_passthrough() {
        let s = monthly(vec![0.01, -0.01, 0.01, -0.01, 0.01, -0.01, 0.01, -0.01, 0.01, -0.01, 0.01]);
        let (out, report) = desmooth_if_needed(&s, 0.05).unwrap();
        assert!(!report.desmoothed);
        assert_eq!(out, s);
        assert!(report.retest.is_none());
    }
}
