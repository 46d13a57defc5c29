//! Fit statistics for a fitted style model.
//!
//! Information criteria use the Gaussian log-likelihood
//!
//! ```text
//! logL = −n/2 · (ln 2π + ln(SS_res / n) + 1)
//! AIC  = 2k − 2 logL
//! AICc = AIC + 2k(k+1) / (n − k − 1)      (+∞ when n ≤ k + 1)
//! BIC  = k ln n − 2 logL
//! ```
//!
//! Undefined quantities are NaN, never zero: callers compare with
//! [`f64::is_finite`] before ranking on them.

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Lag used by the Ljung-Box statistic.
pub const LJUNG_BOX_LAGS: usize = 6;

/// Fit-quality record for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Coefficient of determination
    pub r2: f64,
    /// R² adjusted for the number of weights
    pub adj_r2: f64,
    /// Root mean squared residual
    pub rmse: f64,
    /// Mean absolute residual
    pub mae: f64,
    /// Gaussian log-likelihood
    pub log_likelihood: f64,
    /// Akaike information criterion
    pub aic: f64,
    /// Small-sample corrected AIC
    pub aicc: f64,
    /// Bayesian information criterion
    pub bic: f64,
    /// Durbin-Watson statistic of the residuals
    pub durbin_watson: f64,
    /// Ljung-Box Q statistic at lag 6
    pub ljung_box: f64,
    /// p-value of the Ljung-Box statistic
    pub ljung_box_p_value: f64,
    /// Number of observations
    pub n_obs: usize,
    /// Number of weights
    pub n_params: usize,
}

impl Diagnostics {
    /// Diagnostics from actual and fitted values with `k` weights.
    pub fn compute(y: &Array1<f64>, fitted: &Array1<f64>, k: usize) -> Self {
        let residuals = y - fitted;
        Self::from_residuals(y.view(), residuals.view(), k)
    }

    /// Diagnostics from actual values and residuals with `k` weights.
    pub fn from_residuals(y: ArrayView1<'_, f64>, residuals: ArrayView1<'_, f64>, k: usize) -> Self {
        let n = y.len();
        let nf = n as f64;

        let ss_res: f64 = residuals.iter().map(|e| e * e).sum();
        let rmse = if n > 0 { (ss_res / nf).sqrt() } else { f64::NAN };
        let mae = if n > 0 {
            residuals.iter().map(|e| e.abs()).sum::<f64>() / nf
        } else {
            f64::NAN
        };

        let (r2, adj_r2) = if k > 0 && n > 0 {
            let r2 = r_squared(y, residuals);
            let adj = if n > k + 1 {
                1.0 - (1.0 - r2) * (nf - 1.0) / (nf - k as f64 - 1.0)
            } else {
                r2
            };
            (r2, adj)
        } else {
            (f64::NAN, f64::NAN)
        };

        let (log_likelihood, aic, aicc, bic) = if k > 0 && ss_res > 0.0 && n > 0 {
            let kf = k as f64;
            let ll = -0.5 * nf * ((2.0 * std::f64::consts::PI).ln() + (ss_res / nf).ln() + 1.0);
            let aic = 2.0 * kf - 2.0 * ll;
            let aicc = if n > k + 1 {
                aic + 2.0 * kf * (kf + 1.0) / (nf - kf - 1.0)
            } else {
                f64::INFINITY
            };
            let bic = kf * nf.ln() - 2.0 * ll;
            (ll, aic, aicc, bic)
        } else {
            (f64::NAN, f64::NAN, f64::NAN, f64::NAN)
        };

        let (ljung_box, ljung_box_p_value) = ljung_box(residuals, LJUNG_BOX_LAGS);

        Self {
            r2,
            adj_r2,
            rmse,
            mae,
            log_likelihood,
            aic,
            aicc,
            bic,
            durbin_watson: durbin_watson(residuals),
            ljung_box,
            ljung_box_p_value,
            n_obs: n,
            n_params: k,
        }
    }
}

/// R² = 1 − SS_res / SS_tot, or exactly 0 when SS_tot is 0.
pub fn r_squared(y: ArrayView1<'_, f64>, residuals: ArrayView1<'_, f64>) -> f64 {
    let n = y.len();
    if n == 0 {
        return f64::NAN;
    }
    let mean = y.sum() / n as f64;
    let ss_tot: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
    let ss_res: f64 = residuals.iter().map(|e| e * e).sum();
    if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 }
}

/// Durbin-Watson statistic Σ(e_t − e_{t−1})² / Σe_t².
pub fn durbin_watson(residuals: ArrayView1<'_, f64>) -> f64 {
    let denom: f64 = residuals.iter().map(|e| e * e).sum();
    if denom <= 0.0 {
        return f64::NAN;
    }
    let num: f64 = residuals
        .windows(2)
        .into_iter()
        .map(|w| (w[1] - w[0]).powi(2))
        .sum();
    num / denom
}

/// Ljung-Box Q statistic and its χ² p-value.
///
/// Q = n(n+2) Σ_{k=1..h} ρ_k² / (n − k), with ρ_k the sample
/// autocorrelation of the demeaned residuals. NaN when `n <= h` or the
/// residuals are constant.
pub fn ljung_box(residuals: ArrayView1<'_, f64>, lags: usize) -> (f64, f64) {
    let n = residuals.len();
    if n <= lags || lags == 0 {
        return (f64::NAN, f64::NAN);
    }
    let nf = n as f64;
    let mean = residuals.sum() / nf;
    let centered: Vec<f64> = residuals.iter().map(|e| e - mean).collect();
    let denom: f64 = centered.iter().map(|e| e * e).sum();
    if denom <= 0.0 {
        return (f64::NAN, f64::NAN);
    }
    let q = (1..=lags)
        .map(|k| {
            let acf: f64 = (k..n).map(|t| centered[t] * centered[t - k]).sum::<f64>() / denom;
            acf * acf / (nf - k as f64)
        })
        .sum::<f64>()
        * nf
        * (nf + 2.0);
    let p = ChiSquared::new(lags as f64)
        .map(|d| 1.0 - d.cdf(q))
        .unwrap_or(f64::NAN);
    (q, p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rstest::rstest;

    #[test]
    fn test_zero_target_has_zero_r2() {
        let y = Array1::zeros(24);
        let fitted = Array1::from_elem(24, 0.001);
        let d = Diagnostics::compute(&y, &fitted, 2);
        assert_eq!(d.r2, 0.0);
        assert!(!d.r2.is_nan());
    }

    #[rstest]
    #[case(array![0.01, 0.02, -0.01, 0.03, 0.00, 0.015], array![0.012, 0.018, -0.008, 0.025, 0.002, 0.01])]
    #[case(array![1.0, 2.0, 3.0, 4.0], array![1.5, 1.5, 3.5, 3.5])]
    fn test_r2_matches_definition(#[case] y: Array1<f64>, #[case] fitted: Array1<f64>) {
        let d = Diagnostics::compute(&y, &fitted, 1);
        let mean = y.mean().unwrap();
        let ss_tot: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
        let ss_res: f64 = (&y - &fitted).iter().map(|e| e * e).sum();
        assert_relative_eq!(d.r2, 1.0 - ss_res / ss_tot, epsilon = 1e-12);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    fn test_adjusted_r2_penalizes(#[case] k: usize) {
        let y = array![0.01, 0.02, -0.01, 0.03, 0.0, 0.015, -0.005, 0.02];
        let fitted = array![0.012, 0.018, -0.008, 0.025, 0.002, 0.01, 0.0, 0.018];
        let d = Diagnostics::compute(&y, &fitted, k);
        assert!(d.r2 < 1.0);
        assert!(d.adj_r2 <= d.r2);
    }

    #[test]
    fn test_adjusted_r2_unadjusted_when_too_few_obs() {
        let y = array![0.01, 0.02, -0.01];
        let fitted = array![0.012, 0.018, -0.008];
        let d = Diagnostics::compute(&y, &fitted, 2);
        assert_eq!(d.adj_r2, d.r2);
        assert!(d.aicc.is_infinite());
    }

    #[test]
    fn test_information_criteria() {
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let fitted = array![1.1, 1.9, 3.2, 3.8, 5.1, 5.9];
        let d = Diagnostics::compute(&y, &fitted, 2);
        let n = 6.0_f64;
        let ss_res = 0.01 + 0.01 + 0.04 + 0.04 + 0.01 + 0.01;
        let ll = -0.5 * n * ((2.0 * std::f64::consts::PI).ln() + (ss_res / n).ln() + 1.0);
        assert_relative_eq!(d.log_likelihood, ll, epsilon = 1e-10);
        assert_relative_eq!(d.aic, 4.0 - 2.0 * ll, epsilon = 1e-10);
        assert_relative_eq!(d.aicc, 4.0 - 2.0 * ll + 12.0 / 3.0, epsilon = 1e-10);
        assert_relative_eq!(d.bic, 2.0 * n.ln() - 2.0 * ll, epsilon = 1e-10);
    }

    #[test]
    fn test_empty_selection_is_nan() {
        let y = array![0.01, 0.02, 0.03];
        let fitted = Array1::zeros(3);
        let d = Diagnostics::compute(&y, &fitted, 0);
        assert!(d.r2.is_nan());
        assert!(d.adj_r2.is_nan());
        assert!(d.aic.is_nan());
        assert!(d.bic.is_nan());
        assert!(d.rmse.is_finite());
    }

    #[test]
    fn test_perfect_fit_has_undefined_criteria() {
        let y = array![0.01, 0.02, 0.03];
        let d = Diagnostics::compute(&y, &y, 1);
        assert_relative_eq!(d.r2, 1.0);
        assert!(d.aic.is_nan());
        assert!(d.durbin_watson.is_nan());
    }

    #[test]
    fn test_durbin_watson_alternating() {
        let e = array![1.0, -1.0, 1.0, -1.0];
        assert_relative_eq!(durbin_watson(e.view()), 12.0 / 4.0);
    }

    #[test]
    fn test_ljung_box_white_noise_vs_trend() {
        let noise = array![
            0.3, -0.5, 0.1, 0.7, -0.2, -0.6, 0.4, 0.0, -0.3, 0.5, -0.1, 0.2, -0.4, 0.6, -0.7, 0.1,
            0.3, -0.2, 0.0, -0.5
        ];
        let trend: Array1<f64> = (0..20).map(|i| i as f64).collect();
        let (q_noise, p_noise) = ljung_box(noise.view(), 6);
        let (q_trend, p_trend) = ljung_box(trend.view(), 6);
        assert!(q_trend > q_noise);
        assert!(p_trend < 0.01);
        assert!(p_noise > p_trend);
        assert!(ljung_box(array![1.0, 2.0].view(), 6).0.is_nan());
    }
}
