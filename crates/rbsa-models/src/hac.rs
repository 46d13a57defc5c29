//! Newey-West HAC standard errors for style weights.
//!
//! Style regressions on monthly returns routinely leave serially correlated
//! residuals, so plain OLS standard errors overstate precision. The sandwich
//! estimator
//!
//! ```text
//! Var(w) = (1/T) B⁻¹ S B⁻¹
//! B = XᵀX / T
//! S = Γ_0 + Σ_{l=1}^{L} w_l (Γ_l + Γ_lᵀ)
//! Γ_l = (1/T) Σ_{t=l+1}^T (x_t e_t)(x_{t-l} e_{t-l})ᵀ
//! w_l = 1 − l/(L+1)       (Bartlett kernel)
//! ```
//!
//! treats the weights as unconstrained; for weights pinned at zero by the
//! optimizer the result is only indicative.
//!
//! # References
//! - Newey, W. K., & West, K. D. (1987). "A Simple, Positive Semi-Definite,
//!   Heteroskedasticity and Autocorrelation Consistent Covariance Matrix."
//!   Econometrica, 55(3), 703-708.

use crate::error::ModelError;
use crate::linalg::invert;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// HAC estimator configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HacConfig {
    /// Number of lags (default: 6). `None` selects ceil(4 (T/100)^(2/9)).
    pub lags: Option<usize>,

    /// Minimum number of observations required (default: 3)
    pub min_observations: usize,
}

impl Default for HacConfig {
    fn default() -> Self {
        Self {
            lags: Some(6),
            min_observations: 3,
        }
    }
}

/// Newey-West sandwich estimator for regression weights
#[derive(Debug, Clone, Copy, Default)]
pub struct HacEstimator {
    config: HacConfig,
}

impl HacEstimator {
    /// Create a new estimator with the given configuration
    pub const fn new(config: HacConfig) -> Self {
        Self { config }
    }

    /// Lag length actually used for `n_periods` observations.
    pub fn lags(&self, n_periods: usize) -> usize {
        let lags = self.config.lags.unwrap_or_else(|| {
            let t = n_periods as f64;
            (4.0 * (t / 100.0).powf(2.0 / 9.0)).ceil() as usize
        });
        lags.min(n_periods.saturating_sub(1))
    }

    fn bartlett_weight(lag: usize, max_lag: usize) -> f64 {
        if lag == 0 {
            1.0
        } else if lag <= max_lag {
            1.0 - (lag as f64) / (max_lag as f64 + 1.0)
        } else {
            0.0
        }
    }

    /// Covariance matrix of the weights.
    ///
    /// # Errors
    /// [`ModelError::DimensionMismatch`] when `x` and `residuals` disagree,
    /// [`ModelError::InsufficientData`] below the observation minimum.
    pub fn covariance(
        &self,
        x: &Array2<f64>,
        residuals: &Array1<f64>,
    ) -> Result<Option<Array2<f64>>, ModelError> {
        let (n, k) = x.dim();
        if residuals.len() != n {
            return Err(ModelError::DimensionMismatch {
                expected: n,
                actual: residuals.len(),
            });
        }
        if n < self.config.min_observations {
            return Err(ModelError::InsufficientData {
                required: self.config.min_observations,
                actual: n,
            });
        }
        let t = n as f64;

        // Scores u_t = x_t e_t
        let mut scores = x.clone();
        for (mut row, e) in scores.rows_mut().into_iter().zip(residuals.iter()) {
            row *= *e;
        }

        let max_lag = self.lags(n);
        let mut meat = scores.t().dot(&scores) / t;
        for lag in 1..=max_lag {
            let mut gamma = Array2::<f64>::zeros((k, k));
            for s in lag..n {
                for i in 0..k {
                    for j in 0..k {
                        gamma[[i, j]] += scores[[s, i]] * scores[[s - lag, j]];
                    }
                }
            }
            gamma /= t;
            let w = Self::bartlett_weight(lag, max_lag);
            meat = meat + (&gamma + &gamma.t()) * w;
        }

        let bread = match invert(&(x.t().dot(x) / t)) {
            Some(b) => b,
            None => return Ok(None),
        };
        Ok(Some(bread.dot(&meat).dot(&bread) / t))
    }

    /// Standard errors of the weights; NaN when XᵀX is singular.
    pub fn standard_errors(
        &self,
        x: &Array2<f64>,
        residuals: &Array1<f64>,
    ) -> Result<Array1<f64>, ModelError> {
        let k = x.ncols();
        Ok(match self.covariance(x, residuals)? {
            Some(cov) => cov.diag().mapv(|v| v.max(0.0).sqrt()),
            None => Array1::from_elem(k, f64::NAN),
        })
    }
}
