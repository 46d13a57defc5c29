//! Cross-validated elastic net by cyclic coordinate descent.
//!
//! Minimizes
//!
//! ```text
//! 1/(2n) ‖y − Xβ‖² + λ ρ ‖β‖₁ + λ (1 − ρ)/2 ‖β‖²
//! ```
//!
//! over a descending log-spaced λ grid starting at the smallest penalty
//! that zeroes every coefficient. Each fold runs the whole path with warm
//! starts; the λ with the lowest mean held-out MSE is refit on all rows.
//! Folds are contiguous blocks, the first `n mod folds` one row longer.

use crate::error::ModelError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use tracing::debug;

/// Standardize columns to zero mean and unit (population) variance.
///
/// Constant columns become all zeros.
pub fn standardize(x: &Array2<f64>) -> Array2<f64> {
    let n = x.nrows() as f64;
    let mut out = x.clone();
    for mut col in out.axis_iter_mut(Axis(1)) {
        let mean = col.sum() / n;
        let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let scale = if var > 0.0 { var.sqrt() } else { 1.0 };
        col.mapv_inplace(|v| (v - mean) / scale);
    }
    out
}

fn soft_threshold(z: f64, gamma: f64) -> f64 {
    if z > gamma {
        z - gamma
    } else if z < -gamma {
        z + gamma
    } else {
        0.0
    }
}

fn center(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> (Array2<f64>, Array1<f64>, Array1<f64>, f64) {
    let n = x.nrows() as f64;
    let x_mean = x.sum_axis(Axis(0)) / n;
    let y_mean = y.sum() / n;
    let xc = &x - &x_mean;
    let yc = y.mapv(|v| v - y_mean);
    (xc, yc, x_mean, y_mean)
}

/// Coordinate-descent solution for one penalty, starting from `beta`.
///
/// Returns the coefficients and whether the relative coefficient change
/// fell below `tolerance` within `max_iter` sweeps.
pub fn coordinate_descent(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    lambda: f64,
    l1_ratio: f64,
    mut beta: Array1<f64>,
    max_iter: usize,
    tolerance: f64,
) -> (Array1<f64>, bool) {
    let n = x.nrows() as f64;
    let k = x.ncols();
    let col_sq: Vec<f64> = x.axis_iter(Axis(1)).map(|c| c.dot(&c)).collect();
    let l1 = n * lambda * l1_ratio;
    let l2 = n * lambda * (1.0 - l1_ratio);
    let mut r = &y - &x.dot(&beta);

    for _ in 0..max_iter {
        let mut max_change = 0.0_f64;
        let mut max_coef = 0.0_f64;
        for j in 0..k {
            let old = beta[j];
            if col_sq[j] == 0.0 {
                beta[j] = 0.0;
                continue;
            }
            let xj = x.column(j);
            let rho = xj.dot(&r) + col_sq[j] * old;
            let new = soft_threshold(rho, l1) / (col_sq[j] + l2);
            if new != old {
                r.scaled_add(old - new, &xj);
                beta[j] = new;
            }
            max_change = max_change.max((new - old).abs());
            max_coef = max_coef.max(new.abs());
        }
        if max_coef == 0.0 || max_change / max_coef < tolerance {
            return (beta, true);
        }
    }
    (beta, false)
}

/// Log-spaced penalties from the smallest all-zero λ down to `min_ratio` of it.
pub fn lambda_grid(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    l1_ratio: f64,
    points: usize,
    min_ratio: f64,
) -> Vec<f64> {
    let (xc, yc, _, _) = center(x, y);
    let n = x.nrows() as f64;
    let lambda_max = xc
        .t()
        .dot(&yc)
        .iter()
        .fold(0.0_f64, |m, v| m.max(v.abs()))
        / (n * l1_ratio);
    if points <= 1 || !(lambda_max > 0.0) {
        return vec![lambda_max.max(f64::MIN_POSITIVE); points.max(1)];
    }
    let log_max = lambda_max.ln();
    let step = min_ratio.ln() / (points - 1) as f64;
    (0..points).map(|i| (log_max + step * i as f64).exp()).collect()
}

/// Elastic net with a cross-validated penalty.
#[derive(Debug, Clone, Copy)]
pub struct ElasticNetCv {
    /// L1 share of the penalty, in (0, 1]
    pub l1_ratio: f64,
    /// Points on the λ grid
    pub n_lambdas: usize,
    /// Smallest λ relative to the largest
    pub lambda_min_ratio: f64,
    /// Number of contiguous folds
    pub folds: usize,
    /// Sweeps per coordinate-descent solve
    pub max_iter: usize,
    /// Relative coefficient change tolerance
    pub tolerance: f64,
}

/// Result of [`ElasticNetCv::fit`].
#[derive(Debug, Clone)]
pub struct ElasticNetFit {
    /// Coefficients at the chosen λ
    pub coefficients: Array1<f64>,
    /// Chosen penalty
    pub lambda: f64,
    /// Mean held-out MSE per grid point
    pub cv_mse: Vec<f64>,
}

impl ElasticNetCv {
    /// Fit on `x` (observations × predictors) and `y` with an intercept.
    ///
    /// # Errors
    /// [`ModelError::InsufficientData`] below two observations,
    /// [`ModelError::InvalidParameter`] for an L1 ratio outside (0, 1],
    /// [`ModelError::DimensionMismatch`] when the row counts differ.
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<ElasticNetFit, ModelError> {
        let (n, k) = x.dim();
        if y.len() != n {
            return Err(ModelError::DimensionMismatch {
                expected: n,
                actual: y.len(),
            });
        }
        if n < 2 {
            return Err(ModelError::InsufficientData {
                required: 2,
                actual: n,
            });
        }
        if !(self.l1_ratio > 0.0 && self.l1_ratio <= 1.0) {
            return Err(ModelError::InvalidParameter(format!(
                "l1_ratio must be in (0, 1], got {}",
                self.l1_ratio
            )));
        }

        let lambdas = lambda_grid(
            x.view(),
            y.view(),
            self.l1_ratio,
            self.n_lambdas,
            self.lambda_min_ratio,
        );
        let folds = self.folds.clamp(2, n);
        let mut mse = vec![0.0; lambdas.len()];

        let mut start = 0;
        for f in 0..folds {
            let len = n / folds + usize::from(f < n % folds);
            let test: Vec<usize> = (start..start + len).collect();
            let train: Vec<usize> = (0..n).filter(|i| *i < start || *i >= start + len).collect();
            start += len;

            let x_train = x.select(Axis(0), &train);
            let y_train = y.select(Axis(0), &train);
            let x_test = x.select(Axis(0), &test);
            let y_test = y.select(Axis(0), &test);
            let (xc, yc, x_mean, y_mean) = center(x_train.view(), y_train.view());

            let mut beta = Array1::zeros(k);
            for (i, &lambda) in lambdas.iter().enumerate() {
                beta = self.solve(&xc, &yc, lambda, beta);
                let intercept = y_mean - x_mean.dot(&beta);
                let pred = x_test.dot(&beta) + intercept;
                let err = (&y_test - &pred).mapv(|e| e * e).sum() / test.len() as f64;
                mse[i] += err / folds as f64;
            }
        }

        let best = mse
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0, |(i, _)| i);

        let (xc, yc, _, _) = center(x.view(), y.view());
        let mut beta = Array1::zeros(k);
        for &lambda in &lambdas[..=best] {
            beta = self.solve(&xc, &yc, lambda, beta);
        }
        debug!(
            l1_ratio = self.l1_ratio,
            lambda = lambdas[best],
            nonzero = beta.iter().filter(|b| b.abs() > 0.0).count(),
            "elastic net fit"
        );

        Ok(ElasticNetFit {
            coefficients: beta,
            lambda: lambdas[best],
            cv_mse: mse,
        })
    }

    fn solve(&self, xc: &Array2<f64>, yc: &Array1<f64>, lambda: f64, warm: Array1<f64>) -> Array1<f64> {
        let (beta, converged) = coordinate_descent(
            xc.view(),
            yc.view(),
            lambda,
            self.l1_ratio,
            warm,
            self.max_iter,
            self.tolerance,
        );
        if !converged {
            debug!(lambda, l1_ratio = self.l1_ratio, "coordinate descent hit the sweep cap");
        }
        beta
    }
}
