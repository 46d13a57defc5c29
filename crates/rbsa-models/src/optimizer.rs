//! Non-negative, optionally fully-invested, least squares.
//!
//! Solves
//!
//! ```text
//! minimize   ‖y − X w‖²
//! subject to w ≥ 0
//!            Σ w = 1        (when sum_to_one is set)
//! ```
//!
//! with a primal active-set method on the normal equations `Q = XᵀX`,
//! `c = Xᵀy`. The iteration starts from the uniform portfolio with every
//! weight free. Each pass solves the equality-constrained problem on the
//! free set (a KKT system when the budget constraint is active), steps as
//! far toward it as non-negativity allows, and pins blocking weights at
//! zero. Once a full step is feasible, the bound multipliers
//! `ν_j = (Q w − c)_j + μ` decide whether a pinned weight is released.
//!
//! A tiny ridge on the diagonal keeps duplicate or collinear columns
//! solvable. If the iteration cap is reached or the arithmetic breaks down,
//! the uniform starting point is returned with [`SolverStatus::FellBack`].

use crate::linalg::solve_linear_system;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Ridge added to the diagonal, relative to the problem scale.
const RIDGE: f64 = 1e-10;

/// Ridge escalations attempted for a singular subproblem.
const RIDGE_RETRIES: usize = 6;

/// Weights at or below this value are pinned to the bound.
const ZERO_WEIGHT: f64 = 1e-15;

/// Errors returned by the optimizer.
///
/// Non-convergence is not an error; see [`SolverStatus`].
#[derive(Debug, Error)]
pub enum OptimizerError {
    /// Design matrix and target disagree on the number of observations
    #[error("Dimension mismatch: design has {expected} rows, target has {actual} observations")]
    DimensionMismatch {
        /// Rows of the design matrix
        expected: usize,
        /// Length of the target vector
        actual: usize,
    },
}

/// Optimizer configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OptimizerConfig {
    /// Require weights to sum to one (default: true)
    pub sum_to_one: bool,

    /// Maximum active-set iterations (default: 1000)
    pub max_iterations: usize,

    /// Optimality tolerance on the bound multipliers, scaled by the
    /// largest diagonal entry of XᵀX (default: 1e-9)
    pub tolerance: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            sum_to_one: true,
            max_iterations: 1000,
            tolerance: 1e-9,
        }
    }
}

impl OptimizerConfig {
    /// Default configuration with the given budget policy.
    pub fn with_sum_to_one(sum_to_one: bool) -> Self {
        Self {
            sum_to_one,
            ..Self::default()
        }
    }
}

/// How the optimizer arrived at its weights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SolverStatus {
    /// Optimality conditions were met
    Converged {
        /// Active-set iterations used
        iterations: usize,
    },
    /// The uniform starting point was returned instead
    FellBack {
        /// Why the solver gave up
        reason: String,
    },
}

impl SolverStatus {
    /// Whether the solver converged.
    pub const fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }
}

/// Weights plus solver status.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutput {
    /// Non-negative weights, one per design column
    pub weights: Array1<f64>,
    /// Convergence status
    pub status: SolverStatus,
}

/// Constrained least-squares solver.
#[derive(Debug, Clone, Default)]
pub struct ConstrainedOptimizer {
    config: OptimizerConfig,
}

impl ConstrainedOptimizer {
    /// Create a new optimizer with the given configuration
    pub const fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Optimizer configuration.
    pub const fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Fit weights for design `x` (observations × assets) and target `y`.
    ///
    /// # Errors
    /// Returns [`OptimizerError::DimensionMismatch`] when the row counts
    /// differ. Every other failure is absorbed by the fallback.
    pub fn solve(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<SolverOutput, OptimizerError> {
        let (n, k) = x.dim();
        if n != y.len() {
            return Err(OptimizerError::DimensionMismatch {
                expected: n,
                actual: y.len(),
            });
        }
        if k == 0 {
            return Ok(SolverOutput {
                weights: Array1::zeros(0),
                status: SolverStatus::Converged { iterations: 0 },
            });
        }

        let q = x.t().dot(x);
        let c = x.t().dot(y);

        let output = match self.active_set(&q, &c) {
            Ok((w, iterations)) => {
                let weights = self.project(w);
                if weights.iter().all(|v| v.is_finite()) {
                    SolverOutput {
                        weights,
                        status: SolverStatus::Converged { iterations },
                    }
                } else {
                    self.fallback(k, "non-finite solution".to_string())
                }
            }
            Err(reason) => self.fallback(k, reason),
        };
        Ok(output)
    }

    fn active_set(&self, q: &Array2<f64>, c: &Array1<f64>) -> Result<(Array1<f64>, usize), String> {
        let k = c.len();
        let scale = 1.0 + q.diag().iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        if !scale.is_finite() || c.iter().any(|v| !v.is_finite()) {
            return Err("non-finite inputs".to_string());
        }
        let ridge = RIDGE * scale;
        let tol = self.config.tolerance * scale;

        let mut w = Array1::from_elem(k, 1.0 / k as f64);
        let mut free = vec![true; k];

        for iteration in 1..=self.config.max_iterations {
            let free_idx: Vec<usize> = (0..k).filter(|&j| free[j]).collect();

            if !free_idx.is_empty() {
                let p = self.subproblem(q, c, &free_idx, ridge)?;

                let blocking = free_idx
                    .iter()
                    .enumerate()
                    .filter(|&(pos, _)| p[pos] < 0.0)
                    .map(|(pos, &j)| (j, w[j] / (w[j] - p[pos])))
                    .min_by(|a, b| a.1.total_cmp(&b.1));
                let alpha = blocking.map_or(1.0, |(_, a)| a.clamp(0.0, 1.0));

                for (pos, &j) in free_idx.iter().enumerate() {
                    w[j] += alpha * (p[pos] - w[j]);
                }

                if let Some((block, _)) = blocking {
                    for &j in &free_idx {
                        if j == block || w[j] <= ZERO_WEIGHT {
                            w[j] = 0.0;
                            free[j] = false;
                        }
                    }
                    continue;
                }
            }

            let g = q.dot(&w) - c;
            let mu = if self.config.sum_to_one && !free_idx.is_empty() {
                -free_idx.iter().map(|&j| g[j]).sum::<f64>() / free_idx.len() as f64
            } else {
                0.0
            };

            let release = (0..k)
                .filter(|&j| !free[j])
                .map(|j| (j, g[j] + mu))
                .min_by(|a, b| a.1.total_cmp(&b.1));

            match release {
                Some((j, nu)) if nu < -tol => free[j] = true,
                _ => return Ok((w, iteration)),
            }
        }

        Err(format!(
            "iteration cap of {} reached",
            self.config.max_iterations
        ))
    }

    /// Minimize over the free set with every other weight pinned at zero.
    fn subproblem(
        &self,
        q: &Array2<f64>,
        c: &Array1<f64>,
        free_idx: &[usize],
        ridge: f64,
    ) -> Result<Array1<f64>, String> {
        let m = free_idx.len();
        let dim = if self.config.sum_to_one { m + 1 } else { m };
        let mut a = Array2::zeros((dim, dim));
        let mut b = Array1::zeros(dim);
        for (r, &i) in free_idx.iter().enumerate() {
            for (s, &j) in free_idx.iter().enumerate() {
                a[[r, s]] = q[[i, j]];
            }
            a[[r, r]] += ridge;
            b[r] = c[i];
        }
        if self.config.sum_to_one {
            for r in 0..m {
                a[[r, m]] = 1.0;
                a[[m, r]] = 1.0;
            }
            b[m] = 1.0;
        }

        let mut extra = ridge;
        for _ in 0..RIDGE_RETRIES {
            if let Some(solution) = solve_linear_system(&a, &b) {
                return Ok(solution.iter().take(m).copied().collect());
            }
            extra *= 100.0;
            for r in 0..m {
                a[[r, r]] += extra;
            }
        }
        Err("singular subproblem".to_string())
    }

    /// Clip numerical noise below zero and restore the budget.
    fn project(&self, w: Array1<f64>) -> Array1<f64> {
        let clipped = w.mapv(|v| v.max(0.0));
        let total = clipped.sum();
        if self.config.sum_to_one && total > 0.0 {
            clipped / total
        } else {
            clipped
        }
    }

    fn fallback(&self, k: usize, reason: String) -> SolverOutput {
        warn!(assets = k, %reason, "optimizer fell back to uniform weights");
        let uniform = Array1::from_elem(k, 1.0 / k as f64);
        SolverOutput {
            weights: self.project(uniform),
            status: SolverStatus::FellBack { reason },
        }
    }
}

/// Non-negative least squares, optionally constrained to the simplex.
pub fn nnls_simplex(
    x: &Array2<f64>,
    y: &Array1<f64>,
    sum_to_one: bool,
) -> Result<SolverOutput, OptimizerError> {
    ConstrainedOptimizer::new(OptimizerConfig::with_sum_to_one(sum_to_one)).solve(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Axis, array};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::rstest;

    fn random_design(rng: &mut StdRng, n: usize, k: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, k), |_| rng.gen_range(-0.05..0.05))
    }

    #[test]
    fn test_recovers_simplex_mixture() {
        let mut rng = StdRng::seed_from_u64(7);
        let x = random_design(&mut rng, 120, 4);
        let truth = array![0.3, 0.0, 0.7, 0.0];
        let y = x.dot(&truth);
        let out = nnls_simplex(&x, &y, true).unwrap();
        assert!(out.status.is_converged());
        for j in 0..4 {
            assert_relative_eq!(out.weights[j], truth[j], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_without_budget_constraint() {
        let mut rng = StdRng::seed_from_u64(11);
        let x = random_design(&mut rng, 80, 3);
        let y = x.column(0).to_owned() * 0.5;
        let out = nnls_simplex(&x, &y, false).unwrap();
        assert_relative_eq!(out.weights[0], 0.5, epsilon = 1e-6);
        assert_relative_eq!(out.weights[1], 0.0, epsilon = 1e-6);
        assert_relative_eq!(out.weights[2], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_negative_exposure_is_pinned_at_zero() {
        let mut rng = StdRng::seed_from_u64(3);
        let x = random_design(&mut rng, 60, 2);
        let y = x.column(0).mapv(|v| -v);
        let out = nnls_simplex(&x, &y, false).unwrap();
        assert_relative_eq!(out.weights[0], 0.0, epsilon = 1e-9);
    }

    #[rstest]
    #[case(1, 50, 3, true)]
    #[case(2, 50, 8, true)]
    #[case(3, 30, 10, false)]
    #[case(4, 200, 15, true)]
    #[case(5, 12, 12, false)]
    fn test_feasibility(
        #[case] seed: u64,
        #[case] n: usize,
        #[case] k: usize,
        #[case] sum_to_one: bool,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let x = random_design(&mut rng, n, k);
        let y: Array1<f64> = (0..n).map(|_| rng.gen_range(-0.05..0.05)).collect();
        let out = nnls_simplex(&x, &y, sum_to_one).unwrap();
        assert_eq!(out.weights.len(), k);
        assert!(out.weights.iter().all(|&w| w >= -1e-9));
        if sum_to_one {
            assert!((out.weights.sum() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_idempotent_refit() {
        let mut rng = StdRng::seed_from_u64(21);
        let x = random_design(&mut rng, 90, 5);
        let y: Array1<f64> = (0..90).map(|_| rng.gen_range(-0.05..0.05)).collect();
        let first = nnls_simplex(&x, &y, true).unwrap();
        let fitted = x.dot(&first.weights);
        let second = nnls_simplex(&x, &fitted, true).unwrap();
        for j in 0..5 {
            assert_relative_eq!(first.weights[j], second.weights[j], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_duplicate_columns() {
        let mut rng = StdRng::seed_from_u64(5);
        let col = random_design(&mut rng, 40, 1);
        let x = ndarray::concatenate(Axis(1), &[col.view(), col.view()]).unwrap();
        let y = col.column(0).to_owned();
        let out = nnls_simplex(&x, &y, true).unwrap();
        assert!(out.status.is_converged());
        assert_relative_eq!(out.weights.sum(), 1.0, epsilon = 1e-9);
        let resid = &y - &x.dot(&out.weights);
        assert!(resid.iter().all(|r| r.abs() < 1e-8));
    }

    #[test]
    fn test_dimension_mismatch() {
        let x = Array2::<f64>::zeros((5, 2));
        let y = Array1::<f64>::zeros(4);
        assert!(matches!(
            nnls_simplex(&x, &y, true),
            Err(OptimizerError::DimensionMismatch { expected: 5, actual: 4 })
        ));
    }

    #[test]
    fn test_empty_design() {
        let x = Array2::<f64>::zeros((5, 0));
        let y = Array1::<f64>::zeros(5);
        let out = nnls_simplex(&x, &y, true).unwrap();
        assert!(out.weights.is_empty());
    }

    #[test]
    fn test_non_finite_inputs_fall_back() {
        let x = array![[f64::NAN, 0.1], [0.2, 0.3], [0.1, -0.1]];
        let y = array![0.1, 0.2, 0.0];
        let out = nnls_simplex(&x, &y, true).unwrap();
        assert!(matches!(out.status, SolverStatus::FellBack { .. }));
        assert_relative_eq!(out.weights[0], 0.5);
        assert_relative_eq!(out.weights[1], 0.5);
    }
}
