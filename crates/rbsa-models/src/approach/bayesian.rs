//! Approach C: spike-and-slab style weights by MCMC.
//!
//! The state is a vector of inclusion indicators γ, simplex weights w and a
//! residual variance σ². The effective allocation renormalizes w over the
//! included assets. One iteration
//!
//! 1. Gibbs-updates each γ_j from the include/exclude log-likelihood ratio
//!    plus the prior log-odds (capped at ±20),
//! 2. proposes new active weights from Dirichlet(100 w + 0.1) and accepts
//!    with probability min(1, likelihood ratio); with nothing active the
//!    weights reset to uniform over all assets and that vector is stored,
//! 3. draws σ² from its inverse-gamma conditional.
//!
//! Priors: γ_j ~ Bernoulli(0.3), w ~ Dirichlet(1), σ² ~ IG(2, 0.01).

use crate::candidate::{Approach, Candidate, StyleEstimator};
use crate::config::BayesianConfig;
use crate::error::ModelError;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Gamma};
use rbsa_data::preprocess::quantile_sorted;
use rbsa_data::{ReturnMatrix, ReturnSeries};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Log-odds are clamped to this magnitude before the logistic transform.
const MAX_LOG_ODDS: f64 = 20.0;

/// Draws kept after burn-in.
#[derive(Debug, Clone, PartialEq)]
pub struct PosteriorSamples {
    /// Inclusion indicators (draws × assets)
    pub inclusion: Array2<bool>,
    /// Effective weights (draws × assets)
    pub weights: Array2<f64>,
    /// Residual variance per draw
    pub sigma2: Array1<f64>,
    /// Gaussian log-likelihood per draw
    pub log_likelihood: Array1<f64>,
    /// Accepted weight proposals over the whole run
    pub accepted: usize,
}

impl PosteriorSamples {
    /// Number of stored draws.
    pub fn len(&self) -> usize {
        self.sigma2.len()
    }

    /// Whether no draws were stored.
    pub fn is_empty(&self) -> bool {
        self.sigma2.is_empty()
    }

    /// Posterior inclusion probability per asset.
    pub fn inclusion_probabilities(&self) -> Array1<f64> {
        let draws = self.len().max(1) as f64;
        self.inclusion
            .axis_iter(Axis(1))
            .map(|col| col.iter().filter(|&&g| g).count() as f64 / draws)
            .collect()
    }
}

/// Per-asset posterior summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSummary {
    /// Asset names, universe order
    pub assets: Vec<String>,
    /// Posterior inclusion probabilities
    pub pip: Array1<f64>,
    /// Posterior mean weights
    pub mean: Array1<f64>,
    /// Posterior weight standard deviations
    pub std: Array1<f64>,
    /// 2.5th percentile of each weight
    pub lower: Array1<f64>,
    /// 97.5th percentile of each weight
    pub upper: Array1<f64>,
}

impl PosteriorSummary {
    /// Summarize stored draws.
    pub fn from_samples(assets: &[String], samples: &PosteriorSamples) -> Self {
        let k = assets.len();
        let mut mean = Array1::zeros(k);
        let mut std = Array1::zeros(k);
        let mut lower = Array1::zeros(k);
        let mut upper = Array1::zeros(k);
        for (j, col) in samples.weights.axis_iter(Axis(1)).enumerate() {
            let n = col.len();
            if n == 0 {
                mean[j] = f64::NAN;
                std[j] = f64::NAN;
                lower[j] = f64::NAN;
                upper[j] = f64::NAN;
                continue;
            }
            let m = col.sum() / n as f64;
            mean[j] = m;
            std[j] = (col.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n as f64).sqrt();
            let mut sorted = col.to_vec();
            sorted.sort_by(f64::total_cmp);
            lower[j] = quantile_sorted(&sorted, 0.025);
            upper[j] = quantile_sorted(&sorted, 0.975);
        }
        Self {
            assets: assets.to_vec(),
            pip: samples.inclusion_probabilities(),
            mean,
            std,
            lower,
            upper,
        }
    }

    /// Assets whose inclusion probability reaches `threshold`.
    pub fn selected(&self, threshold: f64) -> Vec<String> {
        self.assets
            .iter()
            .zip(self.pip.iter())
            .filter(|&(_, &p)| p >= threshold)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Spike-and-slab sampler.
#[derive(Debug, Clone, Default)]
pub struct SpikeSlabSampler {
    config: BayesianConfig,
}

struct Chain<'a> {
    x: &'a Array2<f64>,
    y: ArrayView1<'a, f64>,
}

impl Chain<'_> {
    /// Weights renormalized over the included assets, keeping stale entries
    /// of excluded assets in `w` so a re-included asset resumes its old share.
    fn effective(w: &Array1<f64>, gamma: &[bool]) -> Array1<f64> {
        let total: f64 = w.iter().zip(gamma).filter(|&(_, &g)| g).map(|(v, _)| v).sum();
        if total <= 0.0 {
            return Array1::zeros(w.len());
        }
        w.iter()
            .zip(gamma)
            .map(|(&v, &g)| if g { v / total } else { 0.0 })
            .collect()
    }

    fn sse(&self, w_eff: &Array1<f64>) -> f64 {
        (&self.y - &self.x.dot(w_eff)).mapv(|e| e * e).sum()
    }

    fn log_likelihood(&self, w_eff: &Array1<f64>, sigma2: f64) -> f64 {
        let n = self.y.len() as f64;
        -0.5 * n * (2.0 * std::f64::consts::PI * sigma2).ln() - 0.5 * self.sse(w_eff) / sigma2
    }
}

fn gamma_draw(rng: &mut StdRng, shape: f64, scale: f64) -> Result<f64, ModelError> {
    Gamma::new(shape, scale)
        .map(|d| d.sample(rng))
        .map_err(|e| ModelError::Sampling(format!("gamma({shape}, {scale}): {e}")))
}

fn dirichlet_draw(rng: &mut StdRng, alpha: &[f64]) -> Result<Vec<f64>, ModelError> {
    let draws = alpha
        .iter()
        .map(|&a| gamma_draw(rng, a, 1.0))
        .collect::<Result<Vec<_>, _>>()?;
    let total: f64 = draws.iter().sum();
    if total > 0.0 {
        Ok(draws.into_iter().map(|g| g / total).collect())
    } else {
        let n = alpha.len() as f64;
        Ok(vec![1.0 / n; alpha.len()])
    }
}

impl SpikeSlabSampler {
    /// Create a new sampler with the given configuration
    pub const fn new(config: BayesianConfig) -> Self {
        Self { config }
    }

    /// Sampler configuration.
    pub const fn config(&self) -> &BayesianConfig {
        &self.config
    }

    /// Run the chain and return the post burn-in draws.
    ///
    /// # Errors
    /// [`ModelError::InvalidParameter`] when burn-in is not below the
    /// sample count, [`ModelError::DimensionMismatch`] for misaligned
    /// inputs, [`ModelError::Sampling`] if a conditional cannot be built.
    pub fn sample(&self, assets: &ReturnMatrix, fund: &ReturnSeries) -> Result<PosteriorSamples, ModelError> {
        let cfg = &self.config;
        if cfg.burnin >= cfg.samples {
            return Err(ModelError::InvalidParameter(format!(
                "mcmc_burnin ({}) must be smaller than mcmc_samples ({})",
                cfg.burnin, cfg.samples
            )));
        }
        if assets.n_obs() != fund.len() {
            return Err(ModelError::DimensionMismatch {
                expected: assets.n_obs(),
                actual: fund.len(),
            });
        }

        let k = assets.n_assets();
        let n = fund.len() as f64;
        let chain = Chain {
            x: assets.values(),
            y: fund.values().view(),
        };
        let kept = cfg.samples - cfg.burnin;
        let prior_log_odds = (cfg.prior_inclusion / (1.0 - cfg.prior_inclusion)).ln();

        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let mut gamma: Vec<bool> = (0..k).map(|_| rng.r#gen::<f64>() < cfg.prior_inclusion).collect();
        let mut w = Array1::from(dirichlet_draw(&mut rng, &vec![1.0; k])?);
        let mut sigma2 = cfg.initial_variance;

        let mut inclusion = Array2::from_elem((kept, k), false);
        let mut weights = Array2::zeros((kept, k));
        let mut sigma2_draws = Array1::zeros(kept);
        let mut log_likelihood = Array1::zeros(kept);
        let mut accepted = 0;

        for iter in 0..cfg.samples {
            for j in 0..k {
                gamma[j] = true;
                let ll_in = chain.log_likelihood(&Chain::effective(&w, &gamma), sigma2);
                gamma[j] = false;
                let ll_out = chain.log_likelihood(&Chain::effective(&w, &gamma), sigma2);
                let log_odds = (ll_in - ll_out + prior_log_odds).clamp(-MAX_LOG_ODDS, MAX_LOG_ODDS);
                let p = 1.0 / (1.0 + (-log_odds).exp());
                gamma[j] = rng.r#gen::<f64>() < p;
            }

            let active: Vec<usize> = (0..k).filter(|&j| gamma[j]).collect();
            let w_eff = if active.is_empty() {
                w.fill(1.0 / k.max(1) as f64);
                w.clone()
            } else {
                let current = Chain::effective(&w, &gamma);
                let alpha: Vec<f64> = active
                    .iter()
                    .map(|&j| cfg.proposal_concentration * current[j] + cfg.proposal_floor)
                    .collect();
                let draw = dirichlet_draw(&mut rng, &alpha)?;
                let mut proposal = w.clone();
                for (&j, v) in active.iter().zip(draw) {
                    proposal[j] = v;
                }
                let ll_current = chain.log_likelihood(&current, sigma2);
                let ll_proposal = chain.log_likelihood(&Chain::effective(&proposal, &gamma), sigma2);
                let ratio = (ll_proposal - ll_current).min(0.0).exp();
                if rng.r#gen::<f64>() < ratio {
                    w = proposal;
                    accepted += 1;
                }
                Chain::effective(&w, &gamma)
            };

            let shape = cfg.variance_shape + 0.5 * n;
            let scale = cfg.variance_scale + 0.5 * chain.sse(&w_eff);
            sigma2 = 1.0 / gamma_draw(&mut rng, shape, 1.0 / scale)?;

            if iter >= cfg.burnin {
                let row = iter - cfg.burnin;
                for j in 0..k {
                    inclusion[[row, j]] = gamma[j];
                }
                weights.row_mut(row).assign(&w_eff);
                sigma2_draws[row] = sigma2;
                log_likelihood[row] = chain.log_likelihood(&w_eff, sigma2);
            }
        }

        debug!(
            draws = kept,
            acceptance = accepted as f64 / cfg.samples as f64,
            "spike-and-slab chain finished"
        );
        Ok(PosteriorSamples {
            inclusion,
            weights,
            sigma2: sigma2_draws,
            log_likelihood,
            accepted,
        })
    }
}

impl StyleEstimator for SpikeSlabSampler {
    fn approach(&self) -> Approach {
        Approach::Bayesian
    }

    fn fit(&self, assets: &ReturnMatrix, fund: &ReturnSeries) -> Result<Candidate, ModelError> {
        let samples = self.sample(assets, fund)?;
        let summary = PosteriorSummary::from_samples(assets.names(), &samples);
        let selected = summary.selected(self.config.pip_threshold);
        let candidate = Candidate::fit(Approach::Bayesian, assets, fund, &selected, true)?
            .with_posterior(summary);
        info!(
            assets = candidate.n_assets(),
            r2 = candidate.diagnostics.r2,
            "bayesian selection complete"
        );
        Ok(candidate)
    }
}
