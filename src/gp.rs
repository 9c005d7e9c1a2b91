//! Gaussian-process regression surrogate.
//!
//! A single-output GP with a caller-supplied [`Kernel`] and a homoskedastic
//! Gaussian likelihood. Outcomes are standardized to zero mean and unit
//! variance before fitting; inputs are used as-is. Kernel and noise
//! hyperparameters are fitted afresh on every call to [`GpModel::fit`] by
//! maximizing the log marginal likelihood plus the log priors.

use nalgebra::linalg::Cholesky;
use nalgebra::{DVector, Dyn};

use crate::error::{Error, Result};
use crate::kernel::{GammaPrior, Kernel};
use crate::optim::lbfgs::{LbfgsOptions, minimize_bounded};

/// Prior on the likelihood noise variance.
const NOISE_PRIOR: GammaPrior = GammaPrior {
    concentration: 1.1,
    rate: 0.05,
};
/// Lower bound on the inferred noise variance.
const MIN_NOISE: f64 = 1e-4;
/// Upper bound on the inferred noise variance.
const MAX_NOISE: f64 = 10.0;
/// Box on the log kernel hyperparameters.
const LOG_PARAM_BOUNDS: (f64, f64) = (-9.0, 9.0);
/// Standard deviations below this are treated as constant outcomes.
const MIN_STD: f64 = 1e-8;
/// ln(2π)
const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Marginal posterior at one point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Posterior {
    pub mean: f64,
    pub variance: f64,
}

impl Posterior {
    #[must_use]
    pub fn std(&self) -> f64 {
        self.variance.max(0.0).sqrt()
    }
}

/// A probabilistic regression model that can be queried pointwise.
pub trait Surrogate {
    /// Input dimensionality.
    fn dim(&self) -> usize;

    /// Posterior of the latent function (without observation noise) at `x`.
    fn posterior(&self, x: &[f64]) -> Posterior;
}

/// A fitted GP conditioned on its training data.
pub struct GpModel {
    kernel: Kernel,
    noise: f64,
    x_train: Vec<Vec<f64>>,
    cholesky: Cholesky<f64, Dyn>,
    alpha: DVector<f64>,
    y_mean: f64,
    y_std: f64,
}

impl core::fmt::Debug for GpModel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GpModel")
            .field("kernel", &self.kernel)
            .field("noise", &self.noise)
            .field("n_train", &self.x_train.len())
            .field("y_mean", &self.y_mean)
            .field("y_std", &self.y_std)
            .finish_non_exhaustive()
    }
}

impl GpModel {
    /// Fit hyperparameters by MAP estimation and condition on `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`NoObservations`](Error::NoObservations) for empty data,
    /// [`Data`](Error::Data) if `x` and `y` disagree in length, and
    /// [`NotPositiveDefinite`](Error::NotPositiveDefinite) if no
    /// hyperparameter setting yields a factorizable kernel matrix.
    pub fn fit(x: &[Vec<f64>], y: &[f64], kernel: Kernel) -> Result<Self> {
        check_training_data(x, y)?;
        let (y_s, _, _) = standardize(y);

        let n_kernel = kernel.n_params();
        let mut bounds = vec![LOG_PARAM_BOUNDS; n_kernel];
        bounds.push((MIN_NOISE.ln(), MAX_NOISE.ln()));

        let mut starts = Vec::with_capacity(3);
        let mut defaults = kernel.log_params();
        defaults.push(core::f64::consts::LN_2.ln());
        starts.push(defaults.clone());
        let mut modes = kernel.log_prior_modes();
        modes.push(NOISE_PRIOR.mode().min(MAX_NOISE).ln());
        starts.push(modes);
        if let Some(noise) = defaults.last_mut() {
            *noise = 1e-3_f64.ln();
        }
        starts.push(defaults);

        let objective = |theta: &[f64]| neg_log_posterior(&kernel, theta, x, &y_s);
        let options = LbfgsOptions::default();

        let mut best: Option<(Vec<f64>, f64)> = None;
        for mut start in starts {
            for (v, &(lo, hi)) in start.iter_mut().zip(&bounds) {
                *v = v.clamp(lo, hi);
            }
            let result = minimize_bounded(objective, &start, &bounds, &options);
            if result.fval.is_finite() && best.as_ref().is_none_or(|(_, f)| result.fval < *f) {
                best = Some((result.x, result.fval));
            }
        }
        let (theta, _fval) = best.ok_or(Error::NotPositiveDefinite)?;
        trace_debug!(neg_log_posterior = _fval, params = ?theta, "hyperparameters fitted");

        let mut kernel = kernel;
        kernel.set_log_params(&theta[..n_kernel]);
        Self::condition(x, y, kernel, theta[n_kernel].exp())
    }

    /// Condition on `(x, y)` with fixed hyperparameters.
    ///
    /// # Errors
    ///
    /// Same as [`GpModel::fit`], without the hyperparameter search.
    pub fn condition(x: &[Vec<f64>], y: &[f64], kernel: Kernel, noise: f64) -> Result<Self> {
        check_training_data(x, y)?;
        let (y_s, y_mean, y_std) = standardize(y);

        let mut k = kernel.gram(x);
        for i in 0..x.len() {
            k[(i, i)] += noise;
        }
        let cholesky = Cholesky::new(k).ok_or(Error::NotPositiveDefinite)?;
        let alpha = cholesky.solve(&DVector::from_column_slice(&y_s));

        Ok(Self {
            kernel,
            noise,
            x_train: x.to_vec(),
            cholesky,
            alpha,
            y_mean,
            y_std,
        })
    }

    #[must_use]
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Inferred noise variance in standardized units.
    #[must_use]
    pub fn noise(&self) -> f64 {
        self.noise
    }

    #[must_use]
    pub fn n_train(&self) -> usize {
        self.x_train.len()
    }
}

impl Surrogate for GpModel {
    fn dim(&self) -> usize {
        self.x_train.first().map_or(0, Vec::len)
    }

    fn posterior(&self, x: &[f64]) -> Posterior {
        let k_star = self.kernel.cross(x, &self.x_train);
        let mean = k_star.dot(&self.alpha);
        let v = self.cholesky.solve(&k_star);
        let var = (self.kernel.diag(x) - k_star.dot(&v)).max(0.0);
        Posterior {
            mean: mean * self.y_std + self.y_mean,
            variance: var * self.y_std * self.y_std,
        }
    }
}

fn check_training_data(x: &[Vec<f64>], y: &[f64]) -> Result<()> {
    if y.is_empty() {
        return Err(Error::NoObservations);
    }
    if x.len() != y.len() {
        return Err(Error::Data(format!(
            "{} inputs but {} outcomes",
            x.len(),
            y.len()
        )));
    }
    Ok(())
}

/// Standardize outcomes. Returns `(standardized, mean, std)`.
#[allow(clippy::cast_precision_loss)]
fn standardize(y: &[f64]) -> (Vec<f64>, f64, f64) {
    let n = y.len();
    let mean = y.iter().sum::<f64>() / n as f64;
    let std = if n > 1 {
        let var = y.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.sqrt()
    } else {
        1.0
    };
    let std = if std < MIN_STD { 1.0 } else { std };
    (y.iter().map(|&v| (v - mean) / std).collect(), mean, std)
}

/// Negative log posterior of the hyperparameters, scaled by `1/n`.
#[allow(clippy::cast_precision_loss)]
fn neg_log_posterior(kernel: &Kernel, theta: &[f64], x: &[Vec<f64>], y: &[f64]) -> f64 {
    let mut kernel = kernel.clone();
    let n_kernel = kernel.set_log_params(theta);
    let noise = theta[n_kernel].exp();

    let n = y.len();
    let mut k = kernel.gram(x);
    for i in 0..n {
        k[(i, i)] += noise;
    }
    let Some(chol) = Cholesky::new(k) else {
        return f64::INFINITY;
    };
    let y_vec = DVector::from_column_slice(y);
    let alpha = chol.solve(&y_vec);
    let l = chol.l();
    let log_det_half: f64 = (0..n).map(|i| l[(i, i)].ln()).sum();
    let lml = -0.5 * y_vec.dot(&alpha) - log_det_half - 0.5 * n as f64 * LN_2PI;
    let log_prior = kernel.log_prior() + NOISE_PRIOR.log_prob_unnormalized(noise);
    -(lml + log_prior) / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaled_matern(d: usize) -> Kernel {
        Kernel::scale(
            Kernel::matern(0..d, Some(GammaPrior::new(3.0, 6.0))),
            Some(GammaPrior::new(2.0, 0.15)),
        )
    }

    #[test]
    fn fit_interpolates_smooth_function() {
        let x: Vec<Vec<f64>> = (0..8).map(|i| vec![f64::from(i) / 7.0]).collect();
        let y: Vec<f64> = x.iter().map(|v| (3.0 * v[0]).sin()).collect();
        let gp = GpModel::fit(&x, &y, scaled_matern(1)).unwrap();

        for (xi, &yi) in x.iter().zip(&y) {
            let post = gp.posterior(xi);
            assert!(
                (post.mean - yi).abs() < 0.15,
                "mean {} should be close to {yi}",
                post.mean
            );
        }
        assert_eq!(gp.n_train(), 8);
        assert!(gp.noise() >= MIN_NOISE * (1.0 - 1e-9));
    }

    #[test]
    fn variance_grows_away_from_data() {
        let x = vec![vec![0.0], vec![0.1], vec![0.2]];
        let y = vec![1.0, 1.2, 0.9];
        let gp = GpModel::fit(&x, &y, scaled_matern(1)).unwrap();
        let near = gp.posterior(&[0.1]).variance;
        let far = gp.posterior(&[5.0]).variance;
        assert!(far > near);
    }

    #[test]
    fn single_observation_reverts_to_its_value() {
        let gp = GpModel::fit(&[vec![0.5, 0.5]], &[3.0], scaled_matern(2)).unwrap();
        // Standardization with one point keeps unit scale and centres on the value.
        let far = gp.posterior(&[100.0, 100.0]);
        assert!((far.mean - 3.0).abs() < 1e-6);
    }

    #[test]
    fn empty_data_is_rejected() {
        let result = GpModel::fit(&[], &[], scaled_matern(1));
        assert!(matches!(result, Err(Error::NoObservations)));
    }

    #[test]
    fn standardize_constant_outcomes() {
        let (s, mean, std) = standardize(&[2.0, 2.0, 2.0]);
        assert!((mean - 2.0).abs() < 1e-12);
        assert!((std - 1.0).abs() < 1e-12);
        assert!(s.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn duplicate_inputs_without_noise_fail_to_factorize() {
        let x = vec![vec![0.3], vec![0.3]];
        let result = GpModel::condition(&x, &[1.0, 2.0], scaled_matern(1), 0.0);
        assert!(matches!(result, Err(Error::NotPositiveDefinite)));
    }
}
