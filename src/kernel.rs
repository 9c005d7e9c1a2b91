//! Covariance kernels for the Gaussian-process surrogate.
//!
//! Kernels form a small expression tree: Matérn leaves restricted to a
//! contiguous block of active dimensions, elementwise products of two
//! kernels, and an output-scale wrapper. Each hyperparameter may carry a
//! [`GammaPrior`], which enters the MAP objective used during fitting.
//!
//! Hyperparameters are exposed in log space, in pre-order (left operand
//! before right operand, base kernel before its output scale).
//!
//! # Examples
//!
//! ```
//! use contextual_bayesopt::kernel::{GammaPrior, Kernel};
//!
//! let k0 = Kernel::matern(0..2, Some(GammaPrior::new(3.0, 6.0)));
//! let k1 = Kernel::matern(2..3, Some(GammaPrior::new(3.0, 6.0)));
//! let k = Kernel::scale(k0 * k1, Some(GammaPrior::new(2.0, 0.15)));
//! assert_eq!(k.n_params(), 3);
//! ```

use core::ops::{Mul, Range};

use nalgebra::{DMatrix, DVector};

/// Initial length-scale, matching `softplus(0)`.
const DEFAULT_LENGTHSCALE: f64 = core::f64::consts::LN_2;
/// Initial output scale.
const DEFAULT_OUTPUTSCALE: f64 = 1.0;

/// Precomputed √3 constant.
const SQRT_3: f64 = 1.732_050_807_568_877_2;
/// Precomputed √5 constant.
const SQRT_5: f64 = 2.236_067_977_499_79;

/// Gamma prior with shape (concentration) and rate parameterization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GammaPrior {
    pub concentration: f64,
    pub rate: f64,
}

impl GammaPrior {
    #[must_use]
    pub fn new(concentration: f64, rate: f64) -> Self {
        Self {
            concentration,
            rate,
        }
    }

    /// Log density up to the normalizing constant.
    #[must_use]
    pub fn log_prob_unnormalized(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return f64::NEG_INFINITY;
        }
        (self.concentration - 1.0) * x.ln() - self.rate * x
    }

    /// Mode of the distribution, or the mean when the mode sits at zero.
    #[must_use]
    pub fn mode(&self) -> f64 {
        if self.concentration > 1.0 {
            (self.concentration - 1.0) / self.rate
        } else {
            self.concentration / self.rate
        }
    }
}

/// Smoothness of a Matérn kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Nu {
    /// ν = 1/2 (exponential kernel).
    Half,
    /// ν = 3/2.
    ThreeHalves,
    /// ν = 5/2.
    FiveHalves,
}

/// A covariance kernel expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Kernel {
    /// Isotropic Matérn kernel over `active_dims`.
    Matern {
        active_dims: Range<usize>,
        nu: Nu,
        lengthscale: f64,
        prior: Option<GammaPrior>,
    },
    /// Elementwise product of two kernels.
    Product(Box<Kernel>, Box<Kernel>),
    /// `outputscale * base`.
    Scale {
        base: Box<Kernel>,
        outputscale: f64,
        prior: Option<GammaPrior>,
    },
}

impl Kernel {
    /// Matérn 5/2 kernel over `active_dims` with an optional length-scale prior.
    #[must_use]
    pub fn matern(active_dims: Range<usize>, prior: Option<GammaPrior>) -> Self {
        Self::matern_with_nu(active_dims, Nu::FiveHalves, prior)
    }

    #[must_use]
    pub fn matern_with_nu(active_dims: Range<usize>, nu: Nu, prior: Option<GammaPrior>) -> Self {
        Kernel::Matern {
            active_dims,
            nu,
            lengthscale: DEFAULT_LENGTHSCALE,
            prior,
        }
    }

    /// Wrap `base` in an output-scale kernel.
    #[must_use]
    pub fn scale(base: Kernel, prior: Option<GammaPrior>) -> Self {
        Kernel::Scale {
            base: Box::new(base),
            outputscale: DEFAULT_OUTPUTSCALE,
            prior,
        }
    }

    /// Evaluate `k(x1, x2)`.
    #[must_use]
    pub fn eval(&self, x1: &[f64], x2: &[f64]) -> f64 {
        match self {
            Kernel::Matern {
                active_dims,
                nu,
                lengthscale,
                ..
            } => {
                let mut r_sq = 0.0;
                for i in active_dims.clone() {
                    let diff = (x1[i] - x2[i]) / lengthscale;
                    r_sq += diff * diff;
                }
                matern(*nu, r_sq.sqrt())
            }
            Kernel::Product(a, b) => a.eval(x1, x2) * b.eval(x1, x2),
            Kernel::Scale {
                base, outputscale, ..
            } => outputscale * base.eval(x1, x2),
        }
    }

    /// Prior variance `k(x, x)`.
    #[must_use]
    pub fn diag(&self, x: &[f64]) -> f64 {
        self.eval(x, x)
    }

    /// Gram matrix `K(X, X)`.
    #[must_use]
    pub fn gram(&self, x: &[Vec<f64>]) -> DMatrix<f64> {
        let n = x.len();
        let mut k = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in 0..=i {
                let v = self.eval(&x[i], &x[j]);
                k[(i, j)] = v;
                k[(j, i)] = v;
            }
        }
        k
    }

    /// Cross-covariance vector `k(x*, X)`.
    #[must_use]
    pub fn cross(&self, x_star: &[f64], x_train: &[Vec<f64>]) -> DVector<f64> {
        DVector::from_fn(x_train.len(), |i, _| self.eval(x_star, &x_train[i]))
    }

    /// Number of hyperparameters in the expression.
    #[must_use]
    pub fn n_params(&self) -> usize {
        match self {
            Kernel::Matern { .. } => 1,
            Kernel::Product(a, b) => a.n_params() + b.n_params(),
            Kernel::Scale { base, .. } => base.n_params() + 1,
        }
    }

    /// Hyperparameters in log space.
    #[must_use]
    pub fn log_params(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.n_params());
        self.collect(&mut out, |v, _| v.ln());
        out
    }

    /// Prior modes in log space; parameters without a prior keep their current value.
    #[must_use]
    pub fn log_prior_modes(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.n_params());
        self.collect(&mut out, |v, prior| prior.map_or(v, |p| p.mode()).ln());
        out
    }

    fn collect(&self, out: &mut Vec<f64>, f: impl Fn(f64, Option<&GammaPrior>) -> f64 + Copy) {
        match self {
            Kernel::Matern {
                lengthscale, prior, ..
            } => out.push(f(*lengthscale, prior.as_ref())),
            Kernel::Product(a, b) => {
                a.collect(out, f);
                b.collect(out, f);
            }
            Kernel::Scale {
                base,
                outputscale,
                prior,
            } => {
                base.collect(out, f);
                out.push(f(*outputscale, prior.as_ref()));
            }
        }
    }

    /// Set hyperparameters from log space. Returns the number consumed.
    pub fn set_log_params(&mut self, params: &[f64]) -> usize {
        match self {
            Kernel::Matern { lengthscale, .. } => {
                *lengthscale = params[0].exp();
                1
            }
            Kernel::Product(a, b) => {
                let n = a.set_log_params(params);
                n + b.set_log_params(&params[n..])
            }
            Kernel::Scale {
                base, outputscale, ..
            } => {
                let n = base.set_log_params(params);
                *outputscale = params[n].exp();
                n + 1
            }
        }
    }

    /// Sum of the (unnormalized) log prior densities of all hyperparameters.
    #[must_use]
    pub fn log_prior(&self) -> f64 {
        match self {
            Kernel::Matern {
                lengthscale, prior, ..
            } => prior.map_or(0.0, |p| p.log_prob_unnormalized(*lengthscale)),
            Kernel::Product(a, b) => a.log_prior() + b.log_prior(),
            Kernel::Scale {
                base,
                outputscale,
                prior,
            } => base.log_prior() + prior.map_or(0.0, |p| p.log_prob_unnormalized(*outputscale)),
        }
    }
}

impl Mul for Kernel {
    type Output = Kernel;

    fn mul(self, rhs: Kernel) -> Kernel {
        Kernel::Product(Box::new(self), Box::new(rhs))
    }
}

/// Unit-variance Matérn correlation at scaled distance `r`.
fn matern(nu: Nu, r: f64) -> f64 {
    match nu {
        Nu::Half => (-r).exp(),
        Nu::ThreeHalves => {
            let s = SQRT_3 * r;
            (1.0 + s) * (-s).exp()
        }
        Nu::FiveHalves => {
            let s = SQRT_5 * r;
            (1.0 + s + 5.0 / 3.0 * r * r) * (-s).exp()
        }
    }
}
