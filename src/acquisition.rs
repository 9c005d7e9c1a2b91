//! Acquisition functions over a [`Surrogate`].
//!
//! Every acquisition function is a scalar score to be **maximized**. The
//! configured optimization direction is folded into the score itself, so
//! the acquisition optimizer never needs to know whether the run minimizes
//! or maximizes.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::gp::Surrogate;

/// Exploration weight of the upper confidence bound.
pub const DEFAULT_UCB_BETA: f64 = 4.0;

/// A scalar function to be maximized over its inputs.
pub trait AcquisitionFunction {
    /// Number of inputs.
    fn dim(&self) -> usize;

    /// Score at `x`. Larger is better.
    fn evaluate(&self, x: &[f64]) -> f64;
}

/// The closed set of acquisition strategies selectable by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AcquisitionKind {
    /// Upper confidence bound.
    Ucb,
    /// Expected improvement over the best observation.
    Ei,
    /// Probability of improvement over the best observation.
    Pi,
}

impl AcquisitionKind {
    /// Build the acquisition function against `surrogate`.
    ///
    /// `best_f` is the best observed outcome, required by the
    /// improvement-based strategies.
    ///
    /// # Errors
    ///
    /// Returns [`NoObservations`](Error::NoObservations) if an
    /// improvement-based strategy is requested without an incumbent.
    pub fn build<'a>(
        self,
        surrogate: &'a dyn Surrogate,
        best_f: Option<f64>,
        maximize: bool,
    ) -> Result<Box<dyn AcquisitionFunction + 'a>> {
        Ok(match self {
            AcquisitionKind::Ucb => Box::new(UpperConfidenceBound {
                surrogate,
                beta: DEFAULT_UCB_BETA,
                maximize,
            }),
            AcquisitionKind::Ei => Box::new(ExpectedImprovement {
                surrogate,
                best_f: best_f.ok_or(Error::NoObservations)?,
                maximize,
            }),
            AcquisitionKind::Pi => Box::new(ProbabilityOfImprovement {
                surrogate,
                best_f: best_f.ok_or(Error::NoObservations)?,
                maximize,
            }),
        })
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AcquisitionKind::Ucb => "UCB",
            AcquisitionKind::Ei => "EI",
            AcquisitionKind::Pi => "PI",
        }
    }
}

impl fmt::Display for AcquisitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AcquisitionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UCB" => Ok(AcquisitionKind::Ucb),
            "EI" => Ok(AcquisitionKind::Ei),
            "PI" => Ok(AcquisitionKind::Pi),
            other => Err(Error::Configuration(format!(
                "unknown acquisition function '{other}' (expected UCB, EI or PI)"
            ))),
        }
    }
}

impl TryFrom<String> for AcquisitionKind {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<AcquisitionKind> for String {
    fn from(kind: AcquisitionKind) -> Self {
        kind.as_str().to_owned()
    }
}

/// `mean + sqrt(beta) * std`, with the mean negated when minimizing.
pub struct UpperConfidenceBound<'a> {
    pub surrogate: &'a dyn Surrogate,
    pub beta: f64,
    pub maximize: bool,
}

impl AcquisitionFunction for UpperConfidenceBound<'_> {
    fn dim(&self) -> usize {
        self.surrogate.dim()
    }

    fn evaluate(&self, x: &[f64]) -> f64 {
        let post = self.surrogate.posterior(x);
        let mean = if self.maximize { post.mean } else { -post.mean };
        mean + self.beta.sqrt() * post.std()
    }
}

/// Expected improvement over `best_f`.
///
/// `EI(x) = σ (φ(u) + u Φ(u))` where `u = (μ - f*) / σ`, negated when minimizing.
pub struct ExpectedImprovement<'a> {
    pub surrogate: &'a dyn Surrogate,
    pub best_f: f64,
    pub maximize: bool,
}

impl AcquisitionFunction for ExpectedImprovement<'_> {
    fn dim(&self) -> usize {
        self.surrogate.dim()
    }

    fn evaluate(&self, x: &[f64]) -> f64 {
        let post = self.surrogate.posterior(x);
        let std = post.std();
        let gain = if self.maximize {
            post.mean - self.best_f
        } else {
            self.best_f - post.mean
        };
        if std < 1e-12 {
            return gain.max(0.0);
        }
        let u = gain / std;
        (std * (norm_pdf(u) + u * norm_cdf(u))).max(0.0)
    }
}

/// Probability of improving on `best_f`.
pub struct ProbabilityOfImprovement<'a> {
    pub surrogate: &'a dyn Surrogate,
    pub best_f: f64,
    pub maximize: bool,
}

impl AcquisitionFunction for ProbabilityOfImprovement<'_> {
    fn dim(&self) -> usize {
        self.surrogate.dim()
    }

    fn evaluate(&self, x: &[f64]) -> f64 {
        let post = self.surrogate.posterior(x);
        let std = post.std();
        let gain = if self.maximize {
            post.mean - self.best_f
        } else {
            self.best_f - post.mean
        };
        if std < 1e-12 {
            return if gain > 0.0 { 1.0 } else { 0.0 };
        }
        norm_cdf(gain / std)
    }
}

/// The posterior mean, negated when minimizing. Pure exploitation.
pub struct PosteriorMean<'a> {
    pub surrogate: &'a dyn Surrogate,
    pub maximize: bool,
}

impl AcquisitionFunction for PosteriorMean<'_> {
    fn dim(&self) -> usize {
        self.surrogate.dim()
    }

    fn evaluate(&self, x: &[f64]) -> f64 {
        let mean = self.surrogate.posterior(x).mean;
        if self.maximize { mean } else { -mean }
    }
}

/// Restricts a `d`-dimensional acquisition function by pinning some of its
/// inputs to constants.
///
/// The wrapped function is evaluated on the full `d`-vector obtained by
/// inserting `values` at `columns`; the remaining `d - columns.len()`
/// inputs are free, in their original order.
pub struct FixedFeatureAcquisition<'a> {
    inner: Box<dyn AcquisitionFunction + 'a>,
    d: usize,
    fixed: Vec<Option<f64>>,
}

impl<'a> FixedFeatureAcquisition<'a> {
    /// # Errors
    ///
    /// Returns an [`Internal`](Error::Internal) error if `columns` and
    /// `values` differ in length, a column is out of range or repeated, or
    /// `d` does not match the wrapped function.
    pub fn new(
        inner: Box<dyn AcquisitionFunction + 'a>,
        d: usize,
        columns: &[usize],
        values: &[f64],
    ) -> Result<Self> {
        if columns.len() != values.len() {
            return Err(Error::Internal("fixed columns and values differ in length"));
        }
        if inner.dim() != d {
            return Err(Error::Internal("fixed-feature dimension does not match acquisition"));
        }
        let mut fixed = vec![None; d];
        for (&c, &v) in columns.iter().zip(values) {
            let slot = fixed
                .get_mut(c)
                .ok_or(Error::Internal("fixed column out of range"))?;
            if slot.replace(v).is_some() {
                return Err(Error::Internal("fixed column repeated"));
            }
        }
        Ok(Self { inner, d, fixed })
    }

    /// Insert the fixed values into a point of free inputs.
    #[must_use]
    pub fn expand(&self, free: &[f64]) -> Vec<f64> {
        let mut it = free.iter();
        self.fixed
            .iter()
            .map(|slot| slot.unwrap_or_else(|| it.next().copied().unwrap_or(f64::NAN)))
            .collect()
    }

    /// Dimension of the wrapped function.
    #[must_use]
    pub fn full_dim(&self) -> usize {
        self.d
    }
}

impl AcquisitionFunction for FixedFeatureAcquisition<'_> {
    fn dim(&self) -> usize {
        self.fixed.iter().filter(|s| s.is_none()).count()
    }

    fn evaluate(&self, x: &[f64]) -> f64 {
        self.inner.evaluate(&self.expand(x))
    }
}

// ---------------------------------------------------------------------------
// Normal distribution helpers
// ---------------------------------------------------------------------------

/// Standard normal PDF.
pub(crate) fn norm_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal CDF (Hart rational approximation).
pub(crate) fn norm_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }

    let abs_x = x.abs();
    let t = 1.0 / (1.0 + 0.231_641_9 * abs_x);
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;
    let t5 = t4 * t;

    let poly = 0.319_381_530 * t - 0.356_563_782 * t2 + 1.781_477_937 * t3 - 1.821_255_978 * t4
        + 1.330_274_429 * t5;
    let cdf = 1.0 - norm_pdf(abs_x) * poly;

    if x >= 0.0 { cdf } else { 1.0 - cdf }
}
