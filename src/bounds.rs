//! Box bounds over a continuous search space.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rng_util;

/// Per-dimension `(lower, upper)` bounds, conceptually a `2 x d` matrix.
///
/// # Examples
///
/// ```
/// use contextual_bayesopt::Bounds;
///
/// let decision = Bounds::new(vec![0.0, -1.0], vec![1.0, 1.0]).unwrap();
/// let context = Bounds::new(vec![10.0], vec![20.0]).unwrap();
/// let joint = decision.concat(&context);
/// assert_eq!(joint.shape(), (2, 3));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    /// Creates bounds from lower and upper vectors.
    ///
    /// # Errors
    ///
    /// Returns a [`Configuration`](Error::Configuration) error if the vectors
    /// differ in length, are empty, contain non-finite values, or if any
    /// lower bound exceeds its upper bound.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(Error::Configuration(format!(
                "bounds shape mismatch: {} lower bounds but {} upper bounds",
                lower.len(),
                upper.len()
            )));
        }
        if lower.is_empty() {
            return Err(Error::Configuration(
                "bounds must cover at least one dimension".into(),
            ));
        }
        for (i, (&lo, &hi)) in lower.iter().zip(&upper).enumerate() {
            if !lo.is_finite() || !hi.is_finite() {
                return Err(Error::Configuration(format!(
                    "bounds of dimension {i} are not finite"
                )));
            }
            if lo > hi {
                return Err(Error::Configuration(format!(
                    "invalid bounds in dimension {i}: low ({lo}) must be less than or equal to high ({hi})"
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    /// Creates bounds from `[lower, upper]` rows.
    ///
    /// # Errors
    ///
    /// See [`Bounds::new`].
    pub fn from_rows(rows: [Vec<f64>; 2]) -> Result<Self> {
        let [lower, upper] = rows;
        Self::new(lower, upper)
    }

    /// Number of dimensions.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// Shape as `(2, dim)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (2, self.dim())
    }

    #[must_use]
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    #[must_use]
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Column-wise concatenation: the dimensions of `self` followed by those of `other`.
    #[must_use]
    pub fn concat(&self, other: &Bounds) -> Bounds {
        let mut lower = self.lower.clone();
        lower.extend_from_slice(&other.lower);
        let mut upper = self.upper.clone();
        upper.extend_from_slice(&other.upper);
        Bounds { lower, upper }
    }

    /// Returns `true` if `x` lies inside the box (inclusive).
    #[must_use]
    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.dim()
            && x
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(&v, (&lo, &hi))| v >= lo && v <= hi)
    }

    /// Clamp each coordinate of `x` into the box.
    pub fn clamp(&self, x: &mut [f64]) {
        for (v, (&lo, &hi)) in x.iter_mut().zip(self.lower.iter().zip(&self.upper)) {
            *v = v.clamp(lo, hi);
        }
    }

    /// Draw a uniformly random point from the box.
    pub fn sample_uniform(&self, rng: &mut fastrand::Rng) -> Vec<f64> {
        self.lower
            .iter()
            .zip(&self.upper)
            .map(|(&lo, &hi)| rng_util::f64_range(rng, lo, hi))
            .collect()
    }

    /// Map `x` into the unit cube. Degenerate dimensions map to `0.5`.
    #[must_use]
    pub fn normalize(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(&v, (&lo, &hi))| {
                if (hi - lo).abs() < 1e-15 {
                    0.5
                } else {
                    (v - lo) / (hi - lo)
                }
            })
            .collect()
    }

    /// Bounds as `(lower, upper)` pairs, one per dimension.
    #[must_use]
    pub fn pairs(&self) -> Vec<(f64, f64)> {
        self.lower.iter().copied().zip(self.upper.iter().copied()).collect()
    }
}
