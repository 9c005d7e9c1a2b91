//! Observation history with best-observation bookkeeping.

use crate::error::{Error, Result};
use crate::types::Direction;

/// Accumulates observed `(x, y)` pairs and tracks the best one.
///
/// Every row of `x` must have the same length, fixed by the first insert
/// or by [`DataHandler::with_dim`].
#[derive(Clone, Debug)]
pub struct DataHandler {
    x: Vec<Vec<f64>>,
    y: Vec<f64>,
    dim: Option<usize>,
    direction: Direction,
    best: Option<usize>,
}

impl DataHandler {
    #[must_use]
    pub fn new(direction: Direction) -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            dim: None,
            direction,
            best: None,
        }
    }

    /// Creates an empty handler that only accepts rows of length `dim`.
    #[must_use]
    pub fn with_dim(direction: Direction, dim: usize) -> Self {
        Self {
            dim: Some(dim),
            ..Self::new(direction)
        }
    }

    /// Append one observation.
    ///
    /// # Errors
    ///
    /// Returns a [`Data`](Error::Data) error if `y` or any entry of `x` is
    /// non-finite, or if `x` has the wrong length. The history is left
    /// untouched in that case.
    pub fn add_xy(&mut self, x: Vec<f64>, y: f64) -> Result<()> {
        if !y.is_finite() {
            return Err(Error::Data(format!("observed outcome {y} is not finite")));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(Error::Data("input vector contains non-finite values".into()));
        }
        if let Some(dim) = self.dim
            && x.len() != dim
        {
            return Err(Error::Data(format!(
                "input vector has {} entries, expected {dim}",
                x.len()
            )));
        }
        self.dim = Some(x.len());

        let idx = self.y.len();
        let improves = self
            .best
            .is_none_or(|b| self.direction.is_better(y, self.y[b]));
        self.x.push(x);
        self.y.push(y);
        if improves {
            self.best = Some(idx);
        }
        Ok(())
    }

    /// All inputs and outcomes in insertion order.
    #[must_use]
    pub fn get_xy(&self) -> (&[Vec<f64>], &[f64]) {
        (&self.x, &self.y)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.y.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// The most recently added observation.
    #[must_use]
    pub fn last(&self) -> Option<(&[f64], f64)> {
        let i = self.y.len().checked_sub(1)?;
        Some((&self.x[i], self.y[i]))
    }

    /// The best observation according to the configured direction.
    #[must_use]
    pub fn best(&self) -> Option<(&[f64], f64)> {
        self.best.map(|i| (self.x[i].as_slice(), self.y[i]))
    }

    /// The best observed outcome, if any.
    #[must_use]
    pub fn y_best(&self) -> Option<f64> {
        self.best.map(|i| self.y[i])
    }
}
