//! The pluggable steps of one optimization round.
//!
//! The loop in [`BayesOpt`](crate::BayesOpt) owns the history and the
//! model; a [`Strategy`] decides how the model is built, which function is
//! optimized to pick the next point, and when a candidate is too close to
//! existing data. [`StandardStrategy`] models the decision variables only;
//! [`ContextualStrategy`](crate::ContextualStrategy) adds context dimensions
//! that are pinned during acquisition.

use crate::acquisition::{AcquisitionFunction, AcquisitionKind};
use crate::bounds::Bounds;
use crate::error::Result;
use crate::gp::{GpModel, Surrogate};
use crate::kernel::{GammaPrior, Kernel};
use crate::optim::{AcqfOptimum, AcqfOptions, optimize_acqf};
use crate::types::Direction;

/// Default minimum distance, in the unit cube of the model input space,
/// between a candidate and any existing observation.
pub const DEFAULT_VICINITY_THRESHOLD: f64 = 1e-3;

/// Length-scale prior of the Matérn kernels.
pub const LENGTHSCALE_PRIOR: GammaPrior = GammaPrior {
    concentration: 3.0,
    rate: 6.0,
};

/// Output-scale prior of the scale kernel.
pub const OUTPUTSCALE_PRIOR: GammaPrior = GammaPrior {
    concentration: 2.0,
    rate: 0.15,
};

/// The model- and acquisition-specific steps of a [`BayesOpt`](crate::BayesOpt) round.
///
/// Implementations decide the model input space, how the surrogate is built
/// on it, and which function over the decision variables is maximized.
pub trait Strategy {
    /// Bounds of the decision variables.
    fn bounds(&self) -> &Bounds;

    /// Bounds of the model input space.
    fn model_bounds(&self) -> &Bounds;

    /// Fail if the strategy cannot propose a point yet.
    ///
    /// # Errors
    ///
    /// Strategy-specific; the default never fails.
    fn ready(&self) -> Result<()> {
        Ok(())
    }

    /// Build a surrogate from scratch on the full history.
    ///
    /// # Errors
    ///
    /// Propagates model-fitting failures.
    fn build_model(&self, x: &[Vec<f64>], y: &[f64]) -> Result<GpModel>;

    /// Build the function whose maximizer over [`Strategy::bounds`] is the next proposal.
    ///
    /// # Errors
    ///
    /// Propagates acquisition construction failures.
    fn build_acquisition<'a>(
        &self,
        surrogate: &'a dyn Surrogate,
        kind: AcquisitionKind,
        best_f: Option<f64>,
        direction: Direction,
    ) -> Result<Box<dyn AcquisitionFunction + 'a>> {
        kind.build(surrogate, best_f, direction.is_maximize())
    }

    /// Maximize `acq` over the decision bounds.
    ///
    /// # Errors
    ///
    /// Propagates optimizer failures.
    fn optimize_acquisition(
        &self,
        acq: &dyn AcquisitionFunction,
        options: &AcqfOptions,
        rng: &mut fastrand::Rng,
        visualize: bool,
    ) -> Result<AcqfOptimum> {
        let _ = visualize;
        optimize_acqf(acq, self.bounds(), options, rng)
    }

    /// Returns `true` if the decision point `candidate` is too close to `history`.
    fn check_vicinity(&self, candidate: &[f64], history: &[Vec<f64>], threshold: f64) -> bool {
        data_vicinity(self.model_bounds(), candidate, history, threshold)
    }
}

/// Returns `true` if `candidate` lies within `threshold` of any point of
/// `history`, with distances measured after mapping into the unit cube of
/// `bounds`.
#[must_use]
pub fn data_vicinity(bounds: &Bounds, candidate: &[f64], history: &[Vec<f64>], threshold: f64) -> bool {
    let c = bounds.normalize(candidate);
    history.iter().any(|h| {
        let h = bounds.normalize(h);
        let d_sq: f64 = c.iter().zip(&h).map(|(a, b)| (a - b).powi(2)).sum();
        d_sq.sqrt() < threshold
    })
}

/// Scaled Matérn 5/2 kernel over all `dim` inputs.
#[must_use]
pub fn standard_kernel(dim: usize) -> Kernel {
    Kernel::scale(
        Kernel::matern(0..dim, Some(LENGTHSCALE_PRIOR)),
        Some(OUTPUTSCALE_PRIOR),
    )
}

/// Models the decision variables alone.
#[derive(Clone, Debug)]
pub struct StandardStrategy {
    bounds: Bounds,
}

impl StandardStrategy {
    #[must_use]
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }
}

impl Strategy for StandardStrategy {
    fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    fn model_bounds(&self) -> &Bounds {
        &self.bounds
    }

    fn build_model(&self, x: &[Vec<f64>], y: &[f64]) -> Result<GpModel> {
        GpModel::fit(x, y, standard_kernel(self.bounds.dim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vicinity_uses_normalized_distance() {
        let bounds = Bounds::new(vec![0.0, 0.0], vec![1000.0, 1.0]).unwrap();
        let history = vec![vec![500.0, 0.5]];
        // 0.5 in raw units along a 1000-wide axis is 5e-4 after normalization.
        assert!(data_vicinity(&bounds, &[500.5, 0.5], &history, 1e-3));
        assert!(!data_vicinity(&bounds, &[502.0, 0.5], &history, 1e-3));
    }

    #[test]
    fn empty_history_is_never_close() {
        let bounds = Bounds::new(vec![0.0], vec![1.0]).unwrap();
        assert!(!data_vicinity(&bounds, &[0.5], &[], 1e-3));
    }
}
