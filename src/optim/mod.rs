//! Continuous optimization of acquisition surfaces.
//!
//! [`optimize_acqf`] maximizes an [`AcquisitionFunction`] over a box:
//! `raw_samples` uniform points are scored, the best `num_restarts` of them
//! seed a bounded L-BFGS polish, and the best polished point wins.

pub mod lbfgs;

use crate::acquisition::AcquisitionFunction;
use crate::bounds::Bounds;
use crate::error::{Error, Result};

use self::lbfgs::{LbfgsOptions, minimize_bounded};

/// Settings for [`optimize_acqf`].
#[derive(Clone, Debug)]
pub struct AcqfOptions {
    /// Number of local polishing runs.
    pub num_restarts: usize,
    /// Number of random points scored to choose the restart locations.
    pub raw_samples: usize,
    /// Settings of the local optimizer.
    pub local: LbfgsOptions,
}

impl Default for AcqfOptions {
    fn default() -> Self {
        Self {
            num_restarts: 10,
            raw_samples: 512,
            local: LbfgsOptions::default(),
        }
    }
}

/// Location and value of an acquisition optimum.
#[derive(Clone, Debug, PartialEq)]
pub struct AcqfOptimum {
    pub x: Vec<f64>,
    pub value: f64,
}

/// Maximize `acq` over `bounds`.
///
/// # Errors
///
/// Returns an [`Internal`](Error::Internal) error if the acquisition
/// function and the bounds disagree on dimensionality, or if no finite
/// acquisition value was found.
pub fn optimize_acqf(
    acq: &dyn AcquisitionFunction,
    bounds: &Bounds,
    options: &AcqfOptions,
    rng: &mut fastrand::Rng,
) -> Result<AcqfOptimum> {
    if acq.dim() != bounds.dim() {
        return Err(Error::Internal(
            "acquisition function and search bounds differ in dimension",
        ));
    }

    let mut raw: Vec<(Vec<f64>, f64)> = (0..options.raw_samples.max(1))
        .map(|_| {
            let x = bounds.sample_uniform(rng);
            let v = acq.evaluate(&x);
            (x, if v.is_finite() { v } else { f64::NEG_INFINITY })
        })
        .collect();
    raw.sort_by(|a, b| b.1.total_cmp(&a.1));
    raw.truncate(options.num_restarts.max(1));

    let pairs = bounds.pairs();
    let neg = |x: &[f64]| -acq.evaluate(x);

    let mut best: Option<AcqfOptimum> = None;
    for (start, start_value) in raw {
        let local = minimize_bounded(neg, &start, &pairs, &options.local);
        let (x, value) = if local.fval.is_finite() && -local.fval >= start_value {
            (local.x, -local.fval)
        } else {
            (start, start_value)
        };
        if value.is_finite() && best.as_ref().is_none_or(|b| value > b.value) {
            best = Some(AcqfOptimum { x, value });
        }
    }

    best.ok_or(Error::Internal("acquisition function has no finite value in bounds"))
}
