#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Sequential Bayesian optimization of expensive black-box functions, with
//! support for an externally supplied context.
//!
//! A client evaluates the objective; the optimizer only ever sees the
//! outcome of the point it proposed last. In contextual mode the client
//! also reports a context vector (an environment variable it does not
//! control), and every proposal is optimized for the context it is made in.
//!
//! # Getting Started
//!
//! ```
//! use contextual_bayesopt::prelude::*;
//!
//! let mut bo = ContextualBayesOpt::builder(1, 1)
//!     .bounds(Bounds::new(vec![0.0], vec![1.0]).unwrap())
//!     .context_bounds(Bounds::new(vec![0.0], vec![1.0]).unwrap())
//!     .n_init(3)
//!     .max_iter(6)
//!     .seed(7)
//!     .build()
//!     .unwrap();
//!
//! let mut c = vec![0.2];
//! let mut goal = ContextualGoal::initial(c.clone());
//! while let Some(proposal) = bo.next(&goal).unwrap() {
//!     let y = -(proposal.x[0] - c[0]).powi(2);
//!     c = vec![1.0 - c[0]];
//!     goal = ContextualGoal::new(y, c.clone());
//! }
//!
//! let (x, value) = bo.get_optimal_parameters(Some(&[0.2])).unwrap();
//! assert!(x[0] >= 0.0 && x[0] <= 1.0 && value.is_finite());
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`ContextualBayesOpt`] | Loop over decision and context variables; the context is pinned during acquisition. |
//! | [`StandardBayesOpt`] | Loop over decision variables alone. |
//! | [`Strategy`] | How the surrogate is built and which function picks the next point. |
//! | [`GpModel`](gp::GpModel) | Gaussian-process surrogate with MAP-fitted hyperparameters. |
//! | [`AcquisitionKind`] | UCB, EI or PI. |
//!
//! # Protocol
//!
//! Each call to `next` carries the outcome of the previously proposed
//! point (and, in contextual mode, the context for the next one). The very
//! first goal carries no outcome and only starts the run. `next` returns
//! `None` once `max_iter` observations exist; `max_iter = 0` means no limit.
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod acquisition;
pub mod bayesopt;
pub mod bounds;
pub mod config;
pub mod contextual;
pub mod data;
mod error;
pub mod gp;
pub mod kernel;
pub mod optim;
pub mod persistence;
mod rng_util;
pub mod standard;
pub mod strategy;
mod types;

pub use acquisition::{AcquisitionFunction, AcquisitionKind};
pub use bayesopt::{BayesOpt, LoopOptions};
pub use bounds::Bounds;
pub use config::{BayesOptConfig, ConstantConfig, ContextualConfig};
pub use contextual::{ContextualBayesOpt, ContextualBayesOptBuilder, ContextualStrategy};
pub use error::{Error, Result};
pub use standard::{StandardBayesOpt, StandardBayesOptBuilder};
pub use strategy::{StandardStrategy, Strategy};
pub use types::{ContextualGoal, Direction, Goal, Proposal, ProposalSource};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use contextual_bayesopt::prelude::*;
/// ```
pub mod prelude {
    pub use crate::acquisition::AcquisitionKind;
    pub use crate::bayesopt::{BayesOpt, LoopOptions};
    pub use crate::bounds::Bounds;
    pub use crate::config::{BayesOptConfig, ContextualConfig};
    pub use crate::contextual::ContextualBayesOpt;
    pub use crate::error::{Error, Result};
    pub use crate::optim::AcqfOptions;
    pub use crate::standard::StandardBayesOpt;
    pub use crate::types::{ContextualGoal, Direction, Goal, Proposal, ProposalSource};
}
