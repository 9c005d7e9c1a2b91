//! Core types shared by the optimization loop.

use serde::{Deserialize, Serialize};

/// The direction of optimization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Minimize the objective value.
    Minimize,
    /// Maximize the objective value.
    Maximize,
}

impl Direction {
    /// Build a direction from the `maximize` flag used in configurations.
    #[must_use]
    pub fn from_maximize(maximize: bool) -> Self {
        if maximize {
            Direction::Maximize
        } else {
            Direction::Minimize
        }
    }

    /// Returns `true` for [`Direction::Maximize`].
    #[must_use]
    pub fn is_maximize(self) -> bool {
        matches!(self, Direction::Maximize)
    }

    /// Returns `true` if `candidate` is strictly better than `incumbent`.
    #[must_use]
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Direction::Minimize => candidate < incumbent,
            Direction::Maximize => candidate > incumbent,
        }
    }
}

/// Where a proposed point came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProposalSource {
    /// Uniform random point during the initial design phase.
    Initial,
    /// Optimum of the acquisition function.
    Acquisition,
    /// Random substitute because the acquisition optimum was too close to
    /// existing data.
    VicinityFallback,
    /// Random point after the initial design because no surrogate could be
    /// fitted to the history.
    ModelUnavailable,
}

/// A decision point handed back to the client.
#[derive(Clone, Debug, PartialEq)]
pub struct Proposal {
    /// The decision variables to evaluate next.
    pub x: Vec<f64>,
    /// How the point was chosen.
    pub source: ProposalSource,
    /// The acquisition value at the optimum, when an acquisition function was optimized.
    pub acq_value: Option<f64>,
}

/// What the client reports after evaluating a proposal in a standard run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Observed outcome of the pending proposal; absent on the first contact.
    #[serde(default)]
    pub y_new: Option<f64>,
}

/// What the client reports in a contextual run: the outcome of the pending
/// proposal and the context under which the next proposal will be evaluated.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextualGoal {
    /// Observed outcome of the pending proposal; absent on the first contact.
    #[serde(default)]
    pub y_new: Option<f64>,
    /// The context for the next proposal.
    pub c_new: Vec<f64>,
}

impl ContextualGoal {
    /// The first contact of a run: no outcome yet, only the initial context.
    #[must_use]
    pub fn initial(c_new: Vec<f64>) -> Self {
        Self { y_new: None, c_new }
    }

    #[must_use]
    pub fn new(y_new: f64, c_new: Vec<f64>) -> Self {
        Self {
            y_new: Some(y_new),
            c_new,
        }
    }
}
