//! The sequential optimization loop shared by all strategies.
//!
//! One round is: ingest the client's outcome, refit the surrogate from
//! scratch on the whole history, build and optimize the acquisition
//! function, guard against near-duplicate proposals, and hand the new point
//! back. The client-facing `update`/`next` methods live on the concrete
//! loop types ([`StandardBayesOpt`](crate::StandardBayesOpt) and
//! [`ContextualBayesOpt`](crate::ContextualBayesOpt)); this module holds
//! everything they share.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::acquisition::AcquisitionKind;
use crate::config::{BayesOptConfig, ConstantConfig};
use crate::data::DataHandler;
use crate::error::Result;
use crate::gp::GpModel;
use crate::optim::{AcqfOptimum, AcqfOptions};
use crate::persistence::{self, Evaluation, RunLog};
use crate::strategy::{DEFAULT_VICINITY_THRESHOLD, Strategy};
use crate::types::{Direction, Proposal, ProposalSource};

/// Numerical settings of the loop that are not part of the run configuration.
#[derive(Clone, Debug)]
pub struct LoopOptions {
    /// Acquisition optimizer settings.
    pub acqf: AcqfOptions,
    /// Minimum normalized distance between a proposal and existing data.
    pub vicinity_threshold: f64,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            acqf: AcqfOptions::default(),
            vicinity_threshold: DEFAULT_VICINITY_THRESHOLD,
        }
    }
}

/// A Bayesian optimization run driven by a [`Strategy`].
///
/// Not safe for concurrent goal submissions: every mutating method takes
/// `&mut self`, and one instance serves one client session.
pub struct BayesOpt<S: Strategy> {
    pub(crate) strategy: S,
    pub(crate) direction: Direction,
    pub(crate) acq_func: AcquisitionKind,
    pub(crate) n_init: usize,
    pub(crate) max_iter: usize,
    pub(crate) data: DataHandler,
    pub(crate) gp: Option<GpModel>,
    pub(crate) x_new: Option<Vec<f64>>,
    pub(crate) rng: fastrand::Rng,
    pub(crate) options: LoopOptions,
    pub(crate) log: Option<RunLog>,
}

impl<S: Strategy> BayesOpt<S> {
    pub(crate) fn with_strategy(
        strategy: S,
        config: &BayesOptConfig,
        options: LoopOptions,
        log: Option<RunLog>,
    ) -> Self {
        let direction = Direction::from_maximize(config.maximize);
        let model_dim = strategy.model_bounds().dim();
        Self {
            strategy,
            direction,
            acq_func: config.acq_func,
            n_init: config.n_init,
            max_iter: config.max_iter,
            data: DataHandler::with_dim(direction, model_dim),
            gp: None,
            x_new: None,
            rng: config
                .seed
                .map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed),
            options,
            log,
        }
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn acq_func(&self) -> AcquisitionKind {
        self.acq_func
    }

    #[must_use]
    pub fn n_init(&self) -> usize {
        self.n_init
    }

    #[must_use]
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    #[must_use]
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// The observation history, in model input space.
    #[must_use]
    pub fn data(&self) -> &DataHandler {
        &self.data
    }

    #[must_use]
    pub fn n_data(&self) -> usize {
        self.data.len()
    }

    /// The current surrogate, if one has been fitted.
    #[must_use]
    pub fn model(&self) -> Option<&GpModel> {
        self.gp.as_ref()
    }

    /// The proposed point that has not been evaluated yet.
    #[must_use]
    pub fn x_new(&self) -> Option<&[f64]> {
        self.x_new.as_deref()
    }

    /// Directory of the run log, if logging is enabled.
    #[must_use]
    pub fn log_dir(&self) -> Option<&Path> {
        self.log.as_ref().map(RunLog::dir)
    }

    /// Returns `true` once the history holds `max_iter` observations.
    #[must_use]
    pub fn budget_exhausted(&self) -> bool {
        self.max_iter > 0 && self.data.len() >= self.max_iter
    }

    /// Propose the next decision point. See [`BayesOpt::propose_with`].
    ///
    /// # Errors
    ///
    /// See [`BayesOpt::propose_with`].
    pub fn propose(&mut self) -> Result<Proposal> {
        self.propose_with(false)
    }

    /// Propose the next decision point and remember it as pending.
    ///
    /// While fewer than `n_init` observations exist the point is uniformly
    /// random. Afterwards it maximizes the acquisition function, unless the
    /// optimum is too close to the history, in which case a random point
    /// is substituted and reported as
    /// [`VicinityFallback`](ProposalSource::VicinityFallback). If the last
    /// refit failed the point is random and reported as
    /// [`ModelUnavailable`](ProposalSource::ModelUnavailable).
    ///
    /// `visualize` requests debug plotting from the strategy; strategies
    /// are free to ignore it.
    ///
    /// # Errors
    ///
    /// Returns the strategy's readiness error, or propagates acquisition
    /// construction and optimization failures.
    pub fn propose_with(&mut self, visualize: bool) -> Result<Proposal> {
        self.strategy.ready()?;

        let proposal = match &self.gp {
            Some(gp) if self.data.len() >= self.n_init => {
                let acq = self.strategy.build_acquisition(
                    gp,
                    self.acq_func,
                    self.data.y_best(),
                    self.direction,
                )?;
                let optimum = self.strategy.optimize_acquisition(
                    acq.as_ref(),
                    &self.options.acqf,
                    &mut self.rng,
                    visualize,
                )?;
                select_candidate(
                    &self.strategy,
                    optimum,
                    self.data.get_xy().0,
                    self.options.vicinity_threshold,
                    &mut self.rng,
                )
            }
            _ => {
                let source = if self.data.is_empty() || self.data.len() < self.n_init {
                    ProposalSource::Initial
                } else {
                    trace_info!(n_data = self.data.len(), "no surrogate available, using a random point");
                    ProposalSource::ModelUnavailable
                };
                Proposal {
                    x: self.strategy.bounds().sample_uniform(&mut self.rng),
                    source,
                    acq_value: None,
                }
            }
        };

        trace_info!(source = ?proposal.source, x = ?proposal.x, "proposed next point");
        self.x_new = Some(proposal.x.clone());
        Ok(proposal)
    }

    /// Append an observation to the history and the run log.
    ///
    /// Invalid observations are rejected before anything is written. A
    /// failing log write is reported but does not abort the round.
    pub(crate) fn record(&mut self, x: Vec<f64>, y: f64) -> Result<()> {
        self.data.add_xy(x, y)?;
        if let Some(log) = &self.log
            && let Some((x, y)) = self.data.last()
            && let Err(_e) = log.append(x, y)
        {
            trace_info!(error = %_e, "failed to append evaluation to run log");
        }
        Ok(())
    }

    /// Rebuild the surrogate from scratch on the full history.
    ///
    /// Refitting from scratch keeps the outcome standardization consistent
    /// with the whole history.
    pub(crate) fn refit(&mut self) -> Result<()> {
        self.gp = None;
        let (x, y) = self.data.get_xy();
        let gp = self.strategy.build_model(x, y)?;
        trace_debug!(n_data = y.len(), "surrogate refitted");
        self.gp = Some(gp);
        Ok(())
    }

    /// Load observations of a previous run and refit once.
    pub(crate) fn replay(&mut self, evaluations: Vec<Evaluation>, log_again: bool) -> Result<()> {
        let _n = evaluations.len();
        for Evaluation { x, y } in evaluations {
            if log_again {
                self.record(x, y)?;
            } else {
                self.data.add_xy(x, y)?;
            }
        }
        if !self.data.is_empty() {
            self.refit()?;
        }
        trace_info!(n_evaluations = _n, "resumed previous run");
        Ok(())
    }
}

/// Keep the acquisition optimum unless it is too close to `history`.
pub fn select_candidate<S: Strategy + ?Sized>(
    strategy: &S,
    optimum: AcqfOptimum,
    history: &[Vec<f64>],
    threshold: f64,
    rng: &mut fastrand::Rng,
) -> Proposal {
    if strategy.check_vicinity(&optimum.x, history, threshold) {
        trace_info!(x = ?optimum.x, "acquisition optimum too close to existing data, using a random point");
        Proposal {
            x: strategy.bounds().sample_uniform(rng),
            source: ProposalSource::VicinityFallback,
            acq_value: None,
        }
    } else {
        Proposal {
            x: optimum.x,
            source: ProposalSource::Acquisition,
            acq_value: Some(optimum.value),
        }
    }
}

/// Undo the sign folding of an acquisition value for the given direction.
pub(crate) fn sign_corrected(value: f64, direction: Direction) -> f64 {
    if direction.is_maximize() { value } else { -value }
}

/// Evaluations to resume from and the log to write to, after checking
/// the constant parameters against the persisted run.
pub(crate) struct RunFiles {
    pub(crate) log: Option<RunLog>,
    pub(crate) evaluations: Vec<Evaluation>,
    pub(crate) log_again: bool,
}

pub(crate) fn open_run<C>(config: &C, log_dir: Option<&Path>, load_dir: Option<&Path>) -> Result<RunFiles>
where
    C: ConstantConfig + Serialize + DeserializeOwned,
{
    let evaluations = match load_dir {
        Some(dir) => {
            let persisted: C = persistence::load_config(dir)?;
            config.check_resume(&persisted)?;
            persistence::load_evaluations(dir)?
        }
        None => Vec::new(),
    };
    let log_again = matches!((log_dir, load_dir), (Some(a), Some(b)) if a != b);
    let log = log_dir.map(|dir| RunLog::create(dir, config)).transpose()?;
    Ok(RunFiles {
        log,
        evaluations,
        log_again,
    })
}
