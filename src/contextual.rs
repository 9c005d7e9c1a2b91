//! Contextual Bayesian optimization.
//!
//! The surrogate is fitted over the joint input `[decision, context]`, with
//! a product of two Matérn kernels, one per block of dimensions. The
//! context is an environment variable reported by the client and is never
//! searched over: acquisition functions are restricted to the decision
//! variables by pinning the context dimensions to the current context.
//!
//! Context bookkeeping follows the client protocol, where a goal carries
//! the outcome `y_n` of the pending proposal together with the context
//! `c_{n+1}` for the next one:
//!
//! - `context` is the context the next proposal is made for;
//! - `prev_context` is the context the latest observation was made under.
//!
//! # Examples
//!
//! ```
//! use contextual_bayesopt::{Bounds, ContextualBayesOpt, ContextualGoal};
//!
//! let mut bo = ContextualBayesOpt::builder(1, 1)
//!     .bounds(Bounds::new(vec![0.0], vec![1.0]).unwrap())
//!     .context_bounds(Bounds::new(vec![0.0], vec![1.0]).unwrap())
//!     .n_init(2)
//!     .seed(3)
//!     .build()
//!     .unwrap();
//!
//! let x1 = bo.next(&ContextualGoal::initial(vec![0.3])).unwrap().unwrap().x;
//! bo.update(&ContextualGoal::new(0.5, vec![0.7])).unwrap();
//!
//! let (x, c, y) = bo.get_best_observation().unwrap();
//! assert_eq!((x, c, y), (x1, vec![0.3], 0.5));
//! assert_eq!(bo.prev_context(), Some(&[0.3][..]));
//! assert_eq!(bo.context(), Some(&[0.7][..]));
//! ```

use std::path::{Path, PathBuf};

use crate::acquisition::{
    AcquisitionFunction, AcquisitionKind, FixedFeatureAcquisition, PosteriorMean,
};
use crate::bayesopt::{BayesOpt, LoopOptions, open_run, sign_corrected};
use crate::bounds::Bounds;
use crate::config::{BayesOptConfig, ContextualConfig};
use crate::error::{Error, Result};
use crate::gp::{GpModel, Surrogate};
use crate::kernel::Kernel;
use crate::optim::{AcqfOptimum, AcqfOptions, optimize_acqf};
use crate::strategy::{LENGTHSCALE_PRIOR, OUTPUTSCALE_PRIOR, Strategy, data_vicinity};
use crate::types::{ContextualGoal, Direction, Proposal};

/// `Scale(Matern(decision dims) * Matern(context dims))`.
///
/// The product encodes that decision and context effects interact
/// multiplicatively in the correlation structure.
#[must_use]
pub fn joint_kernel(input_dim: usize, context_dim: usize) -> Kernel {
    let joint_dim = input_dim + context_dim;
    let k0 = Kernel::matern(0..input_dim, Some(LENGTHSCALE_PRIOR));
    let k1 = Kernel::matern(input_dim..joint_dim, Some(LENGTHSCALE_PRIOR));
    Kernel::scale(k0 * k1, Some(OUTPUTSCALE_PRIOR))
}

/// Models decision and context variables jointly and pins the context
/// during acquisition.
#[derive(Clone, Debug)]
pub struct ContextualStrategy {
    input_dim: usize,
    context_dim: usize,
    bounds: Bounds,
    context_bounds: Bounds,
    joint_bounds: Bounds,
    context: Option<Vec<f64>>,
    prev_context: Option<Vec<f64>>,
}

impl ContextualStrategy {
    /// # Errors
    ///
    /// Returns a [`Configuration`](Error::Configuration) error if the
    /// bounds do not have shapes `[2, input_dim]` and `[2, context_dim]`.
    pub fn new(
        input_dim: usize,
        context_dim: usize,
        bounds: Bounds,
        context_bounds: Bounds,
    ) -> Result<Self> {
        if bounds.dim() != input_dim {
            return Err(Error::Configuration(format!(
                "bounds must have shape [2, {input_dim}], got [2, {}]",
                bounds.dim()
            )));
        }
        if context_bounds.dim() != context_dim {
            return Err(Error::Configuration(format!(
                "context bounds must have shape [2, {context_dim}], got [2, {}]",
                context_bounds.dim()
            )));
        }
        let joint_bounds = bounds.concat(&context_bounds);
        Ok(Self {
            input_dim,
            context_dim,
            bounds,
            context_bounds,
            joint_bounds,
            context: None,
            prev_context: None,
        })
    }

    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[must_use]
    pub fn context_dim(&self) -> usize {
        self.context_dim
    }

    #[must_use]
    pub fn joint_dim(&self) -> usize {
        self.input_dim + self.context_dim
    }

    #[must_use]
    pub fn context_bounds(&self) -> &Bounds {
        &self.context_bounds
    }

    #[must_use]
    pub fn joint_bounds(&self) -> &Bounds {
        &self.joint_bounds
    }

    #[must_use]
    pub fn context(&self) -> Option<&[f64]> {
        self.context.as_deref()
    }

    #[must_use]
    pub fn prev_context(&self) -> Option<&[f64]> {
        self.prev_context.as_deref()
    }

    /// Indices of the context dimensions in the joint input.
    #[must_use]
    pub fn context_columns(&self) -> Vec<usize> {
        (self.input_dim..self.joint_dim()).collect()
    }

    /// Restrict `acq` to the decision variables at `context`.
    ///
    /// # Errors
    ///
    /// Returns a [`Data`](Error::Data) error if `context` has the wrong length.
    pub fn fix_context<'a>(
        &self,
        acq: Box<dyn AcquisitionFunction + 'a>,
        context: &[f64],
    ) -> Result<FixedFeatureAcquisition<'a>> {
        self.check_context(context)?;
        FixedFeatureAcquisition::new(acq, self.joint_dim(), &self.context_columns(), context)
    }

    /// Optimize the posterior mean of `surrogate` over the decision variables at `context`.
    ///
    /// Returns the optimal decision point and its expected outcome in the
    /// units of the objective.
    ///
    /// # Errors
    ///
    /// Returns a [`Data`](Error::Data) error for a malformed context and
    /// propagates optimizer failures.
    pub fn optimize_posterior_mean(
        &self,
        surrogate: &dyn Surrogate,
        context: &[f64],
        direction: Direction,
        options: &AcqfOptions,
        rng: &mut fastrand::Rng,
    ) -> Result<(Vec<f64>, f64)> {
        let pm = PosteriorMean {
            surrogate,
            maximize: direction.is_maximize(),
        };
        let pm = self.fix_context(Box::new(pm), context)?;
        let opt = self.optimize_acquisition(&pm, options, rng, false)?;
        Ok((opt.x, sign_corrected(opt.value, direction)))
    }

    fn check_context(&self, context: &[f64]) -> Result<()> {
        if context.len() != self.context_dim {
            return Err(Error::Data(format!(
                "context has {} entries, expected {}",
                context.len(),
                self.context_dim
            )));
        }
        if context.iter().any(|v| !v.is_finite()) {
            return Err(Error::Data("context contains non-finite values".into()));
        }
        Ok(())
    }
}

impl Strategy for ContextualStrategy {
    fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    fn model_bounds(&self) -> &Bounds {
        &self.joint_bounds
    }

    fn ready(&self) -> Result<()> {
        if self.context.is_some() {
            Ok(())
        } else {
            Err(Error::MissingContext)
        }
    }

    fn build_model(&self, x: &[Vec<f64>], y: &[f64]) -> Result<GpModel> {
        GpModel::fit(x, y, joint_kernel(self.input_dim, self.context_dim))
    }

    fn build_acquisition<'a>(
        &self,
        surrogate: &'a dyn Surrogate,
        kind: AcquisitionKind,
        best_f: Option<f64>,
        direction: Direction,
    ) -> Result<Box<dyn AcquisitionFunction + 'a>> {
        let context = self.context.as_deref().ok_or(Error::MissingContext)?;
        let acq = kind.build(surrogate, best_f, direction.is_maximize())?;
        Ok(Box::new(self.fix_context(acq, context)?))
    }

    fn optimize_acquisition(
        &self,
        acq: &dyn AcquisitionFunction,
        options: &AcqfOptions,
        rng: &mut fastrand::Rng,
        visualize: bool,
    ) -> Result<AcqfOptimum> {
        if visualize {
            trace_debug!("visualization is not available with a fixed context");
        }
        optimize_acqf(acq, &self.bounds, options, rng)
    }

    fn check_vicinity(&self, candidate: &[f64], history: &[Vec<f64>], threshold: f64) -> bool {
        let Some(context) = &self.context else {
            return false;
        };
        let mut joint = candidate.to_vec();
        joint.extend_from_slice(context);
        data_vicinity(&self.joint_bounds, &joint, history, threshold)
    }
}

/// A Bayesian optimization run with externally supplied context.
pub type ContextualBayesOpt = BayesOpt<ContextualStrategy>;

impl BayesOpt<ContextualStrategy> {
    /// Start configuring a run with `input_dim` decision and `context_dim` context variables.
    #[must_use]
    pub fn builder(input_dim: usize, context_dim: usize) -> ContextualBayesOptBuilder {
        ContextualBayesOptBuilder::new(input_dim, context_dim)
    }

    /// Build a run from a configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`Configuration`](Error::Configuration) error if the
    /// config is invalid, [`ResumeMismatch`](Error::ResumeMismatch) if
    /// `load_dir` holds a run with a different `input_dim`, `context_dim`
    /// or `maximize`, and [`Storage`](Error::Storage) errors from the run
    /// directories.
    pub fn from_config(config: ContextualConfig) -> Result<Self> {
        Self::from_config_with(config, LoopOptions::default())
    }

    /// Like [`from_config`](Self::from_config) with explicit loop options.
    ///
    /// # Errors
    ///
    /// See [`from_config`](Self::from_config).
    pub fn from_config_with(config: ContextualConfig, options: LoopOptions) -> Result<Self> {
        config.validate()?;
        let strategy = ContextualStrategy::new(
            config.base.input_dim,
            config.context_dim,
            config.base.bounds()?,
            config.context_bounds()?,
        )?;
        let files = open_run(
            &config,
            config.base.log_dir.as_deref(),
            config.base.load_dir.as_deref(),
        )?;
        let mut bo = Self::with_strategy(strategy, &config.base, options, files.log);
        bo.replay(files.evaluations, files.log_again)?;
        Ok(bo)
    }

    /// Build a run from a JSON configuration file.
    ///
    /// # Errors
    ///
    /// See [`from_config`](Self::from_config).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_config(ContextualConfig::from_file(path)?)
    }

    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.strategy.input_dim
    }

    #[must_use]
    pub fn context_dim(&self) -> usize {
        self.strategy.context_dim
    }

    #[must_use]
    pub fn joint_dim(&self) -> usize {
        self.strategy.joint_dim()
    }

    #[must_use]
    pub fn bounds(&self) -> &Bounds {
        &self.strategy.bounds
    }

    #[must_use]
    pub fn context_bounds(&self) -> &Bounds {
        &self.strategy.context_bounds
    }

    #[must_use]
    pub fn joint_bounds(&self) -> &Bounds {
        &self.strategy.joint_bounds
    }

    /// The context the next proposal is made for.
    #[must_use]
    pub fn context(&self) -> Option<&[f64]> {
        self.strategy.context()
    }

    /// The context the most recent observation was made under.
    #[must_use]
    pub fn prev_context(&self) -> Option<&[f64]> {
        self.strategy.prev_context()
    }

    /// Incorporate one goal from the client.
    ///
    /// Without a pending proposal the goal only sets the current context.
    /// Otherwise the pending point joined with the context it was proposed
    /// under is stored with the reported outcome, the current context moves
    /// to `prev_context`, the reported context becomes current, and the
    /// surrogate is rebuilt from the full history.
    ///
    /// # Errors
    ///
    /// Returns a [`Data`](Error::Data) error for a malformed context or a
    /// missing or non-finite outcome; nothing is changed in that case.
    /// Model-fitting failures are propagated after the history was updated.
    pub fn update(&mut self, goal: &ContextualGoal) -> Result<()> {
        self.strategy.check_context(&goal.c_new)?;

        let Some(x_new) = self.x_new.clone() else {
            trace_debug!(context = ?goal.c_new, "initial context received");
            self.strategy.context = Some(goal.c_new.clone());
            return Ok(());
        };
        let y = goal
            .y_new
            .ok_or_else(|| Error::Data("goal carries no outcome for the pending point".into()))?;
        let context = self.strategy.context.clone().ok_or(Error::MissingContext)?;

        let mut joint = x_new;
        joint.extend_from_slice(&context);
        self.record(joint, y)?;

        self.strategy.prev_context = Some(context);
        self.strategy.context = Some(goal.c_new.clone());
        self.x_new = None;
        trace_debug!(y, context = ?goal.c_new, n_data = self.data.len(), "goal ingested");

        self.refit()
    }

    /// Ingest `goal` and propose the next point; `None` once the budget is spent.
    ///
    /// # Errors
    ///
    /// See [`update`](Self::update) and [`propose`](BayesOpt::propose).
    pub fn next(&mut self, goal: &ContextualGoal) -> Result<Option<Proposal>> {
        self.update(goal)?;
        if self.budget_exhausted() {
            trace_info!(n_data = self.data.len(), "iteration budget exhausted");
            return Ok(None);
        }
        self.propose().map(Some)
    }

    /// The best observation split into decision point, context and outcome.
    ///
    /// # Errors
    ///
    /// Returns [`NoObservations`](Error::NoObservations) before the first observation.
    pub fn get_best_observation(&self) -> Result<(Vec<f64>, Vec<f64>, f64)> {
        let (x, y) = self.data.best().ok_or(Error::NoObservations)?;
        let (decision, context) = x.split_at(self.strategy.input_dim);
        Ok((decision.to_vec(), context.to_vec(), y))
    }

    /// The best decision point for `context` according to the posterior
    /// mean, with its expected outcome.
    ///
    /// Uses `prev_context` if and only if `context` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`MissingContext`](Error::MissingContext) if no context is
    /// given and none has been observed, [`ModelNotFitted`](Error::ModelNotFitted)
    /// before the first observation, and a [`Data`](Error::Data) error for a
    /// malformed context.
    pub fn get_optimal_parameters(&mut self, context: Option<&[f64]>) -> Result<(Vec<f64>, f64)> {
        let context = match context {
            Some(c) => c.to_vec(),
            None => self
                .strategy
                .prev_context
                .clone()
                .ok_or(Error::MissingContext)?,
        };
        let gp = self.gp.as_ref().ok_or(Error::ModelNotFitted)?;
        self.strategy.optimize_posterior_mean(
            gp,
            &context,
            self.direction,
            &self.options.acqf,
            &mut self.rng,
        )
    }
}

/// Builder for [`ContextualBayesOpt`].
#[derive(Clone, Debug)]
pub struct ContextualBayesOptBuilder {
    input_dim: usize,
    context_dim: usize,
    bounds: Option<Bounds>,
    context_bounds: Option<Bounds>,
    max_iter: usize,
    acq_func: AcquisitionKind,
    n_init: usize,
    maximize: bool,
    log_dir: Option<PathBuf>,
    load_dir: Option<PathBuf>,
    seed: Option<u64>,
    options: LoopOptions,
}

impl ContextualBayesOptBuilder {
    fn new(input_dim: usize, context_dim: usize) -> Self {
        Self {
            input_dim,
            context_dim,
            bounds: None,
            context_bounds: None,
            max_iter: 0,
            acq_func: AcquisitionKind::Ucb,
            n_init: 5,
            maximize: true,
            log_dir: None,
            load_dir: None,
            seed: None,
            options: LoopOptions::default(),
        }
    }

    /// Decision-variable bounds, shape `[2, input_dim]`.
    #[must_use]
    pub fn bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Context-variable bounds, shape `[2, context_dim]`.
    #[must_use]
    pub fn context_bounds(mut self, bounds: Bounds) -> Self {
        self.context_bounds = Some(bounds);
        self
    }

    /// Maximum number of observations. Default: 0 (unlimited).
    #[must_use]
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Default: UCB.
    #[must_use]
    pub fn acq_func(mut self, kind: AcquisitionKind) -> Self {
        self.acq_func = kind;
        self
    }

    /// Default: 5.
    #[must_use]
    pub fn n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Default: `true`.
    #[must_use]
    pub fn maximize(mut self, maximize: bool) -> Self {
        self.maximize = maximize;
        self
    }

    #[must_use]
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn load_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.load_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn acqf_options(mut self, options: AcqfOptions) -> Self {
        self.options.acqf = options;
        self
    }

    #[must_use]
    pub fn vicinity_threshold(mut self, threshold: f64) -> Self {
        self.options.vicinity_threshold = threshold;
        self
    }

    /// The configuration this builder describes.
    ///
    /// # Errors
    ///
    /// Returns a [`Configuration`](Error::Configuration) error if either
    /// set of bounds is missing.
    pub fn config(&self) -> Result<ContextualConfig> {
        let bounds = self
            .bounds
            .as_ref()
            .ok_or_else(|| Error::Configuration("bounds are required".into()))?;
        let context_bounds = self
            .context_bounds
            .as_ref()
            .ok_or_else(|| Error::Configuration("context bounds are required".into()))?;
        Ok(ContextualConfig {
            base: BayesOptConfig {
                input_dim: self.input_dim,
                max_iter: self.max_iter,
                lower_bound: bounds.lower().to_vec(),
                upper_bound: bounds.upper().to_vec(),
                acq_func: self.acq_func,
                n_init: self.n_init,
                maximize: self.maximize,
                log_dir: self.log_dir.clone(),
                load_dir: self.load_dir.clone(),
                seed: self.seed,
            },
            context_dim: self.context_dim,
            lower_bound_context: context_bounds.lower().to_vec(),
            upper_bound_context: context_bounds.upper().to_vec(),
        })
    }

    /// # Errors
    ///
    /// See [`ContextualBayesOpt::from_config`].
    pub fn build(self) -> Result<ContextualBayesOpt> {
        let config = self.config()?;
        ContextualBayesOpt::from_config_with(config, self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bayesopt::select_candidate;
    use crate::gp::Posterior;
    use crate::types::ProposalSource;

    fn unit(d: usize) -> Bounds {
        Bounds::new(vec![0.0; d], vec![1.0; d]).unwrap()
    }

    /// Mean `(x - 0.25)^2 + c`, unit variance.
    struct Bowl;

    impl Surrogate for Bowl {
        fn dim(&self) -> usize {
            2
        }

        fn posterior(&self, x: &[f64]) -> Posterior {
            Posterior {
                mean: (x[0] - 0.25).powi(2) + x[1],
                variance: 1.0,
            }
        }
    }

    #[test]
    fn joint_kernel_has_disjoint_blocks() {
        match joint_kernel(2, 3) {
            Kernel::Scale { base, prior, .. } => {
                assert_eq!(prior, Some(OUTPUTSCALE_PRIOR));
                match *base {
                    Kernel::Product(a, b) => {
                        assert!(matches!(*a, Kernel::Matern { ref active_dims, .. } if *active_dims == (0..2)));
                        assert!(matches!(*b, Kernel::Matern { ref active_dims, .. } if *active_dims == (2..5)));
                    }
                    other => panic!("expected product kernel, got {other:?}"),
                }
            }
            other => panic!("expected scale kernel, got {other:?}"),
        }
    }

    #[test]
    fn strategy_rejects_misshaped_bounds() {
        assert!(matches!(
            ContextualStrategy::new(2, 1, unit(1), unit(1)),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            ContextualStrategy::new(1, 2, unit(1), unit(1)),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn posterior_mean_sign_correction_when_minimizing() {
        let strategy = ContextualStrategy::new(1, 1, unit(1), unit(1)).unwrap();
        let options = AcqfOptions::default();
        let mut rng = fastrand::Rng::with_seed(9);

        let (x, value) = strategy
            .optimize_posterior_mean(&Bowl, &[0.4], Direction::Minimize, &options, &mut rng)
            .unwrap();
        assert!((x[0] - 0.25).abs() < 1e-3, "x = {}", x[0]);
        assert!((value - 0.4).abs() < 1e-5, "value = {value}");

        // The raw optimizer sees the negated mean.
        let pm = PosteriorMean {
            surrogate: &Bowl,
            maximize: false,
        };
        let pm = strategy.fix_context(Box::new(pm), &[0.4]).unwrap();
        let raw = optimize_acqf(&pm, &unit(1), &options, &mut rng).unwrap();
        assert!((value + raw.value).abs() < 1e-5);
    }

    #[test]
    fn posterior_mean_when_maximizing_hits_the_boundary() {
        let strategy = ContextualStrategy::new(1, 1, unit(1), unit(1)).unwrap();
        let mut rng = fastrand::Rng::with_seed(2);
        let (x, value) = strategy
            .optimize_posterior_mean(
                &Bowl,
                &[0.1],
                Direction::Maximize,
                &AcqfOptions::default(),
                &mut rng,
            )
            .unwrap();
        assert!((x[0] - 1.0).abs() < 1e-6, "x = {}", x[0]);
        assert!((value - (0.75_f64.powi(2) + 0.1)).abs() < 1e-5, "value = {value}");
    }

    #[test]
    fn vicinity_fallback_replaces_close_optimum() {
        let mut strategy = ContextualStrategy::new(2, 1, unit(2), unit(1)).unwrap();
        strategy.context = Some(vec![0.5]);
        let history = vec![vec![0.2, 0.8, 0.5]];
        let forced = AcqfOptimum {
            x: vec![0.2, 0.8 + 1e-5],
            value: 1.0,
        };
        let mut rng = fastrand::Rng::with_seed(4);
        let proposal = select_candidate(&strategy, forced.clone(), &history, 1e-3, &mut rng);
        assert_eq!(proposal.source, ProposalSource::VicinityFallback);
        assert_ne!(proposal.x, forced.x);
        assert!(strategy.bounds().contains(&proposal.x));
        assert!(proposal.acq_value.is_none());
    }

    #[test]
    fn vicinity_uses_current_context() {
        let mut strategy = ContextualStrategy::new(1, 1, unit(1), unit(1)).unwrap();
        strategy.prev_context = Some(vec![0.5]);
        strategy.context = Some(vec![0.9]);
        let history = vec![vec![0.2, 0.5]];
        // Same decision point, but the current context is far from the stored one.
        assert!(!strategy.check_vicinity(&[0.2], &history, 1e-3));
        strategy.context = Some(vec![0.5]);
        assert!(strategy.check_vicinity(&[0.2], &history, 1e-3));
    }

    #[test]
    fn acquisition_is_pinned_to_current_context() {
        let mut strategy = ContextualStrategy::new(1, 1, unit(1), unit(1)).unwrap();
        strategy.prev_context = Some(vec![0.2]);
        strategy.context = Some(vec![0.8]);

        for kind in [AcquisitionKind::Ucb, AcquisitionKind::Ei, AcquisitionKind::Pi] {
            let acq = strategy
                .build_acquisition(&Bowl, kind, Some(0.5), Direction::Maximize)
                .unwrap();
            let base = kind.build(&Bowl, Some(0.5), true).unwrap();
            assert_eq!(acq.dim(), 1);
            for x in [0.0, 0.1, 0.25, 0.6, 1.0] {
                let pinned = acq.evaluate(&[x]);
                assert!(
                    (pinned - base.evaluate(&[x, 0.8])).abs() < 1e-12,
                    "{kind} at x = {x}"
                );
                assert!((pinned - base.evaluate(&[x, 0.2])).abs() > 1e-6, "{kind} at x = {x}");
            }
        }
    }

    #[test]
    fn acquisition_requires_context() {
        let strategy = ContextualStrategy::new(1, 1, unit(1), unit(1)).unwrap();
        assert!(matches!(strategy.ready(), Err(Error::MissingContext)));
        assert!(matches!(
            strategy.build_acquisition(&Bowl, AcquisitionKind::Ucb, None, Direction::Maximize),
            Err(Error::MissingContext)
        ));
    }

    #[test]
    fn malformed_context_is_rejected_before_mutation() {
        let mut bo = ContextualBayesOpt::builder(1, 2)
            .bounds(unit(1))
            .context_bounds(unit(2))
            .seed(1)
            .build()
            .unwrap();
        assert!(matches!(
            bo.update(&ContextualGoal::initial(vec![0.1])),
            Err(Error::Data(_))
        ));
        assert!(matches!(
            bo.update(&ContextualGoal::initial(vec![0.1, f64::NAN])),
            Err(Error::Data(_))
        ));
        assert!(bo.context().is_none());
    }
}
