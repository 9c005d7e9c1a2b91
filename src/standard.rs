//! Context-free Bayesian optimization.

use std::path::{Path, PathBuf};

use crate::acquisition::{AcquisitionKind, PosteriorMean};
use crate::bayesopt::{BayesOpt, LoopOptions, open_run, sign_corrected};
use crate::bounds::Bounds;
use crate::config::BayesOptConfig;
use crate::error::{Error, Result};
use crate::optim::AcqfOptions;
use crate::strategy::{StandardStrategy, Strategy};
use crate::types::{Goal, Proposal};

/// A Bayesian optimization run over the decision variables alone.
///
/// # Examples
///
/// ```
/// use contextual_bayesopt::{Bounds, Goal, StandardBayesOpt};
///
/// let mut bo = StandardBayesOpt::builder(1)
///     .bounds(Bounds::new(vec![0.0], vec![1.0]).unwrap())
///     .n_init(2)
///     .seed(1)
///     .build()
///     .unwrap();
///
/// // The first goal only starts the run.
/// let x = bo.next(&Goal::default()).unwrap().unwrap().x;
/// let y = -(x[0] - 0.3_f64).powi(2);
/// bo.next(&Goal { y_new: Some(y) }).unwrap();
/// assert_eq!(bo.n_data(), 1);
/// ```
pub type StandardBayesOpt = BayesOpt<StandardStrategy>;

impl BayesOpt<StandardStrategy> {
    /// Start configuring a run with `input_dim` decision variables.
    #[must_use]
    pub fn builder(input_dim: usize) -> StandardBayesOptBuilder {
        StandardBayesOptBuilder::new(input_dim)
    }

    /// Build a run from a configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`Configuration`](Error::Configuration) error if the
    /// config is invalid, [`ResumeMismatch`](Error::ResumeMismatch) if
    /// `load_dir` holds an incompatible run, and
    /// [`Storage`](Error::Storage) errors from the run directories.
    pub fn from_config(config: BayesOptConfig) -> Result<Self> {
        Self::from_config_with(config, LoopOptions::default())
    }

    /// Like [`from_config`](Self::from_config) with explicit loop options.
    ///
    /// # Errors
    ///
    /// See [`from_config`](Self::from_config).
    pub fn from_config_with(config: BayesOptConfig, options: LoopOptions) -> Result<Self> {
        config.validate()?;
        let files = open_run(&config, config.log_dir.as_deref(), config.load_dir.as_deref())?;
        let strategy = StandardStrategy::new(config.bounds()?);
        let mut bo = Self::with_strategy(strategy, &config, options, files.log);
        bo.replay(files.evaluations, files.log_again)?;
        Ok(bo)
    }

    /// Build a run from a JSON configuration file.
    ///
    /// # Errors
    ///
    /// See [`from_config`](Self::from_config).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_config(BayesOptConfig::from_file(path)?)
    }

    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.strategy.bounds().dim()
    }

    #[must_use]
    pub fn bounds(&self) -> &Bounds {
        self.strategy.bounds()
    }

    /// Incorporate the client's outcome for the pending proposal.
    ///
    /// Without a pending proposal the goal only starts the run and any
    /// outcome it carries is ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`Data`](Error::Data) error if the outcome is missing or
    /// non-finite, and propagates model-fitting failures.
    pub fn update(&mut self, goal: &Goal) -> Result<()> {
        let Some(x_new) = self.x_new.clone() else {
            trace_debug!("first goal received, no pending point");
            return Ok(());
        };
        let y = goal
            .y_new
            .ok_or_else(|| Error::Data("goal carries no outcome for the pending point".into()))?;
        self.record(x_new, y)?;
        self.x_new = None;
        self.refit()
    }

    /// Ingest `goal` and propose the next point; `None` once the budget is spent.
    ///
    /// # Errors
    ///
    /// See [`update`](Self::update) and [`propose`](BayesOpt::propose).
    pub fn next(&mut self, goal: &Goal) -> Result<Option<Proposal>> {
        self.update(goal)?;
        if self.budget_exhausted() {
            trace_info!(n_data = self.data.len(), "iteration budget exhausted");
            return Ok(None);
        }
        self.propose().map(Some)
    }

    /// The best observed decision point and its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`NoObservations`](Error::NoObservations) before the first observation.
    pub fn get_best_observation(&self) -> Result<(Vec<f64>, f64)> {
        let (x, y) = self.data.best().ok_or(Error::NoObservations)?;
        Ok((x.to_vec(), y))
    }

    /// The maximizer (minimizer) of the posterior mean and its expected outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ModelNotFitted`](Error::ModelNotFitted) before the first
    /// observation, and propagates optimizer failures.
    pub fn get_optimal_parameters(&mut self) -> Result<(Vec<f64>, f64)> {
        let gp = self.gp.as_ref().ok_or(Error::ModelNotFitted)?;
        let pm = PosteriorMean {
            surrogate: gp,
            maximize: self.direction.is_maximize(),
        };
        let opt = self
            .strategy
            .optimize_acquisition(&pm, &self.options.acqf, &mut self.rng, false)?;
        Ok((opt.x, sign_corrected(opt.value, self.direction)))
    }
}

/// Builder for [`StandardBayesOpt`].
#[derive(Clone, Debug)]
pub struct StandardBayesOptBuilder {
    input_dim: usize,
    bounds: Option<Bounds>,
    max_iter: usize,
    acq_func: AcquisitionKind,
    n_init: usize,
    maximize: bool,
    log_dir: Option<PathBuf>,
    load_dir: Option<PathBuf>,
    seed: Option<u64>,
    options: LoopOptions,
}

impl StandardBayesOptBuilder {
    fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            bounds: None,
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

    #[must_use]
    pub fn bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
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
    /// Returns a [`Configuration`](Error::Configuration) error if no bounds were set.
    pub fn config(&self) -> Result<BayesOptConfig> {
        let bounds = self
            .bounds
            .as_ref()
            .ok_or_else(|| Error::Configuration("bounds are required".into()))?;
        Ok(BayesOptConfig {
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
        })
    }

    /// # Errors
    ///
    /// See [`StandardBayesOpt::from_config`].
    pub fn build(self) -> Result<StandardBayesOpt> {
        let config = self.config()?;
        StandardBayesOpt::from_config_with(config, self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, ProposalSource};

    fn bo(maximize: bool) -> StandardBayesOpt {
        StandardBayesOpt::builder(1)
            .bounds(Bounds::new(vec![0.0], vec![1.0]).unwrap())
            .n_init(3)
            .max_iter(8)
            .maximize(maximize)
            .seed(5)
            .build()
            .unwrap()
    }

    #[test]
    fn first_goal_is_a_trigger() {
        let mut bo = bo(true);
        bo.update(&Goal { y_new: Some(1.0) }).unwrap();
        assert_eq!(bo.n_data(), 0);
        assert!(bo.model().is_none());
    }

    #[test]
    fn missing_outcome_is_a_data_error() {
        let mut bo = bo(true);
        bo.next(&Goal::default()).unwrap();
        assert!(matches!(bo.update(&Goal::default()), Err(Error::Data(_))));
        assert!(matches!(
            bo.update(&Goal {
                y_new: Some(f64::NAN)
            }),
            Err(Error::Data(_))
        ));
        assert_eq!(bo.n_data(), 0);
        assert!(bo.x_new().is_some());
    }

    #[test]
    fn initial_design_then_acquisition_until_budget() {
        let mut bo = bo(false);
        assert_eq!(bo.direction(), Direction::Minimize);
        let mut goal = Goal::default();
        let mut sources = Vec::new();
        while let Some(p) = bo.next(&goal).unwrap() {
            assert!(bo.bounds().contains(&p.x));
            sources.push(p.source);
            goal = Goal {
                y_new: Some((p.x[0] - 0.6).powi(2)),
            };
        }
        assert_eq!(bo.n_data(), 8);
        assert!(sources[..3].iter().all(|s| *s == ProposalSource::Initial));
        assert!(sources[3..].iter().all(|s| *s != ProposalSource::Initial));

        let (_, y_best) = bo.get_best_observation().unwrap();
        let (_, ys) = bo.data().get_xy();
        assert!(ys.iter().all(|&y| y >= y_best));
    }

    #[test]
    fn random_point_without_model_is_labelled() {
        let mut bo = bo(true);
        let mut goal = Goal::default();
        for _ in 0..4 {
            let p = bo.next(&goal).unwrap().unwrap();
            goal = Goal {
                y_new: Some(p.x[0]),
            };
        }
        assert_eq!(bo.n_data(), 3);
        assert!(bo.model().is_some());

        // As left behind by a failed refit.
        bo.gp = None;
        let p = bo.propose().unwrap();
        assert_eq!(p.source, ProposalSource::ModelUnavailable);
        assert!(p.acq_value.is_none());
        assert!(bo.bounds().contains(&p.x));
    }

    #[test]
    fn optimal_parameters_need_a_model() {
        let mut bo = bo(true);
        assert!(matches!(
            bo.get_optimal_parameters(),
            Err(Error::ModelNotFitted)
        ));
        assert!(matches!(
            bo.get_best_observation(),
            Err(Error::NoObservations)
        ));
    }

    #[test]
    fn builder_requires_bounds() {
        let result = StandardBayesOpt::builder(2).build();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn builder_checks_bounds_shape() {
        let result = StandardBayesOpt::builder(2)
            .bounds(Bounds::new(vec![0.0], vec![1.0]).unwrap())
            .build();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
