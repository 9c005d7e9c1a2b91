//! Run configuration.
//!
//! Configurations are plain `serde` structs, usually read from JSON. They
//! are validated before any optimizer state is created.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::acquisition::AcquisitionKind;
use crate::bounds::Bounds;
use crate::error::{Error, Result};

/// Configuration of a standard (context-free) run.
///
/// # Examples
///
/// ```
/// use contextual_bayesopt::BayesOptConfig;
///
/// let config = BayesOptConfig::from_json_str(r#"{
///     "input_dim": 2,
///     "max_iter": 30,
///     "lower_bound": [0.0, -1.0],
///     "upper_bound": [1.0, 1.0],
///     "acq_func": "UCB",
///     "n_init": 5,
///     "maximize": true
/// }"#).unwrap();
/// assert_eq!(config.input_dim, 2);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BayesOptConfig {
    /// Number of decision variables.
    pub input_dim: usize,
    /// Maximum number of observations; `0` means unlimited.
    pub max_iter: usize,
    pub lower_bound: Vec<f64>,
    pub upper_bound: Vec<f64>,
    pub acq_func: AcquisitionKind,
    /// Number of uniformly random proposals before the model is used.
    pub n_init: usize,
    pub maximize: bool,
    /// Directory receiving the run config and the evaluation journal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    /// Directory of a previous run to resume from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_dir: Option<PathBuf>,
    /// RNG seed for reproducible runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Configuration of a contextual run: the standard keys plus the context space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContextualConfig {
    #[serde(flatten)]
    pub base: BayesOptConfig,
    /// Number of context variables.
    pub context_dim: usize,
    pub lower_bound_context: Vec<f64>,
    pub upper_bound_context: Vec<f64>,
}

/// Parameters that must not change when a run is resumed.
pub trait ConstantConfig {
    /// Names and rendered values of the constant parameters.
    fn constant_parameters(&self) -> Vec<(&'static str, String)>;

    /// Compare against the configuration stored with a persisted run.
    ///
    /// # Errors
    ///
    /// Returns [`ResumeMismatch`](Error::ResumeMismatch) on the first
    /// parameter that differs.
    fn check_resume(&self, persisted: &Self) -> Result<()> {
        for ((parameter, requested), (_, stored)) in self
            .constant_parameters()
            .into_iter()
            .zip(persisted.constant_parameters())
        {
            if requested != stored {
                return Err(Error::ResumeMismatch {
                    parameter,
                    persisted: stored,
                    requested,
                });
            }
        }
        Ok(())
    }
}

impl BayesOptConfig {
    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`Configuration`](Error::Configuration) error for missing
    /// keys, wrong types, or failed validation.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = parse_json(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// See [`BayesOptConfig::from_json_str`]; unreadable files are also
    /// reported as configuration errors.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&read_config_file(path.as_ref())?)
    }

    /// Check dimensions and bounds.
    ///
    /// # Errors
    ///
    /// Returns a [`Configuration`](Error::Configuration) error describing
    /// the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 {
            return Err(Error::Configuration("input_dim must be at least 1".into()));
        }
        let bounds = self.bounds()?;
        if bounds.dim() != self.input_dim {
            return Err(Error::Configuration(format!(
                "bounds must have shape [2, {}], got [2, {}]",
                self.input_dim,
                bounds.dim()
            )));
        }
        Ok(())
    }

    /// Decision-variable bounds.
    ///
    /// # Errors
    ///
    /// See [`Bounds::new`].
    pub fn bounds(&self) -> Result<Bounds> {
        Bounds::new(self.lower_bound.clone(), self.upper_bound.clone())
    }
}

impl ConstantConfig for BayesOptConfig {
    fn constant_parameters(&self) -> Vec<(&'static str, String)> {
        vec![
            ("input_dim", self.input_dim.to_string()),
            ("maximize", self.maximize.to_string()),
        ]
    }
}

impl ContextualConfig {
    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`Configuration`](Error::Configuration) error for missing
    /// keys, wrong types, or failed validation.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = parse_json(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// See [`ContextualConfig::from_json_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&read_config_file(path.as_ref())?)
    }

    /// Check dimensions and bounds of both the decision and the context space.
    ///
    /// # Errors
    ///
    /// Returns a [`Configuration`](Error::Configuration) error describing
    /// the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.base.validate()?;
        if self.context_dim == 0 {
            return Err(Error::Configuration("context_dim must be at least 1".into()));
        }
        let context_bounds = self.context_bounds()?;
        if context_bounds.dim() != self.context_dim {
            return Err(Error::Configuration(format!(
                "context bounds must have shape [2, {}], got [2, {}]",
                self.context_dim,
                context_bounds.dim()
            )));
        }
        Ok(())
    }

    /// Context-variable bounds.
    ///
    /// # Errors
    ///
    /// See [`Bounds::new`].
    pub fn context_bounds(&self) -> Result<Bounds> {
        Bounds::new(
            self.lower_bound_context.clone(),
            self.upper_bound_context.clone(),
        )
    }
}

impl ConstantConfig for ContextualConfig {
    fn constant_parameters(&self) -> Vec<(&'static str, String)> {
        vec![
            ("input_dim", self.base.input_dim.to_string()),
            ("context_dim", self.context_dim.to_string()),
            ("maximize", self.base.maximize.to_string()),
        ]
    }
}

fn parse_json<C: DeserializeOwned>(s: &str) -> Result<C> {
    serde_json::from_str(s).map_err(|e| Error::Configuration(e.to_string()))
}

fn read_config_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::Configuration(format!("cannot read {}: {e}", path.display())))
}
