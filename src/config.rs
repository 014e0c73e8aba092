// src/config.rs

//! Configuration for Infomax training.

use crate::error::{InfomaxError, Result};
use ndarray::Array2;
use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Source of randomness for the block permutations.
///
/// The seed actually used is always recorded in the result, so a run made
/// with `Entropy` can be replayed with `Seeded`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RandomState {
    /// Reproducible permutations from a fixed seed.
    Seeded(u64),
    /// Non-deterministic: a seed is drawn from the thread RNG at start.
    #[default]
    Entropy,
}

impl RandomState {
    fn seed(self) -> u64 {
        match self {
            RandomState::Seeded(seed) => seed,
            RandomState::Entropy => rand::rng().random(),
        }
    }
}

/// Configuration parameters for Infomax training.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct InfomaxConfig {
    /// Initial learning rate. Defaults to `0.01 / ln(n_features²)`.
    pub l_rate: Option<f64>,

    /// Samples per block. Defaults to `floor(sqrt(n_samples / 3))`.
    pub block: Option<usize>,

    /// Training stops once the squared norm of an epoch's weight change,
    /// `Σ ΔW²`, falls below this value.
    pub w_change: f64,

    /// Angle in degrees between successive epoch updates above which the
    /// learning rate is reduced.
    pub anneal_deg: f64,

    /// Factor applied to the learning rate when annealing.
    pub anneal_step: f64,

    /// Use extended Infomax (per-component sub/super-Gaussian switching).
    pub extended: bool,

    /// Maximum number of epochs.
    pub max_iter: usize,

    /// Learn a bias term alongside the weights.
    pub biasing: bool,

    /// Initial unmixing matrix (n_features × n_features). Identity if None.
    pub w_init: Option<Array2<f64>>,

    /// Seed policy for block permutations.
    pub random_state: RandomState,
}

impl Default for InfomaxConfig {
    fn default() -> Self {
        Self {
            l_rate: None,
            block: None,
            w_change: 1e-12,
            anneal_deg: 60.0,
            anneal_step: 0.9,
            extended: false,
            max_iter: 200,
            biasing: true,
            w_init: None,
            random_state: RandomState::default(),
        }
    }
}

impl InfomaxConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for constructing a configuration.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Validate the parameters that do not depend on the data.
    pub fn validate(&self) -> Result<()> {
        if let Some(l_rate) = self.l_rate {
            if !(l_rate.is_finite() && l_rate > 0.0) {
                return Err(InfomaxError::invalid_config(
                    "l_rate",
                    format!("must be positive and finite, got {}", l_rate),
                ));
            }
        }

        if self.block == Some(0) {
            return Err(InfomaxError::invalid_config("block", "must be at least 1"));
        }

        if !(self.w_change.is_finite() && self.w_change >= 0.0) {
            return Err(InfomaxError::invalid_config(
                "w_change",
                format!("must be non-negative and finite, got {}", self.w_change),
            ));
        }

        if !(self.anneal_deg > 0.0 && self.anneal_deg <= 180.0) {
            return Err(InfomaxError::invalid_config(
                "anneal_deg",
                format!("must lie in (0, 180], got {}", self.anneal_deg),
            ));
        }

        if !(self.anneal_step > 0.0 && self.anneal_step <= 1.0) {
            return Err(InfomaxError::invalid_config(
                "anneal_step",
                format!("must lie in (0, 1], got {}", self.anneal_step),
            ));
        }

        if self.max_iter == 0 {
            return Err(InfomaxError::invalid_config(
                "max_iter",
                "must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Validate against the data shape and fill in the derived defaults.
    ///
    /// The data is `n_samples × n_features`.
    pub fn resolve(&self, n_samples: usize, n_features: usize) -> Result<ResolvedConfig> {
        self.validate()?;

        if n_features == 0 || n_samples == 0 {
            return Err(InfomaxError::invalid_shape("input matrix cannot be empty"));
        }
        if n_samples < n_features {
            return Err(InfomaxError::invalid_shape(format!(
                "need at least as many samples as features, got {} samples for {} features",
                n_samples, n_features
            )));
        }

        let l_rate = match self.l_rate {
            Some(l_rate) => l_rate,
            None if n_features < 2 => {
                return Err(InfomaxError::invalid_config(
                    "l_rate",
                    "no default for a single feature, set it explicitly",
                ));
            }
            None => 0.01 / ((n_features * n_features) as f64).ln(),
        };

        let block = self
            .block
            .unwrap_or_else(|| ((n_samples as f64 / 3.0).sqrt().floor() as usize).max(1));
        if block > n_samples {
            return Err(InfomaxError::invalid_config(
                "block",
                format!("{} exceeds the number of samples ({})", block, n_samples),
            ));
        }

        if let Some(w) = &self.w_init {
            if w.shape() != [n_features, n_features] {
                return Err(InfomaxError::invalid_shape(format!(
                    "w_init shape {:?} doesn't match expected ({}, {})",
                    w.shape(),
                    n_features,
                    n_features
                )));
            }
            if w.iter().any(|v| !v.is_finite()) {
                return Err(InfomaxError::invalid_config(
                    "w_init",
                    "contains non-finite values",
                ));
            }
        }

        Ok(ResolvedConfig {
            n_samples,
            n_features,
            l_rate,
            block,
            w_change: self.w_change,
            anneal_deg: self.anneal_deg,
            anneal_step: self.anneal_step,
            extended: self.extended,
            max_iter: self.max_iter,
            biasing: self.biasing,
            seed: self.random_state.seed(),
        })
    }
}

/// An immutable, fully-resolved configuration for one training run.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedConfig {
    pub n_samples: usize,
    pub n_features: usize,
    pub l_rate: f64,
    pub block: usize,
    pub w_change: f64,
    pub anneal_deg: f64,
    pub anneal_step: f64,
    pub extended: bool,
    pub max_iter: usize,
    pub biasing: bool,
    /// Seed used for the block permutations.
    pub seed: u64,
}

/// Builder for constructing `InfomaxConfig` with a fluent API.
#[derive(Default)]
pub struct ConfigBuilder {
    config: InfomaxConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            config: InfomaxConfig::default(),
        }
    }

    /// Set the initial learning rate.
    pub fn l_rate(mut self, l_rate: f64) -> Self {
        self.config.l_rate = Some(l_rate);
        self
    }

    /// Set the block size.
    pub fn block(mut self, block: usize) -> Self {
        self.config.block = Some(block);
        self
    }

    /// Set the convergence threshold on the mean absolute weight change.
    pub fn w_change(mut self, w_change: f64) -> Self {
        self.config.w_change = w_change;
        self
    }

    /// Set the annealing angle in degrees.
    pub fn anneal_deg(mut self, anneal_deg: f64) -> Self {
        self.config.anneal_deg = anneal_deg;
        self
    }

    /// Set the annealing factor.
    pub fn anneal_step(mut self, anneal_step: f64) -> Self {
        self.config.anneal_step = anneal_step;
        self
    }

    /// Enable or disable extended Infomax.
    pub fn extended(mut self, extended: bool) -> Self {
        self.config.extended = extended;
        self
    }

    /// Set the maximum number of epochs.
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter;
        self
    }

    /// Enable or disable the bias term.
    pub fn biasing(mut self, biasing: bool) -> Self {
        self.config.biasing = biasing;
        self
    }

    /// Set the initial unmixing matrix.
    pub fn w_init(mut self, w_init: Array2<f64>) -> Self {
        self.config.w_init = Some(w_init);
        self
    }

    /// Use a fixed seed for the block permutations.
    pub fn random_state(mut self, seed: u64) -> Self {
        self.config.random_state = RandomState::Seeded(seed);
        self
    }

    /// Draw the permutation seed from the thread RNG.
    pub fn nondeterministic(mut self) -> Self {
        self.config.random_state = RandomState::Entropy;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> InfomaxConfig {
        self.config
    }

    /// Build and validate the configuration.
    pub fn build_validated(self) -> Result<InfomaxConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
