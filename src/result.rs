//! Result types for Infomax training.

use crate::error::Result;
use crate::math::invert;
use ndarray::{Array1, Array2};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a successful run ended.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingStatus {
    /// The weight change fell below `w_change`.
    Converged,
    /// `max_iter` epochs ran without converging. The weights are usable but
    /// may not be fully separated.
    IterationLimitReached,
    /// Stopped through a [`CancelToken`](crate::CancelToken); the weights are
    /// the last stable ones.
    Cancelled,
}

impl fmt::Display for TrainingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingStatus::Converged => f.write_str("converged"),
            TrainingStatus::IterationLimitReached => f.write_str("iteration limit reached"),
            TrainingStatus::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Result of an Infomax training run.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct InfomaxResult {
    /// Unmixing matrix W (n_features × n_features): `sources = W · x` for a
    /// column sample `x`.
    pub unmixing: Array2<f64>,

    /// Learned bias (n_features,). None if biasing was disabled.
    pub bias: Option<Array1<f64>>,

    /// How training ended.
    pub status: TrainingStatus,

    /// Number of epochs accepted.
    pub n_iterations: usize,

    /// Learning rate at the end of training.
    pub l_rate: f64,

    /// Mean absolute weight change of the last accepted epoch.
    pub delta: f64,

    /// Kurtosis signs for extended Infomax (+1 super-, −1 sub-Gaussian).
    pub signs: Option<Array1<f64>>,

    /// Epochs rejected and restarted by the stability guard.
    pub n_recoveries: usize,

    /// Seed of the block permutations, for replaying the run.
    pub seed: u64,
}

impl InfomaxResult {
    /// Whether the run met the convergence criterion.
    pub fn converged(&self) -> bool {
        self.status == TrainingStatus::Converged
    }

    /// Mixing matrix, the inverse of the unmixing matrix.
    ///
    /// Column `i` is the projection of source `i` onto the channels.
    pub fn mixing(&self) -> Result<Array2<f64>> {
        invert(&self.unmixing)
    }
}
