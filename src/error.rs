// src/error.rs

//! Error types for the Infomax crate.

use thiserror::Error;

/// Where a non-finite value was produced during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    /// The weight or bias update of a single block.
    Gradient,
    /// The per-epoch kurtosis estimate of extended Infomax.
    Kurtosis,
}

impl std::fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateStage::Gradient => f.write_str("gradient step"),
            UpdateStage::Kurtosis => f.write_str("kurtosis estimate"),
        }
    }
}

/// Errors that can occur during Infomax training.
#[derive(Debug, Clone, Error)]
pub enum InfomaxError {
    /// Input dimensions are invalid.
    #[error("Invalid shape: {message}")]
    InvalidShape {
        /// Description of the dimension error.
        message: String,
    },

    /// Invalid configuration parameter.
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why it's invalid.
        message: String,
    },

    /// An update produced NaN or infinite values and was rejected.
    ///
    /// Recovered internally by the stability guard and never returned from
    /// a training run.
    #[error("Non-finite values produced by the {stage}")]
    NonFiniteUpdate {
        /// Which part of the epoch produced the values.
        stage: UpdateStage,
    },

    /// Training could not be stabilised within the recovery budget.
    #[error(
        "Infomax diverged after {recoveries} recoveries \
         (learning rate {l_rate:.4e}): {reason}"
    )]
    Divergent {
        /// Number of consecutive recoveries attempted.
        recoveries: usize,
        /// Learning rate at the time training was abandoned.
        l_rate: f64,
        /// The instability that exhausted the budget.
        reason: String,
    },

    /// A singular matrix was encountered.
    #[error("Singular matrix encountered during computation")]
    SingularMatrix,
}

/// Convenience type alias for Results with InfomaxError.
pub type Result<T> = std::result::Result<T, InfomaxError>;

impl InfomaxError {
    pub(crate) fn invalid_config(parameter: &str, message: impl Into<String>) -> Self {
        InfomaxError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_shape(message: impl Into<String>) -> Self {
        InfomaxError::InvalidShape {
            message: message.into(),
        }
    }
}
