// src/lib.rs

//! # Infomax
//!
//! Independent Component Analysis by information maximisation, trained with
//! stochastic natural-gradient ascent over shuffled mini-batches.
//!
//! This crate implements the Infomax algorithm and its extended variant from:
//!
//! > Anthony J. Bell, Terrence J. Sejnowski.
//! > "An information-maximization approach to blind separation and blind
//! > deconvolution", Neural Computation, 1995
//!
//! > Te-Won Lee, Mark Girolami, Terrence J. Sejnowski.
//! > "Independent component analysis using an extended infomax algorithm for
//! > mixed subgaussian and supergaussian sources", Neural Computation, 1999
//!
//! Training anneals the learning rate when successive epochs point in
//! different directions, and restarts from the last stable weights with a
//! smaller step whenever an epoch blows up.
//!
//! ## Example
//!
//! ```rust,no_run
//! use infomax::{Infomax, InfomaxConfig};
//! use ndarray::Array2;
//!
//! # fn main() -> Result<(), infomax::InfomaxError> {
//! // Data is n_samples x n_features, ideally already whitened
//! let x = Array2::<f64>::zeros((1000, 4));
//!
//! // Fit with default settings
//! let result = Infomax::fit(&x)?;
//!
//! // Or with custom configuration
//! let config = InfomaxConfig::builder()
//!     .extended(true)
//!     .max_iter(500)
//!     .random_state(42)
//!     .build();
//! let result = Infomax::fit_with_config(&x, &config)?;
//!
//! // Recover the sources
//! let sources = Infomax::transform(&x, &result)?;
//! println!("{} after {} epochs", result.status, result.n_iterations);
//! # Ok(())
//! # }
//! ```

mod anneal;
mod config;
mod error;
mod gradient;
mod guard;
mod kurtosis;
mod math;
mod nonlinearity;
mod observer;
mod result;
mod sampler;
mod solver;
mod trainer;

pub use config::{ConfigBuilder, InfomaxConfig, RandomState, ResolvedConfig};
pub use error::{InfomaxError, UpdateStage};
pub use guard::Instability;
pub use observer::{EpochReport, LogObserver, NoopObserver, RecoveryEvent, TrainingObserver};
pub use result::{InfomaxResult, TrainingStatus};
pub use sampler::{BlockOrder, BlockSampler, EpochBlocks};
pub use solver::Infomax;
pub use trainer::{CancelToken, Trainer};

// Utility functions
pub mod utils;

// Re-export ndarray for convenience
pub use ndarray;
