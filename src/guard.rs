// src/guard.rs

//! Blow-up detection and recovery from the last stable state.

use crate::error::{InfomaxError, Result, UpdateStage};
use crate::kurtosis::KurtosisEstimator;
use crate::math::{all_finite, log_abs_det, max_abs};
use ndarray::{Array1, Array2};
use std::fmt;

/// Weights larger than this in magnitude count as a blow-up.
pub const MAX_WEIGHT: f64 = 1e8;

/// An epoch whose change exceeds the previous stable one by this factor
/// counts as a blow-up.
pub const DELTA_BLOWUP_RATIO: f64 = 1e3;

/// Recoveries allowed in a row before training is declared divergent.
pub const MAX_CONSECUTIVE_RECOVERIES: usize = 5;

/// Training is abandoned if recovery would push the learning rate below this.
pub const MIN_L_RATE: f64 = 1e-10;

/// Why an epoch was rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instability {
    /// A block or kurtosis update produced NaN or infinite values.
    NonFiniteUpdate(UpdateStage),
    /// The weights contain NaN or infinite values.
    NonFiniteWeights,
    /// A weight exceeds 1e8 in magnitude.
    WeightOverflow(f64),
    /// The weight matrix became singular.
    SingularWeights,
    /// The epoch's weight change is not finite.
    NonFiniteDelta,
    /// The weight change jumped by more than a factor of 1e3.
    DeltaBlowup { delta: f64, previous: f64 },
}

impl fmt::Display for Instability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instability::NonFiniteUpdate(stage) => {
                write!(f, "non-finite values in the {}", stage)
            }
            Instability::NonFiniteWeights => write!(f, "non-finite weights"),
            Instability::WeightOverflow(max) => {
                write!(f, "weight magnitude {:.4e} exceeds {:.0e}", max, MAX_WEIGHT)
            }
            Instability::SingularWeights => write!(f, "singular weight matrix"),
            Instability::NonFiniteDelta => write!(f, "non-finite weight change"),
            Instability::DeltaBlowup { delta, previous } => write!(
                f,
                "weight change jumped from {:.4e} to {:.4e}",
                previous, delta
            ),
        }
    }
}

/// State restored when an epoch is rejected.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
    pub kurtosis: Option<KurtosisEstimator>,
}

/// Keeps the last stable state and counts recoveries.
#[derive(Debug, Clone)]
pub struct StabilityGuard {
    snapshot: Snapshot,
    last_delta: Option<f64>,
    consecutive: usize,
    total: usize,
}

impl StabilityGuard {
    /// Start from an initial state that is assumed stable.
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            last_delta: None,
            consecutive: 0,
            total: 0,
        }
    }

    /// The last stable state.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Recoveries performed over the whole run.
    pub fn total_recoveries(&self) -> usize {
        self.total
    }

    /// Recoveries performed since the last stable epoch.
    pub fn consecutive_recoveries(&self) -> usize {
        self.consecutive
    }

    /// Check the state reached at the end of an epoch.
    pub fn inspect(&self, weights: &Array2<f64>, delta: f64) -> Option<Instability> {
        if !all_finite(weights) {
            return Some(Instability::NonFiniteWeights);
        }
        let max = max_abs(weights);
        if max > MAX_WEIGHT {
            return Some(Instability::WeightOverflow(max));
        }
        if log_abs_det(weights).is_none() {
            return Some(Instability::SingularWeights);
        }
        if !delta.is_finite() {
            return Some(Instability::NonFiniteDelta);
        }
        match self.last_delta {
            Some(previous) if previous > 0.0 && delta > previous * DELTA_BLOWUP_RATIO => {
                Some(Instability::DeltaBlowup { delta, previous })
            }
            _ => None,
        }
    }

    /// Record a stable epoch as the new restore point.
    pub fn commit(&mut self, snapshot: Snapshot, delta: f64) {
        self.snapshot = snapshot;
        self.last_delta = Some(delta);
        self.consecutive = 0;
    }

    /// Count a recovery and return the halved learning rate, or fail with
    /// [`InfomaxError::Divergent`] once the budget is spent.
    ///
    /// The caller restores its state from [`StabilityGuard::snapshot`].
    pub fn recover(&mut self, l_rate: f64, cause: Instability) -> Result<f64> {
        let halved = l_rate * 0.5;
        if self.consecutive >= MAX_CONSECUTIVE_RECOVERIES || halved < MIN_L_RATE {
            return Err(InfomaxError::Divergent {
                recoveries: self.consecutive,
                l_rate,
                reason: cause.to_string(),
            });
        }

        self.consecutive += 1;
        self.total += 1;
        Ok(halved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn guard() -> StabilityGuard {
        StabilityGuard::new(Snapshot {
            weights: Array2::eye(2),
            bias: Array1::zeros(2),
            kurtosis: None,
        })
    }

    #[test]
    fn test_stable_state_passes() {
        let guard = guard();
        assert_eq!(guard.inspect(&array![[1.0, 0.3], [0.2, 2.0]], 0.1), None);
    }

    #[test]
    fn test_detects_bad_weights() {
        let guard = guard();
        assert_eq!(
            guard.inspect(&array![[1.0, f64::NAN], [0.0, 1.0]], 0.1),
            Some(Instability::NonFiniteWeights)
        );
        assert!(matches!(
            guard.inspect(&array![[1e9, 0.0], [0.0, 1.0]], 0.1),
            Some(Instability::WeightOverflow(_))
        ));
        assert_eq!(
            guard.inspect(&array![[1.0, 2.0], [2.0, 4.0]], 0.1),
            Some(Instability::SingularWeights)
        );
        assert_eq!(
            guard.inspect(&Array2::eye(2), f64::INFINITY),
            Some(Instability::NonFiniteDelta)
        );
    }

    #[test]
    fn test_detects_delta_blowup() {
        let mut guard = guard();
        guard.commit(
            Snapshot {
                weights: Array2::eye(2),
                bias: Array1::zeros(2),
                kurtosis: None,
            },
            1e-3,
        );

        assert_eq!(guard.inspect(&Array2::eye(2), 0.5), None);
        assert!(matches!(
            guard.inspect(&Array2::eye(2), 10.0),
            Some(Instability::DeltaBlowup { .. })
        ));
    }

    #[test]
    fn test_recover_halves_rate() {
        let mut guard = guard();
        let l_rate = guard.recover(0.1, Instability::NonFiniteWeights).unwrap();
        assert_eq!(l_rate, 0.05);
        assert_eq!(guard.consecutive_recoveries(), 1);
        assert_eq!(guard.total_recoveries(), 1);
    }

    #[test]
    fn test_budget_exhausted_is_divergent() {
        let mut guard = guard();
        let mut l_rate = 1.0;
        for _ in 0..MAX_CONSECUTIVE_RECOVERIES {
            l_rate = guard.recover(l_rate, Instability::NonFiniteWeights).unwrap();
        }

        let err = guard
            .recover(l_rate, Instability::NonFiniteWeights)
            .unwrap_err();
        assert!(matches!(
            err,
            InfomaxError::Divergent { recoveries, .. } if recoveries == MAX_CONSECUTIVE_RECOVERIES
        ));
    }

    #[test]
    fn test_commit_resets_consecutive_count() {
        let mut guard = guard();
        guard.recover(1.0, Instability::NonFiniteWeights).unwrap();
        guard.recover(0.5, Instability::NonFiniteWeights).unwrap();
        guard.commit(guard.snapshot().clone(), 0.1);

        assert_eq!(guard.consecutive_recoveries(), 0);
        assert_eq!(guard.total_recoveries(), 2);
    }

    #[test]
    fn test_minimum_learning_rate() {
        let mut guard = guard();
        assert!(guard.recover(1e-10, Instability::NonFiniteWeights).is_err());
    }
}
