// src/anneal.rs

//! Learning-rate annealing and the convergence decision.

use crate::config::ResolvedConfig;
use crate::math::{angle_degrees, mean_abs_diff, sum_squares};
use ndarray::Array2;

/// What the controller decided after an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnealSignal {
    /// Keep training.
    Continue,
    /// The squared norm of the epoch's weight change fell below `w_change`.
    Converged,
    /// `max_iter` epochs have been completed.
    IterationLimitReached,
}

/// Net weight change over one epoch.
#[derive(Debug, Clone)]
pub struct EpochChange {
    /// `W_after − W_before`.
    pub direction: Array2<f64>,
    /// Mean absolute entry of `direction`.
    pub delta: f64,
    /// Sum of squared entries of `direction`, compared against `w_change`.
    pub squared_norm: f64,
}

impl EpochChange {
    pub fn between(before: &Array2<f64>, after: &Array2<f64>) -> Self {
        let direction = after - before;
        Self {
            squared_norm: sum_squares(&direction),
            delta: mean_abs_diff(after, before),
            direction,
        }
    }
}

/// Outcome of [`AnnealController::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnealDecision {
    pub signal: AnnealSignal,
    /// Angle to the previous epoch's direction, if there was one.
    pub angle: Option<f64>,
    /// Learning rate before and after, when it was reduced.
    pub annealed: Option<(f64, f64)>,
}

/// Tracks the learning rate, the previous update direction and the epoch
/// count for one training run.
#[derive(Debug, Clone)]
pub struct AnnealController {
    l_rate: f64,
    w_change: f64,
    anneal_deg: f64,
    anneal_step: f64,
    max_iter: usize,
    epochs: usize,
    previous: Option<Array2<f64>>,
}

impl AnnealController {
    pub fn new(config: &ResolvedConfig) -> Self {
        Self {
            l_rate: config.l_rate,
            w_change: config.w_change,
            anneal_deg: config.anneal_deg,
            anneal_step: config.anneal_step,
            max_iter: config.max_iter,
            epochs: 0,
            previous: None,
        }
    }

    /// Current learning rate.
    pub fn l_rate(&self) -> f64 {
        self.l_rate
    }

    /// Number of epochs accepted so far.
    pub fn epochs(&self) -> usize {
        self.epochs
    }

    /// Lower the learning rate to `l_rate`. Never raises it.
    pub fn lower_l_rate(&mut self, l_rate: f64) {
        self.l_rate = self.l_rate.min(l_rate);
    }

    /// Account for one accepted epoch and decide how to go on.
    ///
    /// Checks, in order: convergence (squared norm of the change below
    /// `w_change`), the epoch limit, then whether the direction turned by
    /// more than `anneal_deg`, in which case the learning rate is multiplied
    /// by `anneal_step`.
    pub fn step(&mut self, change: EpochChange) -> AnnealDecision {
        self.epochs += 1;

        let angle = self
            .previous
            .as_ref()
            .and_then(|previous| angle_degrees(&change.direction, previous));
        self.previous = Some(change.direction);

        let mut decision = AnnealDecision {
            signal: AnnealSignal::Continue,
            angle,
            annealed: None,
        };

        if change.squared_norm < self.w_change {
            decision.signal = AnnealSignal::Converged;
        } else if self.epochs >= self.max_iter {
            decision.signal = AnnealSignal::IterationLimitReached;
        } else if angle.is_some_and(|a| a > self.anneal_deg) {
            let before = self.l_rate;
            self.l_rate *= self.anneal_step;
            decision.annealed = Some((before, self.l_rate));
        }

        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InfomaxConfig;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn controller(max_iter: usize, w_change: f64) -> AnnealController {
        let config = InfomaxConfig::builder()
            .l_rate(0.1)
            .max_iter(max_iter)
            .w_change(w_change)
            .random_state(0)
            .build()
            .resolve(100, 2)
            .unwrap();
        AnnealController::new(&config)
    }

    fn change(direction: Array2<f64>) -> EpochChange {
        let zero = Array2::zeros(direction.raw_dim());
        EpochChange::between(&zero, &direction)
    }

    #[test]
    fn test_epoch_change() {
        let before = array![[1.0, 0.0], [0.0, 1.0]];
        let after = array![[1.5, 0.0], [-0.5, 1.0]];
        let change = EpochChange::between(&before, &after);

        assert_eq!(change.direction, array![[0.5, 0.0], [-0.5, 0.0]]);
        assert_abs_diff_eq!(change.delta, 0.25);
        assert_abs_diff_eq!(change.squared_norm, 0.5);
    }

    #[test]
    fn test_first_epoch_never_anneals() {
        let mut anneal = controller(10, 1e-6);
        let decision = anneal.step(change(array![[1.0, 0.0], [0.0, 0.0]]));

        assert_eq!(decision.signal, AnnealSignal::Continue);
        assert!(decision.angle.is_none());
        assert!(decision.annealed.is_none());
        assert_eq!(anneal.l_rate(), 0.1);
    }

    #[test]
    fn test_sharp_turn_anneals() {
        let mut anneal = controller(10, 1e-6);
        anneal.step(change(array![[1.0, 0.0], [0.0, 0.0]]));
        let decision = anneal.step(change(array![[0.0, 1.0], [0.0, 0.0]]));

        assert_abs_diff_eq!(decision.angle.unwrap(), 90.0, epsilon = 1e-10);
        assert_eq!(decision.annealed, Some((0.1, 0.1 * 0.9)));
        assert_abs_diff_eq!(anneal.l_rate(), 0.09, epsilon = 1e-15);
    }

    #[test]
    fn test_small_turn_keeps_rate() {
        let mut anneal = controller(10, 1e-6);
        anneal.step(change(array![[1.0, 0.0], [0.0, 0.0]]));
        let decision = anneal.step(change(array![[1.0, 0.5], [0.0, 0.0]]));

        assert!(decision.angle.unwrap() < 60.0);
        assert!(decision.annealed.is_none());
        assert_eq!(anneal.l_rate(), 0.1);
    }

    #[test]
    fn test_convergence_checked_before_limit() {
        let mut anneal = controller(1, 1e-3);
        let decision = anneal.step(change(Array2::from_elem((2, 2), 1e-4)));
        assert_eq!(decision.signal, AnnealSignal::Converged);
    }

    #[test]
    fn test_convergence_uses_squared_norm() {
        // Mean |ΔW| of 4e-7 is far above w_change; the squared norm is not.
        let mut anneal = controller(200, 1e-12);
        let small = Array2::from_elem((2, 2), 4e-7);
        let decision = anneal.step(change(small));

        // 4 · (4e-7)² = 6.4e-13
        assert!(decision.angle.is_none());
        assert_eq!(decision.signal, AnnealSignal::Converged);

        let mut anneal = controller(200, 1e-12);
        let decision = anneal.step(change(Array2::from_elem((2, 2), 1e-6)));
        assert_eq!(decision.signal, AnnealSignal::Continue);
    }

    #[test]
    fn test_iteration_limit() {
        let mut anneal = controller(3, 1e-6);
        let signals: Vec<AnnealSignal> = (0..3)
            .map(|_| anneal.step(change(array![[1.0, 0.0], [0.0, 0.0]])).signal)
            .collect();

        assert_eq!(
            signals,
            vec![
                AnnealSignal::Continue,
                AnnealSignal::Continue,
                AnnealSignal::IterationLimitReached
            ]
        );
        assert_eq!(anneal.epochs(), 3);
    }

    #[test]
    fn test_lower_l_rate_never_raises() {
        let mut anneal = controller(10, 1e-6);
        anneal.lower_l_rate(0.05);
        assert_eq!(anneal.l_rate(), 0.05);
        anneal.lower_l_rate(1.0);
        assert_eq!(anneal.l_rate(), 0.05);
    }

    #[test]
    fn test_terminal_epoch_does_not_anneal() {
        let mut anneal = controller(2, 1e-6);
        anneal.step(change(array![[1.0, 0.0], [0.0, 0.0]]));
        let decision = anneal.step(change(array![[-1.0, 0.0], [0.0, 0.0]]));

        assert_eq!(decision.signal, AnnealSignal::IterationLimitReached);
        assert!(decision.annealed.is_none());
    }
}
