// src/trainer.rs

//! The Infomax training loop.

use crate::anneal::{AnnealController, AnnealSignal, EpochChange};
use crate::config::{InfomaxConfig, ResolvedConfig};
use crate::error::{InfomaxError, Result};
use crate::gradient::gradient_step;
use crate::guard::{Instability, Snapshot, StabilityGuard};
use crate::kurtosis::{ActivationMoments, KurtosisEstimator};
use crate::nonlinearity::NonlinearityType;
use crate::observer::{EpochReport, RecoveryEvent, TrainingObserver};
use crate::result::{InfomaxResult, TrainingStatus};
use crate::sampler::{BlockOrder, BlockSampler};

use ndarray::{Array1, Array2, ArrayView2, Axis};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag for stopping a training run between epochs.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop at the next epoch boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

enum EpochOutcome {
    Completed { signs_changed: usize },
    Unstable(Instability),
}

/// One Infomax training run over a data matrix.
///
/// Construction validates the data shape and resolves the configuration;
/// [`Trainer::run`] does the numerical work.
pub struct Trainer<'a, S = BlockSampler> {
    data: ArrayView2<'a, f64>,
    config: ResolvedConfig,
    w_init: Option<Array2<f64>>,
    sampler: S,
    cancel: Option<CancelToken>,
}

impl<'a> Trainer<'a, BlockSampler> {
    /// Prepare a run on `data` (n_samples × n_features).
    ///
    /// # Errors
    /// `InvalidShape` for empty data, fewer samples than features or a
    /// mismatched `w_init`; `InvalidConfig` for out-of-range parameters.
    pub fn new(data: ArrayView2<'a, f64>, config: &InfomaxConfig) -> Result<Self> {
        let (n_samples, n_features) = data.dim();
        let resolved = config.resolve(n_samples, n_features)?;
        let sampler = BlockSampler::new(n_samples, resolved.block, resolved.seed);

        Ok(Self {
            data,
            config: resolved,
            w_init: config.w_init.clone(),
            sampler,
            cancel: None,
        })
    }
}

impl<'a, S: BlockOrder> Trainer<'a, S> {
    /// Replace the block ordering.
    pub fn with_sampler<T: BlockOrder>(self, sampler: T) -> Trainer<'a, T> {
        Trainer {
            data: self.data,
            config: self.config,
            w_init: self.w_init,
            sampler,
            cancel: self.cancel,
        }
    }

    /// Stop early when `token` is cancelled.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The resolved configuration of this run.
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Train until convergence, the epoch limit or cancellation.
    ///
    /// # Errors
    /// `Divergent` when the stability guard runs out of recoveries;
    /// `InvalidShape` if a custom block order yields an out-of-range index.
    pub fn run<O: TrainingObserver>(mut self, mut observer: O) -> Result<InfomaxResult> {
        let config = self.config.clone();
        let n = config.n_features;
        let nonlinearity = NonlinearityType::for_mode(config.extended);

        // w_init is given as an unmixing matrix; the loop works on its transpose.
        let mut weights = match &self.w_init {
            Some(w) => w.t().to_owned(),
            None => Array2::eye(n),
        };
        let mut bias = Array1::zeros(n);
        let mut kurtosis = config.extended.then(|| KurtosisEstimator::new(n));

        let mut anneal = AnnealController::new(&config);
        let mut guard = StabilityGuard::new(Snapshot {
            weights: weights.clone(),
            bias: bias.clone(),
            kurtosis: kurtosis.clone(),
        });
        let mut delta = f64::INFINITY;

        observer.on_start(&config);

        let status = loop {
            if self.is_cancelled() {
                break TrainingStatus::Cancelled;
            }

            let epoch = anneal.epochs() + 1;
            let l_rate = anneal.l_rate();
            let before = weights.clone();

            let outcome = self.run_epoch(
                &mut weights,
                &mut bias,
                kurtosis.as_mut(),
                l_rate,
                &nonlinearity,
            )?;
            let change = EpochChange::between(&before, &weights);

            let (instability, signs_changed) = match outcome {
                EpochOutcome::Unstable(cause) => (Some(cause), 0),
                EpochOutcome::Completed { signs_changed } => {
                    (guard.inspect(&weights, change.delta), signs_changed)
                }
            };

            if let Some(cause) = instability {
                let restarted_rate = guard.recover(l_rate, cause)?;
                anneal.lower_l_rate(restarted_rate);

                let snapshot = guard.snapshot();
                weights.assign(&snapshot.weights);
                bias.assign(&snapshot.bias);
                kurtosis.clone_from(&snapshot.kurtosis);

                observer.on_recovery(&RecoveryEvent {
                    epoch,
                    cause,
                    l_rate_before: l_rate,
                    l_rate_after: anneal.l_rate(),
                    consecutive: guard.consecutive_recoveries(),
                });
                continue;
            }

            delta = change.delta;
            guard.commit(
                Snapshot {
                    weights: weights.clone(),
                    bias: bias.clone(),
                    kurtosis: kurtosis.clone(),
                },
                delta,
            );

            let decision = anneal.step(change);
            observer.on_epoch(&EpochReport {
                epoch,
                l_rate,
                delta,
                angle: decision.angle,
                n_sub_gaussian: kurtosis.as_ref().map(KurtosisEstimator::n_sub_gaussian),
                signs_changed,
            });
            if let Some((before, after)) = decision.annealed {
                observer.on_anneal(epoch, before, after);
            }

            match decision.signal {
                AnnealSignal::Continue => {}
                AnnealSignal::Converged => break TrainingStatus::Converged,
                AnnealSignal::IterationLimitReached => {
                    break TrainingStatus::IterationLimitReached
                }
            }
        };

        observer.on_finish(status, anneal.epochs());

        Ok(InfomaxResult {
            unmixing: weights.t().to_owned(),
            bias: config.biasing.then_some(bias),
            status,
            n_iterations: anneal.epochs(),
            l_rate: anneal.l_rate(),
            delta,
            signs: kurtosis.map(|k| k.signs().clone()),
            n_recoveries: guard.total_recoveries(),
            seed: config.seed,
        })
    }

    /// Run the blocks of one epoch, then the kurtosis update.
    ///
    /// Stops at the first non-finite update, leaving the state partially
    /// updated for the caller to restore.
    fn run_epoch(
        &mut self,
        weights: &mut Array2<f64>,
        bias: &mut Array1<f64>,
        mut kurtosis: Option<&mut KurtosisEstimator>,
        l_rate: f64,
        nonlinearity: &NonlinearityType,
    ) -> Result<EpochOutcome> {
        let n_samples = self.config.n_samples;
        let n = self.config.n_features;
        let blocks = self.sampler.next_epoch();
        let unit_signs = Array1::ones(n);
        let mut moments = kurtosis.as_ref().map(|_| ActivationMoments::new(n));

        for indices in &blocks {
            if let Some(&bad) = indices.iter().find(|&&i| i >= n_samples) {
                return Err(InfomaxError::invalid_shape(format!(
                    "block index {} out of range for {} samples",
                    bad, n_samples
                )));
            }

            let block = self.data.select(Axis(0), indices);
            let signs = match kurtosis.as_deref() {
                Some(estimator) => estimator.signs().view(),
                None => unit_signs.view(),
            };

            match gradient_step(
                weights,
                bias,
                block.view(),
                l_rate,
                nonlinearity,
                signs,
                self.config.biasing,
            ) {
                Ok(activations) => {
                    if let Some(moments) = moments.as_mut() {
                        moments.merge(&ActivationMoments::from_activations(activations.view()));
                    }
                }
                Err(InfomaxError::NonFiniteUpdate { stage }) => {
                    return Ok(EpochOutcome::Unstable(Instability::NonFiniteUpdate(stage)));
                }
                Err(e) => return Err(e),
            }
        }

        let signs_changed = match (kurtosis.as_deref_mut(), &moments) {
            (Some(estimator), Some(moments)) => match estimator.update(moments) {
                Ok(changed) => changed,
                Err(InfomaxError::NonFiniteUpdate { stage }) => {
                    return Ok(EpochOutcome::Unstable(Instability::NonFiniteUpdate(stage)));
                }
                Err(e) => return Err(e),
            },
            _ => 0,
        };

        Ok(EpochOutcome::Completed { signs_changed })
    }
}
