// src/observer.rs

//! Progress events emitted during training.

use crate::config::ResolvedConfig;
use crate::guard::Instability;
use crate::result::TrainingStatus;

/// Summary of one accepted epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Learning rate used during the epoch.
    pub l_rate: f64,
    /// Mean absolute weight change over the epoch.
    pub delta: f64,
    /// Angle in degrees to the previous epoch's update direction.
    pub angle: Option<f64>,
    /// Components treated as sub-Gaussian after the epoch (extended only).
    pub n_sub_gaussian: Option<usize>,
    /// Kurtosis signs flipped by this epoch (extended only).
    pub signs_changed: usize,
}

/// A rejected epoch and the restart that followed.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryEvent {
    /// Epoch number that was being attempted.
    pub epoch: usize,
    pub cause: Instability,
    pub l_rate_before: f64,
    pub l_rate_after: f64,
    /// Recoveries in a row, including this one.
    pub consecutive: usize,
}

/// Observer for reporting progress while training.
///
/// All hooks default to doing nothing.
pub trait TrainingObserver {
    fn on_start(&mut self, config: &ResolvedConfig) {
        let _ = config;
    }
    fn on_epoch(&mut self, report: &EpochReport) {
        let _ = report;
    }
    fn on_anneal(&mut self, epoch: usize, l_rate_before: f64, l_rate_after: f64) {
        let _ = (epoch, l_rate_before, l_rate_after);
    }
    fn on_recovery(&mut self, event: &RecoveryEvent) {
        let _ = event;
    }
    fn on_finish(&mut self, status: TrainingStatus, epochs: usize) {
        let _ = (status, epochs);
    }
}

impl<T: TrainingObserver + ?Sized> TrainingObserver for &mut T {
    fn on_start(&mut self, config: &ResolvedConfig) {
        (**self).on_start(config)
    }
    fn on_epoch(&mut self, report: &EpochReport) {
        (**self).on_epoch(report)
    }
    fn on_anneal(&mut self, epoch: usize, l_rate_before: f64, l_rate_after: f64) {
        (**self).on_anneal(epoch, l_rate_before, l_rate_after)
    }
    fn on_recovery(&mut self, event: &RecoveryEvent) {
        (**self).on_recovery(event)
    }
    fn on_finish(&mut self, status: TrainingStatus, epochs: usize) {
        (**self).on_finish(status, epochs)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TrainingObserver for NoopObserver {}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl TrainingObserver for LogObserver {
    fn on_start(&mut self, config: &ResolvedConfig) {
        log::info!(
            "Infomax on {} samples x {} features: extended={}, l_rate={:.4e}, block={}, \
             max_iter={}, seed={}",
            config.n_samples,
            config.n_features,
            config.extended,
            config.l_rate,
            config.block,
            config.max_iter,
            config.seed
        );
    }

    fn on_epoch(&mut self, report: &EpochReport) {
        match report.n_sub_gaussian {
            Some(n_sub) => log::debug!(
                "epoch {}, l_rate {:.4e}, delta {:.4e}, angle {:?}, {} sub-Gaussian",
                report.epoch,
                report.l_rate,
                report.delta,
                report.angle,
                n_sub
            ),
            None => log::debug!(
                "epoch {}, l_rate {:.4e}, delta {:.4e}, angle {:?}",
                report.epoch,
                report.l_rate,
                report.delta,
                report.angle
            ),
        }
    }

    fn on_anneal(&mut self, epoch: usize, l_rate_before: f64, l_rate_after: f64) {
        log::debug!(
            "epoch {}: annealing l_rate {:.4e} -> {:.4e}",
            epoch,
            l_rate_before,
            l_rate_after
        );
    }

    fn on_recovery(&mut self, event: &RecoveryEvent) {
        log::warn!(
            "epoch {}: {}; restarting from last stable weights with l_rate {:.4e} \
             (recovery {} in a row)",
            event.epoch,
            event.cause,
            event.l_rate_after,
            event.consecutive
        );
    }

    fn on_finish(&mut self, status: TrainingStatus, epochs: usize) {
        log::info!("Infomax finished after {} epochs: {}", epochs, status);
    }
}
