// src/solver.rs

//! Main Infomax solver interface.

use crate::config::InfomaxConfig;
use crate::error::{InfomaxError, Result};
use crate::observer::{LogObserver, TrainingObserver};
use crate::result::InfomaxResult;
use crate::trainer::Trainer;

use ndarray::{Array2, ArrayView2, Axis};

/// The Infomax Independent Component Analysis solver.
///
/// This struct provides static methods for fitting ICA models.
pub struct Infomax;

impl Infomax {
    /// Fit ICA model with default configuration.
    ///
    /// # Arguments
    /// * `x` - Data matrix of shape (n_samples, n_features)
    ///
    /// # Returns
    /// * `InfomaxResult` containing the unmixing matrix, bias and run summary.
    pub fn fit(x: &Array2<f64>) -> Result<InfomaxResult> {
        Self::fit_with_config(x, &InfomaxConfig::default())
    }

    /// Fit ICA model with custom configuration, logging progress through
    /// the `log` facade.
    pub fn fit_with_config(x: &Array2<f64>, config: &InfomaxConfig) -> Result<InfomaxResult> {
        Self::fit_observed(x.view(), config, LogObserver)
    }

    /// Fit ICA model, reporting progress to `observer`.
    pub fn fit_observed<O: TrainingObserver>(
        x: ArrayView2<'_, f64>,
        config: &InfomaxConfig,
        observer: O,
    ) -> Result<InfomaxResult> {
        Trainer::new(x, config)?.run(observer)
    }

    /// Apply a fitted unmixing matrix to new data.
    ///
    /// Returns the sources, shape (n_samples, n_components). The learned
    /// bias is not added.
    pub fn transform(x: &Array2<f64>, result: &InfomaxResult) -> Result<Array2<f64>> {
        let expected = result.unmixing.ncols();
        if x.ncols() != expected {
            return Err(InfomaxError::invalid_shape(format!(
                "expected {} features, got {}",
                expected,
                x.ncols()
            )));
        }
        Ok(x.dot(&result.unmixing.t()))
    }

    /// Sources including the learned bias, as seen by the nonlinearity
    /// during training.
    pub fn transform_biased(x: &Array2<f64>, result: &InfomaxResult) -> Result<Array2<f64>> {
        let mut sources = Self::transform(x, result)?;
        if let Some(bias) = &result.bias {
            sources += &bias.view().insert_axis(Axis(0));
        }
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::TrainingStatus;
    use crate::utils::amari_distance;
    use crate::utils::testing::{laplace_sources, mix, uniform_sources};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_fit_defaults_on_small_problem() {
        let _ = env_logger::builder().is_test(true).try_init();
        let x = mix(&laplace_sources(2000, 2, 1), &array![[1.0, 0.3], [0.2, 1.0]]);

        let result = Infomax::fit(&x).unwrap();

        assert_eq!(result.unmixing.dim(), (2, 2));
        assert!(result.bias.is_some());
        assert!(result.unmixing.iter().all(|v| v.is_finite()));
        assert!(result.n_iterations <= 200);
    }

    #[test]
    fn test_extended_separates_uniform_sources() {
        let a = array![[1.0, 0.5], [0.3, 1.0]];
        let x = mix(&uniform_sources(5000, 2, 31), &a);
        let config = InfomaxConfig::builder()
            .extended(true)
            .random_state(31)
            .build();

        let result = Infomax::fit_with_config(&x, &config).unwrap();

        assert_eq!(result.status, TrainingStatus::Converged);
        assert_eq!(result.signs, Some(ndarray::Array1::from_elem(2, -1.0)));
        let distance = amari_distance(&result.unmixing, &a);
        assert!(distance < 0.01, "Amari distance too large: {}", distance);
    }

    #[test]
    fn test_transform() {
        let result = InfomaxResult {
            unmixing: array![[2.0, 0.0], [1.0, 1.0]],
            bias: Some(array![0.5, -0.5]),
            status: TrainingStatus::Converged,
            n_iterations: 1,
            l_rate: 0.01,
            delta: 0.0,
            signs: None,
            n_recoveries: 0,
            seed: 0,
        };
        let x = array![[1.0, 2.0], [0.0, -1.0]];

        let sources = Infomax::transform(&x, &result).unwrap();
        assert_abs_diff_eq!(sources, array![[2.0, 3.0], [0.0, -1.0]]);

        let biased = Infomax::transform_biased(&x, &result).unwrap();
        assert_abs_diff_eq!(biased, array![[2.5, 2.5], [0.5, -1.5]]);

        let wrong = Array2::<f64>::zeros((3, 3));
        assert!(matches!(
            Infomax::transform(&wrong, &result),
            Err(InfomaxError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected_before_training() {
        let x = mix(&laplace_sources(100, 2, 1), &Array2::eye(2));
        let config = InfomaxConfig::builder().anneal_step(1.5).build();
        assert!(matches!(
            Infomax::fit_with_config(&x, &config),
            Err(InfomaxError::InvalidConfig { .. })
        ));
    }
}
