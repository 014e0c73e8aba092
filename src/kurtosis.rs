// src/kurtosis.rs

//! Online estimation of the kurtosis sign of each component (extended
//! Infomax only).

use crate::error::{InfomaxError, Result, UpdateStage};
use crate::math::all_finite;
use ndarray::{Array1, ArrayView2, Axis};

/// Decay of the moving average of the kurtosis estimate.
pub const KURTOSIS_DECAY: f64 = 0.5;

/// Power sums of the activations of each component.
///
/// Gathered block by block during an epoch and merged.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationMoments {
    count: usize,
    s1: Array1<f64>,
    s2: Array1<f64>,
    s3: Array1<f64>,
    s4: Array1<f64>,
}

impl ActivationMoments {
    /// Empty accumulator for `n` components.
    pub fn new(n: usize) -> Self {
        Self {
            count: 0,
            s1: Array1::zeros(n),
            s2: Array1::zeros(n),
            s3: Array1::zeros(n),
            s4: Array1::zeros(n),
        }
    }

    /// Moments of one block of activations (samples × components).
    pub fn from_activations(u: ArrayView2<'_, f64>) -> Self {
        let mut moments = Self::new(u.ncols());
        moments.count = u.nrows();
        for row in u.axis_iter(Axis(0)) {
            for (j, &v) in row.iter().enumerate() {
                let v2 = v * v;
                moments.s1[j] += v;
                moments.s2[j] += v2;
                moments.s3[j] += v2 * v;
                moments.s4[j] += v2 * v2;
            }
        }
        moments
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: &ActivationMoments) {
        self.count += other.count;
        self.s1 += &other.s1;
        self.s2 += &other.s2;
        self.s3 += &other.s3;
        self.s4 += &other.s4;
    }

    /// Number of samples accumulated.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Excess kurtosis `m4 / m2² − 3` of each component.
    pub fn excess_kurtosis(&self) -> Array1<f64> {
        let n = self.count as f64;
        Array1::from_shape_fn(self.s1.len(), |j| {
            let mean = self.s1[j] / n;
            let e2 = self.s2[j] / n;
            let e3 = self.s3[j] / n;
            let e4 = self.s4[j] / n;
            let mean2 = mean * mean;

            let m2 = e2 - mean2;
            let m4 = e4 - 4.0 * mean * e3 + 6.0 * mean2 * e2 - 3.0 * mean2 * mean2;
            m4 / (m2 * m2) - 3.0
        })
    }
}

/// Tracks a moving average of the excess kurtosis and the sign vector it
/// implies: +1 for super-Gaussian components, −1 for sub-Gaussian ones.
#[derive(Debug, Clone, PartialEq)]
pub struct KurtosisEstimator {
    average: Array1<f64>,
    signs: Array1<f64>,
}

impl KurtosisEstimator {
    /// All components start out as super-Gaussian.
    pub fn new(n: usize) -> Self {
        Self {
            average: Array1::zeros(n),
            signs: Array1::ones(n),
        }
    }

    /// Current sign per component.
    pub fn signs(&self) -> &Array1<f64> {
        &self.signs
    }

    /// Number of components currently treated as sub-Gaussian.
    pub fn n_sub_gaussian(&self) -> usize {
        self.signs.iter().filter(|&&s| s < 0.0).count()
    }

    /// Fold one epoch of activation moments into the estimate.
    ///
    /// Returns how many signs flipped. Leaves the state untouched when the
    /// estimate is not finite.
    pub fn update(&mut self, moments: &ActivationMoments) -> Result<usize> {
        if moments.count() == 0 {
            return Ok(0);
        }

        let kurtosis = moments.excess_kurtosis();
        let average = &self.average * KURTOSIS_DECAY + &kurtosis * (1.0 - KURTOSIS_DECAY);
        if !all_finite(&average) {
            return Err(InfomaxError::NonFiniteUpdate {
                stage: UpdateStage::Kurtosis,
            });
        }

        let signs = average.mapv(|k| if k >= 0.0 { 1.0 } else { -1.0 });
        let changed = signs
            .iter()
            .zip(self.signs.iter())
            .filter(|(a, b)| a != b)
            .count();

        self.average = average;
        self.signs = signs;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn uniform_and_laplace(n: usize, seed: u64) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array2::from_shape_fn((n, 2), |(_, j)| {
            let v: f64 = rng.random_range(-1.0..1.0);
            if j == 0 {
                v
            } else {
                -v.signum() * (1.0 - v.abs()).ln()
            }
        })
    }

    #[test]
    fn test_kurtosis_of_known_distributions() {
        let u = uniform_and_laplace(20_000, 11);
        let kurt = ActivationMoments::from_activations(u.view()).excess_kurtosis();

        // Uniform: -1.2, Laplace: +3
        assert_abs_diff_eq!(kurt[0], -1.2, epsilon = 0.1);
        assert!(kurt[1] > 1.5, "Laplace kurtosis too small: {}", kurt[1]);
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let u = uniform_and_laplace(1000, 5);
        let whole = ActivationMoments::from_activations(u.view());

        let mut merged = ActivationMoments::new(2);
        for chunk in u.axis_chunks_iter(Axis(0), 37) {
            merged.merge(&ActivationMoments::from_activations(chunk));
        }

        assert_eq!(merged.count(), 1000);
        assert_abs_diff_eq!(
            merged.excess_kurtosis(),
            whole.excess_kurtosis(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_signs_follow_kurtosis() {
        let u = uniform_and_laplace(5000, 3);
        let mut estimator = KurtosisEstimator::new(2);
        assert_eq!(estimator.signs(), &array![1.0, 1.0]);

        let changed = estimator
            .update(&ActivationMoments::from_activations(u.view()))
            .unwrap();

        assert_eq!(changed, 1);
        assert_eq!(estimator.signs(), &array![-1.0, 1.0]);
        assert_eq!(estimator.n_sub_gaussian(), 1);
    }

    #[test]
    fn test_non_finite_estimate_is_rejected() {
        // A constant component has zero variance.
        let u = array![[1.0, 0.5], [1.0, -0.5], [1.0, 0.25]];
        let mut estimator = KurtosisEstimator::new(2);
        let before = estimator.clone();

        let err = estimator
            .update(&ActivationMoments::from_activations(u.view()))
            .unwrap_err();

        assert!(matches!(
            err,
            InfomaxError::NonFiniteUpdate {
                stage: UpdateStage::Kurtosis
            }
        ));
        assert_eq!(estimator, before);
    }

    #[test]
    fn test_empty_moments_are_ignored() {
        let mut estimator = KurtosisEstimator::new(3);
        assert_eq!(estimator.update(&ActivationMoments::new(3)).unwrap(), 0);
        assert_eq!(estimator.signs(), &Array1::ones(3));
    }
}
