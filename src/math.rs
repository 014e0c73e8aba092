// src/math.rs

//! Dense matrix helpers used by the training loop.

use crate::error::{InfomaxError, Result};
use faer::linalg::solvers::{DenseSolveCore, PartialPivLu};
use faer::Mat;
use ndarray::{Array2, ArrayBase, Data, Ix2, Zip};

/// Mean absolute per-entry difference between two matrices of equal shape.
pub fn mean_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    let n = a.len().max(1) as f64;
    Zip::from(a)
        .and(b)
        .fold(0.0, |acc, &x, &y| acc + (x - y).abs())
        / n
}

/// Sum of squared entries (squared Frobenius norm).
pub fn sum_squares(a: &Array2<f64>) -> f64 {
    a.iter().map(|v| v * v).sum()
}

/// Angle in degrees between two matrices viewed as flat vectors.
///
/// Returns None when either has zero norm or the angle is not finite.
pub fn angle_degrees(a: &Array2<f64>, b: &Array2<f64>) -> Option<f64> {
    let dot = Zip::from(a).and(b).fold(0.0, |acc, &x, &y| acc + x * y);
    let norm_a = a.iter().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f64>().sqrt();

    let denom = norm_a * norm_b;
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }

    let cos = (dot / denom).clamp(-1.0, 1.0);
    let angle = cos.acos().to_degrees();
    angle.is_finite().then_some(angle)
}

/// True if every entry is finite.
pub fn all_finite<S: Data<Elem = f64>, D: ndarray::Dimension>(a: &ArrayBase<S, D>) -> bool {
    a.iter().all(|v| v.is_finite())
}

/// Largest absolute entry (0 for an empty array).
pub fn max_abs<S: Data<Elem = f64>, D: ndarray::Dimension>(a: &ArrayBase<S, D>) -> f64 {
    a.iter().fold(0.0, |acc: f64, v| acc.max(v.abs()))
}

/// Copy an ndarray matrix into a faer one.
fn to_faer<S: Data<Elem = f64>>(m: &ArrayBase<S, Ix2>) -> Mat<f64> {
    Mat::from_fn(m.nrows(), m.ncols(), |i, j| m[[i, j]])
}

/// `ln|det(m)|` from faer's partial-pivot LU.
///
/// Returns None if `m` is numerically singular: a pivot of U smaller than
/// `1e-12` times the largest entry of `m`.
pub fn log_abs_det<S: Data<Elem = f64>>(m: &ArrayBase<S, Ix2>) -> Option<f64> {
    debug_assert_eq!(m.nrows(), m.ncols());
    let scale = max_abs(m);
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }

    let lu = to_faer(m).as_ref().partial_piv_lu();
    pivots_log_abs_det(&lu, scale * 1e-12)
}

fn pivots_log_abs_det(lu: &PartialPivLu<f64>, threshold: f64) -> Option<f64> {
    let u = lu.U();
    let mut log_det = 0.0;
    for i in 0..u.nrows() {
        let pivot = u[(i, i)];
        if !(pivot.abs() >= threshold) {
            return None;
        }
        log_det += pivot.abs().ln();
    }
    Some(log_det)
}

/// Invert a square matrix through faer's partial-pivot LU.
///
/// Fails with `SingularMatrix` when a pivot is below `1e-14` times the
/// largest entry.
pub fn invert<S: Data<Elem = f64>>(m: &ArrayBase<S, Ix2>) -> Result<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return Err(InfomaxError::invalid_shape(format!(
            "cannot invert a {}x{} matrix",
            n,
            m.ncols()
        )));
    }

    let scale = max_abs(m);
    if scale == 0.0 || !scale.is_finite() {
        return Err(InfomaxError::SingularMatrix);
    }

    let lu = to_faer(m).as_ref().partial_piv_lu();
    if pivots_log_abs_det(&lu, scale * 1e-14).is_none() {
        return Err(InfomaxError::SingularMatrix);
    }

    let inv = lu.inverse();
    Ok(Array2::from_shape_fn((n, n), |(i, j)| inv[(i, j)]))
}
