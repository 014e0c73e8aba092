// src/nonlinearity.rs

//! Score functions for the Infomax learning rule.
//!
//! With activations `u = W·x + b`, the natural-gradient update is
//! `ΔW ∝ (I − E[φ(u)·uᵀ])·W` and the bias moves against `E[ψ(u)]`.
//! Each nonlinearity supplies the weight score `φ` and the bias score `ψ`.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis, Zip};

/// Trait for the nonlinearities used by the gradient step.
pub trait Nonlinearity {
    /// Weight score `φ(U)` for a block of activations (samples × components).
    ///
    /// `signs` holds one ±1 entry per component; nonlinearities that do not
    /// switch per component ignore it.
    fn weight_score(&self, u: ArrayView2<'_, f64>, signs: ArrayView1<'_, f64>) -> Array2<f64>;

    /// Bias score `ψ(U)`, same shape as `u`.
    fn bias_score(&self, u: ArrayView2<'_, f64>) -> Array2<f64>;
}

/// Logistic nonlinearity of standard Infomax (Bell & Sejnowski 1995).
///
/// `y = 1 / (1 + exp(−u))`; the scores are `φ = ψ = 2y − 1 = tanh(u/2)`.
/// Suited to super-Gaussian sources.
#[derive(Clone, Copy, Debug, Default)]
pub struct Logistic;

impl Nonlinearity for Logistic {
    fn weight_score(&self, u: ArrayView2<'_, f64>, _signs: ArrayView1<'_, f64>) -> Array2<f64> {
        u.mapv(|v| (0.5 * v).tanh())
    }

    fn bias_score(&self, u: ArrayView2<'_, f64>) -> Array2<f64> {
        u.mapv(|v| (0.5 * v).tanh())
    }
}

/// Sign-switched hyperbolic tangent of extended Infomax
/// (Lee, Girolami & Sejnowski 1999).
///
/// `φ_i = k_i·tanh(u_i) + u_i`: super-Gaussian components (`k = +1`) use
/// `u + tanh(u)`, sub-Gaussian ones (`k = −1`) use `u − tanh(u)`, which
/// behaves like `u³/3` near zero. The bias score is `2·tanh(u)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExtendedTanh;

impl Nonlinearity for ExtendedTanh {
    fn weight_score(&self, u: ArrayView2<'_, f64>, signs: ArrayView1<'_, f64>) -> Array2<f64> {
        let mut phi = u.to_owned();
        for (mut column, &k) in phi.axis_iter_mut(Axis(1)).zip(signs.iter()) {
            column.mapv_inplace(|v| k * v.tanh() + v);
        }
        phi
    }

    fn bias_score(&self, u: ArrayView2<'_, f64>) -> Array2<f64> {
        u.mapv(|v| 2.0 * v.tanh())
    }
}

/// The built-in nonlinearities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NonlinearityType {
    /// Standard Infomax.
    Logistic,
    /// Extended Infomax.
    ExtendedTanh,
}

impl NonlinearityType {
    /// Pick the nonlinearity matching the `extended` flag.
    pub fn for_mode(extended: bool) -> Self {
        if extended {
            NonlinearityType::ExtendedTanh
        } else {
            NonlinearityType::Logistic
        }
    }
}

impl Nonlinearity for NonlinearityType {
    fn weight_score(&self, u: ArrayView2<'_, f64>, signs: ArrayView1<'_, f64>) -> Array2<f64> {
        match self {
            NonlinearityType::Logistic => Logistic.weight_score(u, signs),
            NonlinearityType::ExtendedTanh => ExtendedTanh.weight_score(u, signs),
        }
    }

    fn bias_score(&self, u: ArrayView2<'_, f64>) -> Array2<f64> {
        match self {
            NonlinearityType::Logistic => Logistic.bias_score(u),
            NonlinearityType::ExtendedTanh => ExtendedTanh.bias_score(u),
        }
    }
}

/// Relative gradient `I − mean(φ·uᵀ)` in the orientation of the returned
/// unmixing matrix, for a block of activations.
pub fn relative_gradient(u: ArrayView2<'_, f64>, phi: ArrayView2<'_, f64>) -> Array2<f64> {
    let m = u.nrows().max(1) as f64;
    let n = u.ncols();
    let mut g = phi.t().dot(&u);
    Zip::indexed(&mut g).for_each(|(i, j), v| {
        *v = if i == j { 1.0 } else { 0.0 } - *v / m;
    });
    debug_assert_eq!(g.nrows(), n);
    g
}
