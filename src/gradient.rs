// src/gradient.rs

//! One block of the Infomax natural-gradient update.

use crate::error::{InfomaxError, Result, UpdateStage};
use crate::math::all_finite;
use crate::nonlinearity::{relative_gradient, Nonlinearity};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Apply one gradient step for a block of samples.
///
/// `weights` is in row orientation: activations are `U = X_b·weights + bias`
/// for a block `X_b` of shape (block × n_features). The update is
/// `weights += l_rate · weights · (I − mean(φ(U)·Uᵀ))ᵀ`, i.e. the
/// natural-gradient rule scaled by `l_rate / block_size`. When `biasing` is
/// set the bias moves by `−l_rate · mean(ψ(U))`.
///
/// On a non-finite update nothing is modified and
/// [`InfomaxError::NonFiniteUpdate`] is returned. On success the block's
/// activations `U` are returned.
#[allow(clippy::too_many_arguments)]
pub fn gradient_step<N: Nonlinearity>(
    weights: &mut Array2<f64>,
    bias: &mut Array1<f64>,
    block: ArrayView2<'_, f64>,
    l_rate: f64,
    nonlinearity: &N,
    signs: ArrayView1<'_, f64>,
    biasing: bool,
) -> Result<Array2<f64>> {
    let mut u = block.dot(&*weights);
    if biasing {
        u += &bias.view().insert_axis(Axis(0));
    }

    let phi = nonlinearity.weight_score(u.view(), signs);
    let gradient = relative_gradient(u.view(), phi.view());
    let delta_w = weights.dot(&gradient.t()) * l_rate;

    let delta_b = if biasing {
        let psi = nonlinearity.bias_score(u.view());
        psi.mean_axis(Axis(0)).map(|mean| mean * -l_rate)
    } else {
        None
    };

    let finite = all_finite(&delta_w) && delta_b.as_ref().map_or(true, |b| all_finite(b));
    if !finite {
        return Err(InfomaxError::NonFiniteUpdate {
            stage: UpdateStage::Gradient,
        });
    }

    *weights += &delta_w;
    if let Some(delta_b) = delta_b {
        *bias += &delta_b;
    }

    Ok(u)
}
