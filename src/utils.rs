//! Utility functions for judging a separation against a known mixing.

use ndarray::Array2;

/// Reorder the rows of `p` so that each row's dominant entry sits on the
/// diagonal, optionally scaling every row to a unit diagonal.
///
/// Applied to `W · A` (unmixing times the true mixing), a perfect separation
/// becomes the identity once `scale` is set. Rows are matched greedily by
/// the largest remaining absolute entry.
pub fn permute(p: &Array2<f64>, scale: bool) -> Array2<f64> {
    let n = p.nrows();
    let mut row_used = vec![false; n];
    let mut col_used = vec![false; n];
    let mut result = Array2::zeros(p.raw_dim());

    for _ in 0..n {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in (0..n).filter(|&i| !row_used[i]) {
            for j in (0..n).filter(|&j| !col_used[j]) {
                let v = p[[i, j]].abs();
                if best.map_or(true, |(_, _, b)| v > b) {
                    best = Some((i, j, v));
                }
            }
        }
        let Some((i, j, _)) = best else { break };
        row_used[i] = true;
        col_used[j] = true;

        let diag = p[[i, j]];
        let divisor = if scale && diag.abs() > 1e-15 { diag } else { 1.0 };
        result.row_mut(j).assign(&p.row(i).mapv(|v| v / divisor));
    }

    result
}

/// Compute the Amari distance between an unmixing and a mixing matrix.
///
/// Measures how far `W · A` is from a scaled permutation; 0 means perfect
/// separation.
pub fn amari_distance(w: &Array2<f64>, a: &Array2<f64>) -> f64 {
    let p = w.dot(a).mapv(|x| x * x);
    let n = p.nrows() as f64;

    let spread = |m: &Array2<f64>| -> f64 {
        m.rows()
            .into_iter()
            .map(|row| {
                let max = row.iter().cloned().fold(0.0, f64::max);
                if max > 1e-30 {
                    row.sum() / max - 1.0
                } else {
                    0.0
                }
            })
            .sum()
    };

    (spread(&p) + spread(&p.t().to_owned())) / (2.0 * n)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::invert;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_amari_distance_perfect() {
        let a = array![[1.0, 0.5, 0.2], [0.3, 1.0, 0.4], [0.1, 0.2, 1.0]];
        let w = invert(&a).unwrap();
        assert!(amari_distance(&w, &a) < 1e-10);
    }

    #[test]
    fn test_amari_distance_permutation_and_scale() {
        let a = array![[1.0, 0.5], [0.3, 1.0]];
        let w_inv = invert(&a).unwrap();
        let w = array![
            [-3.0 * w_inv[[1, 0]], -3.0 * w_inv[[1, 1]]],
            [0.5 * w_inv[[0, 0]], 0.5 * w_inv[[0, 1]]]
        ];
        assert!(amari_distance(&w, &a) < 1e-10);
    }

    #[test]
    fn test_amari_distance_of_mixing_is_positive() {
        let a = array![[1.0, 0.5], [0.3, 1.0]];
        assert!(amari_distance(&Array2::eye(2), &a) > 0.1);
    }

    #[test]
    fn test_permute() {
        let p = array![[0.1, 0.9], [-1.9, 0.05]];
        let permuted = permute(&p, true);

        assert_abs_diff_eq!(
            permuted,
            array![[1.0, -0.05 / 1.9], [0.1 / 0.9, 1.0]],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_permute_without_scaling() {
        let p = array![[0.0, 2.0], [3.0, 0.0]];
        assert_eq!(permute(&p, false), array![[3.0, 0.0], [0.0, 2.0]]);
    }
}
