//! Small dense solvers for the per-species regressions.
//!
//! Matrices are row-major `n × n` slices; systems here are `num_types` wide.

use crate::error::{DataError, Result};

/// Pivots smaller than this are treated as zero.
const PIVOT_EPS: f64 = 1e-12;

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
///
/// Rows are pivoted through a permutation vector instead of being moved.
pub fn solve(a: &[f64], b: &[f64], n: usize) -> Result<Vec<f64>> {
    if a.len() != n * n || b.len() != n {
        return Err(DataError::Singular);
    }
    let mut lu = a.to_vec();
    let mut x = b.to_vec();

    let mut perm: Vec<usize> = (0..n).collect();
    for col in 0..n {
        let mut max_val = lu[perm[col] * n + col].abs();
        let mut max_row = col;
        for row in (col + 1)..n {
            let val = lu[perm[row] * n + col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }
        if max_val.is_nan() || max_val < PIVOT_EPS {
            return Err(DataError::Singular);
        }
        perm.swap(col, max_row);

        let p = perm[col];
        for row in (col + 1)..n {
            let r = perm[row];
            let factor = lu[r * n + col] / lu[p * n + col];
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                let val = lu[p * n + j];
                lu[r * n + j] -= factor * val;
            }
            let xc = x[p];
            x[r] -= factor * xc;
        }
    }

    let mut result = vec![0.0; n];
    for i in (0..n).rev() {
        let p = perm[i];
        let tail: f64 = ((i + 1)..n).map(|j| lu[p * n + j] * result[j]).sum();
        result[i] = (x[p] - tail) / lu[p * n + i];
    }
    Ok(result)
}

/// Ridge normal equations `(XᵀX + λI) w = Xᵀy` for a design matrix given row by row.
///
/// Returns the row-major `XᵀX + λI` and `Xᵀy`; the width is `Xᵀy.len()`.
pub fn normal_equations(rows: &[Vec<f64>], y: &[f64], ridge: f64) -> (Vec<f64>, Vec<f64>) {
    let dim = rows.first().map_or(0, Vec::len);
    let mut xtx = vec![0.0; dim * dim];
    for i in 0..dim {
        for j in 0..dim {
            xtx[i * dim + j] = rows.iter().map(|row| row[i] * row[j]).sum();
        }
        xtx[i * dim + i] += ridge;
    }
    let xty = (0..dim)
        .map(|i| rows.iter().zip(y).map(|(row, t)| row[i] * t).sum())
        .collect();
    (xtx, xty)
}

/// Least-squares weights for `rows · w ≈ y` under a ridge penalty.
pub fn ridge_fit(rows: &[Vec<f64>], y: &[f64], ridge: f64) -> Result<Vec<f64>> {
    let (a, b) = normal_equations(rows, y, ridge);
    solve(&a, &b, b.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_with_row_swap() {
        let x = solve(&[0.0, 2.0, 3.0, 1.0], &[4.0, 5.0], 2).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn three_by_three_needs_pivoting_twice() {
        // x = [1, -2, 3]
        let a = [0.0, 1.0, 2.0, 1.0, 0.0, 1.0, 4.0, 1.0, 0.0];
        let b = [4.0, 4.0, 2.0];
        let x = solve(&a, &b, 3).unwrap();
        for (got, want) in x.iter().zip([1.0, -2.0, 3.0]) {
            assert!((got - want).abs() < 1e-12, "{x:?}");
        }
    }

    #[test]
    fn rank_deficient_system_is_singular() {
        let err = solve(&[1.0, 2.0, 2.0, 4.0], &[1.0, 2.0], 2).unwrap_err();
        assert!(matches!(err, DataError::Singular));
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        assert!(matches!(
            solve(&[1.0, 0.0, 0.0], &[1.0, 2.0], 2),
            Err(DataError::Singular)
        ));
    }

    #[test]
    fn ridge_regularizes_dependent_columns() {
        let rows = vec![vec![1.0, 1.0], vec![2.0, 2.0]];
        let w = ridge_fit(&rows, &[2.0, 4.0], 0.01).unwrap();
        assert!((w[0] - w[1]).abs() < 1e-9);
    }
}
