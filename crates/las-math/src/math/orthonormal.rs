//! Column orthonormalization.

use nalgebra::DMatrix;

/// Columns whose residual norm falls below this fraction of their original
/// norm are treated as linearly dependent and zeroed.
pub const DEPENDENT_COLUMN_TOLERANCE: f64 = 1e-5;

/// Modified Gram-Schmidt with one re-orthogonalization pass, in place.
///
/// Dependent (or zero) columns become zero columns. Returns the number of
/// non-zero columns left.
pub fn orthonormalize_columns(m: &mut DMatrix<f32>) -> usize {
    let rows = m.nrows();
    let cols = m.ncols();
    if rows == 0 {
        return 0;
    }
    let data = m.as_mut_slice();
    let mut rank = 0;

    for j in 0..cols {
        let (done, rest) = data.split_at_mut(j * rows);
        let column = &mut rest[..rows];
        let original = norm(column);

        for _pass in 0..2 {
            for k in 0..j {
                let basis = &done[k * rows..(k + 1) * rows];
                let proj = dot(basis, column) as f32;
                if proj != 0.0 {
                    for (c, b) in column.iter_mut().zip(basis) {
                        *c -= proj * b;
                    }
                }
            }
        }

        let residual = norm(column);
        if original == 0.0 || residual <= DEPENDENT_COLUMN_TOLERANCE * original {
            column.fill(0.0);
            continue;
        }
        let inv = (1.0 / residual) as f32;
        for c in column.iter_mut() {
            *c *= inv;
        }
        rank += 1;
    }
    rank
}

/// Orthonormal basis for the column space of `m`.
///
/// Runs [`orthonormalize_columns`] and drops the zeroed columns, so every
/// column of the result has unit norm. The result may have no columns.
pub fn orthonormal_basis(mut m: DMatrix<f32>) -> DMatrix<f32> {
    let rank = orthonormalize_columns(&mut m);
    if rank == m.ncols() {
        return m;
    }
    let kept: Vec<usize> = (0..m.ncols())
        .filter(|&j| m.column(j).iter().any(|&v| v != 0.0))
        .collect();
    m.select_columns(&kept)
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}

fn norm(a: &[f32]) -> f64 {
    dot(a, a).sqrt()
}

/// Largest absolute deviation of `MᵀM` from the identity over the non-zero
/// columns of `m`.
pub fn orthonormality_error(m: &DMatrix<f32>) -> f32 {
    let gram = m.transpose() * m;
    let mut worst = 0.0f32;
    for i in 0..gram.nrows() {
        if gram[(i, i)] == 0.0 {
            continue;
        }
        for j in 0..gram.ncols() {
            if gram[(j, j)] == 0.0 {
                continue;
            }
            let target = if i == j { 1.0 } else { 0.0 };
            worst = worst.max((gram[(i, j)] - target).abs());
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn orthonormalizes_independent_columns() {
        let mut m = DMatrix::from_row_slice(4, 3, &[
            1.0, 2.0, 0.5, //
            0.0, 1.0, 3.0, //
            2.0, 0.0, 1.0, //
            1.0, 1.0, 1.0,
        ]);
        let rank = orthonormalize_columns(&mut m);
        assert_eq!(rank, 3);
        assert!(orthonormality_error(&m) < 1e-5);
    }

    #[test]
    fn dependent_column_is_zeroed() {
        let mut m = DMatrix::from_row_slice(3, 3, &[
            1.0, 2.0, 0.0, //
            0.0, 0.0, 1.0, //
            1.0, 2.0, 0.0,
        ]);
        let rank = orthonormalize_columns(&mut m);
        assert_eq!(rank, 2);
        assert!(m.column(1).iter().all(|&v| v == 0.0));
        assert!(orthonormality_error(&m) < 1e-5);
    }

    #[test]
    fn basis_drops_dependent_columns() {
        let m = DMatrix::from_row_slice(4, 3, &[
            1.0, 2.0, 0.0, //
            0.0, 0.0, 1.0, //
            1.0, 2.0, 1.0, //
            0.0, 0.0, 0.0,
        ]);
        let basis = orthonormal_basis(m);
        assert_eq!(basis.shape(), (4, 2));
        for j in 0..2 {
            assert!((basis.column(j).norm() - 1.0).abs() < 1e-5);
        }
        assert!(orthonormality_error(&basis) < 1e-5);
    }

    #[test]
    fn basis_of_zero_matrix_has_no_columns() {
        let basis = orthonormal_basis(DMatrix::zeros(5, 3));
        assert_eq!(basis.shape(), (5, 0));
    }

    #[test]
    fn empty_matrix() {
        let mut m = DMatrix::<f32>::zeros(0, 0);
        assert_eq!(orthonormalize_columns(&mut m), 0);
    }

    proptest! {
        #[test]
        fn random_tall_matrices_become_orthonormal(
            values in proptest::collection::vec(-10.0f32..10.0, 8 * 3)
        ) {
            let mut m = DMatrix::from_column_slice(8, 3, &values);
            orthonormalize_columns(&mut m);
            prop_assert!(orthonormality_error(&m) < 1e-4);
            for j in 0..3 {
                let n = m.column(j).norm();
                prop_assert!(n == 0.0 || (n - 1.0).abs() < 1e-4);
            }
        }
    }
}
