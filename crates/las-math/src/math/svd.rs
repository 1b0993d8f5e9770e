//! Thin SVD of small dense matrices.
//!
//! Factorization runs in `f64` and returns `f32` factors with singular
//! values sorted in descending order.

use nalgebra::{DMatrix, DVector};

/// Singular values at or below this fraction of the largest one are
/// numerically zero.
pub const NEGLIGIBLE_SINGULAR_VALUE: f32 = 1e-5;

/// `M ≈ U · diag(S) · Vᵀ` with `U: m×r`, `S: r`, `V: n×r`, `r = min(m, n)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThinSvd {
    pub u: DMatrix<f32>,
    pub singular_values: DVector<f32>,
    pub v: DMatrix<f32>,
}

impl ThinSvd {
    /// Keep the leading `k` components.
    pub fn truncate(self, k: usize) -> ThinSvd {
        let k = k.min(self.singular_values.len());
        ThinSvd {
            u: self.u.columns(0, k).into_owned(),
            singular_values: self.singular_values.rows(0, k).into_owned(),
            v: self.v.columns(0, k).into_owned(),
        }
    }

    /// Number of singular values above `tolerance` times the largest.
    pub fn numerical_rank(&self, tolerance: f32) -> usize {
        let top = match self.singular_values.iter().next() {
            Some(&s) if s > 0.0 => s,
            _ => return 0,
        };
        self.singular_values
            .iter()
            .take_while(|&&s| s > tolerance * top)
            .count()
    }

    /// `U · diag(S) · Vᵀ`.
    pub fn reconstruct(&self) -> DMatrix<f32> {
        let mut us = self.u.clone();
        for (j, s) in self.singular_values.iter().enumerate() {
            us.column_mut(j).scale_mut(*s);
        }
        us * self.v.transpose()
    }
}

/// Thin SVD with descending singular values.
pub fn thin_svd(m: &DMatrix<f32>) -> ThinSvd {
    let (rows, cols) = m.shape();
    let r = rows.min(cols);
    if r == 0 {
        return ThinSvd {
            u: DMatrix::zeros(rows, 0),
            singular_values: DVector::zeros(0),
            v: DMatrix::zeros(cols, 0),
        };
    }

    let svd = m.map(f64::from).svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => unreachable!("svd requested with both factors"),
    };
    let s = svd.singular_values;

    let mut order: Vec<usize> = (0..r).collect();
    order.sort_by(|&a, &b| s[b].total_cmp(&s[a]));

    ThinSvd {
        u: DMatrix::from_fn(rows, r, |i, j| u[(i, order[j])] as f32),
        singular_values: DVector::from_fn(r, |j, _| s[order[j]] as f32),
        v: DMatrix::from_fn(cols, r, |i, j| v_t[(order[j], i)] as f32),
    }
}
