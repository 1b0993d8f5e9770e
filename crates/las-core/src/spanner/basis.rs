//! Determinant-normalized basis with a maintained inverse.
//!
//! The chosen rows form `M` (identity rows where no action is chosen yet).
//! The basis stores the scaled matrix `X = M · exp(-L/d)` with `L = ln|det M|`,
//! so `|det X| = 1` and entries stay O(1) however large `det M` grows. The
//! volume ratio of swapping slot `i` for a candidate row `y` is
//!
//! ```text
//!   |det M'| / |det M| = |ŷ · X⁻¹ e_i|,   ŷ = y · exp(-L/d)
//! ```

use nalgebra::{DMatrix, DVector};

/// Ratios at or below this are treated as singular replacements.
pub const SINGULAR_RATIO: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct SpannerBasis {
    x: DMatrix<f64>,
    x_inv: DMatrix<f64>,
    log_det: f64,
}

impl SpannerBasis {
    pub fn identity(dim: usize) -> Self {
        Self {
            x: DMatrix::identity(dim, dim),
            x_inv: DMatrix::identity(dim, dim),
            log_det: 0.0,
        }
    }

    pub fn dim(&self) -> usize {
        self.x.nrows()
    }

    /// `ln |det M|` of the unscaled rows.
    pub fn log_determinant(&self) -> f64 {
        self.log_det
    }

    /// Factor mapping raw rows into the scaled basis.
    pub fn scale(&self) -> f64 {
        if self.dim() == 0 {
            return 1.0;
        }
        (-self.log_det / self.dim() as f64).exp()
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.x
    }

    pub fn inverse(&self) -> &DMatrix<f64> {
        &self.x_inv
    }

    /// `|det M'| / |det M|` if slot `slot` were replaced by `raw`.
    pub fn volume_ratio(&self, slot: usize, raw: &[f64]) -> f64 {
        let scale = self.scale();
        let phi = self.x_inv.column(slot);
        let dot: f64 = raw.iter().zip(phi.iter()).map(|(r, p)| r * p).sum();
        (dot * scale).abs()
    }

    /// Replace slot `slot` with `raw` and renormalize. Returns the volume
    /// ratio, or `None` (leaving the basis unchanged) when the replacement
    /// would make the basis singular.
    pub fn replace_row(&mut self, slot: usize, raw: &[f64]) -> Option<f64> {
        let dim = self.dim() as f64;
        let y = DVector::from_iterator(raw.len(), raw.iter().map(|r| r * self.scale()));
        let u = &y - self.x.row(slot).transpose();

        let phi = self.x_inv.column(slot).into_owned();
        let denom = 1.0 + u.dot(&phi);
        if !denom.is_finite() || denom.abs() <= SINGULAR_RATIO {
            return None;
        }

        // Sherman-Morrison for X' = X + e_slot · uᵀ
        let w = self.x_inv.transpose() * &u;
        self.x_inv -= (&phi * w.transpose()) / denom;
        self.x.set_row(slot, &y.transpose());

        let ratio = denom.abs();
        let step = ratio.ln() / dim;
        self.log_det += ratio.ln();
        self.x *= (-step).exp();
        self.x_inv *= step.exp();
        Some(ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det_of_rows(rows: &[Vec<f64>]) -> f64 {
        let n = rows.len();
        DMatrix::from_fn(n, n, |i, j| rows[i][j]).determinant()
    }

    #[test]
    fn ratio_matches_determinant_ratio() {
        let mut basis = SpannerBasis::identity(3);
        let mut rows = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        let candidates = [
            (0, vec![4.0, 1.0, -2.0]),
            (2, vec![0.5, 3.0, 7.0]),
            (1, vec![-2.0, 5.0, 1.0]),
            (0, vec![1.0, 1.0, 1.0]),
        ];
        for (slot, raw) in candidates {
            let before = det_of_rows(&rows).abs();
            let predicted = basis.volume_ratio(slot, &raw);
            rows[slot] = raw.clone();
            let after = det_of_rows(&rows).abs();
            assert!((predicted - after / before).abs() < 1e-9 * (after / before).max(1.0));

            let applied = basis.replace_row(slot, &raw).unwrap();
            assert!((applied - predicted).abs() < 1e-9 * predicted.max(1.0));
            assert!((basis.log_determinant() - after.ln()).abs() < 1e-9);
        }
    }

    #[test]
    fn scaled_basis_has_unit_determinant_and_valid_inverse() {
        let mut basis = SpannerBasis::identity(2);
        basis.replace_row(0, &[10.0, 3.0]).unwrap();
        basis.replace_row(1, &[-4.0, 25.0]).unwrap();
        assert!((basis.matrix().determinant().abs() - 1.0).abs() < 1e-9);
        let product = basis.matrix() * basis.inverse();
        assert!((product - DMatrix::identity(2, 2)).abs().max() < 1e-9);
    }

    #[test]
    fn singular_replacement_is_rejected() {
        let mut basis = SpannerBasis::identity(2);
        basis.replace_row(0, &[1.0, 1.0]).unwrap();
        let before = basis.clone();
        assert!(basis.replace_row(1, &[2.0, 2.0]).is_none());
        assert_eq!(basis.log_determinant(), before.log_determinant());
    }
}
