//! Implicit random projection matrices.
//!
//! Entries are computed on demand from `row + column + seed`; the matrices
//! are never stored unless a caller asks for a small dense block.

use nalgebra::DMatrix;

use super::rand48::{gaussian, sparse_rademacher};

/// Combined index of entry `(row, column)` under `seed`.
#[inline]
pub fn combined_index(row: u64, column: u64, seed: u64) -> u64 {
    row.wrapping_add(column).wrapping_add(seed)
}

/// Dense standard-normal projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaussianProjection {
    seed: u64,
}

impl GaussianProjection {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    pub fn value(&self, row: u64, column: u64) -> f32 {
        gaussian(combined_index(row, column, self.seed))
    }

    /// Materialize a `rows × cols` block starting at the origin.
    pub fn block(&self, rows: usize, cols: usize) -> DMatrix<f32> {
        DMatrix::from_fn(rows, cols, |r, c| self.value(r as u64, c as u64))
    }
}

/// Sparse `{0, ±1}` projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RademacherProjection {
    seed: u64,
}

impl RademacherProjection {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    #[inline]
    pub fn value(&self, row: u64, column: u64) -> f32 {
        sparse_rademacher(combined_index(row, column, self.seed))
    }
}
