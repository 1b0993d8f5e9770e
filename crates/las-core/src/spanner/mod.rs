//! Approximate barycentric spanner over the rows of `U`.
//!
//! The spanner selects (at most) `d` actions whose rows of `diag(1/shrink)·U`
//! approximately maximize the absolute determinant: no single swap can grow
//! it by more than a factor `c`.

mod basis;
mod determinant;
mod one_rank;

pub use basis::{SpannerBasis, SINGULAR_RATIO};
pub use determinant::DeterminantSpanner;
pub use one_rank::OneRankSpanner;

use las_config::{LasConfig, SpannerVariant};
use nalgebra::DMatrix;

/// A spanner search.
pub trait Spanner: Send + Sync + std::fmt::Debug {
    /// Select actions from the rows of `u`, each divided by its shrink factor.
    fn compute_spanner(&mut self, u: &DMatrix<f32>, rank: usize, shrink: &[f32]);

    /// Selected actions in slot order.
    fn action_indices(&self) -> &[usize];

    fn is_action_in_spanner(&self, action: usize) -> bool;

    /// Membership flags indexed by action.
    fn membership(&self) -> &[bool];
}

/// Spanner selected by `config.spanner`.
pub fn spanner_for(config: &LasConfig) -> Box<dyn Spanner> {
    match config.spanner {
        SpannerVariant::OneRank => Box::new(OneRankSpanner::new(config.spanner_c)),
        SpannerVariant::FullDeterminant => Box::new(DeterminantSpanner::new(config.spanner_c)),
    }
}

/// Slot assignment shared by the spanner implementations.
#[derive(Debug, Clone, Default)]
pub(crate) struct Selection {
    slots: Vec<Option<usize>>,
    indices: Vec<usize>,
    membership: Vec<bool>,
}

impl Selection {
    pub(crate) fn reset(&mut self, dim: usize, actions: usize) {
        self.slots = vec![None; dim];
        self.indices.clear();
        self.membership = vec![false; actions];
    }

    pub(crate) fn assign(&mut self, slot: usize, action: usize) {
        self.slots[slot] = Some(action);
    }

    /// Publish the slot assignment as indices and membership flags.
    pub(crate) fn finish(&mut self) {
        self.indices = self.slots.iter().flatten().copied().collect();
        for &a in &self.indices {
            self.membership[a] = true;
        }
    }

    pub(crate) fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub(crate) fn membership(&self) -> &[bool] {
        &self.membership
    }

    pub(crate) fn contains(&self, action: usize) -> bool {
        self.membership.get(action).copied().unwrap_or(false)
    }
}

/// Rows of `diag(1/shrink)·U` restricted to the first `dim` columns, in f64.
pub(crate) fn shrunk_rows(u: &DMatrix<f32>, dim: usize, shrink: &[f32]) -> Vec<Vec<f64>> {
    (0..u.nrows())
        .map(|a| {
            let s = f64::from(shrink.get(a).copied().unwrap_or(1.0));
            (0..dim).map(|j| f64::from(u[(a, j)]) / s).collect()
        })
        .collect()
}

/// Upper bound on improvement sweeps: `⌈d · ln d / ln c⌉`.
pub(crate) fn max_sweeps(dim: usize, c: f32) -> usize {
    if dim < 2 {
        return 0;
    }
    let d = dim as f64;
    (d * d.ln() / f64::from(c).ln()).ceil() as usize
}
