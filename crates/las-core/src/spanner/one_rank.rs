//! Spanner search with rank-one basis updates.
//!
//! Initialization fills each slot with the candidate of maximum volume
//! ratio. Improvement sweeps replace a slot whenever some candidate grows the
//! determinant by more than `c`, restarting the sweep after each swap, and
//! stop after a sweep without swaps or after `⌈d ln d / ln c⌉` sweeps.

use nalgebra::DMatrix;
use tracing::{debug, warn};

use super::{max_sweeps, shrunk_rows, Selection, Spanner, SpannerBasis, SINGULAR_RATIO};

#[derive(Debug, Clone)]
pub struct OneRankSpanner {
    c: f32,
    selection: Selection,
}

impl OneRankSpanner {
    pub fn new(c: f32) -> Self {
        Self {
            c,
            selection: Selection::default(),
        }
    }
}

/// Candidate with the largest ratio for `slot`; the first one wins ties.
fn find_max_volume(basis: &SpannerBasis, rows: &[Vec<f64>], slot: usize) -> (usize, f64) {
    let mut best = (0, -1.0);
    for (a, row) in rows.iter().enumerate() {
        let ratio = basis.volume_ratio(slot, row);
        if ratio > best.1 {
            best = (a, ratio);
        }
    }
    best
}

impl Spanner for OneRankSpanner {
    fn compute_spanner(&mut self, u: &DMatrix<f32>, rank: usize, shrink: &[f32]) {
        let dim = rank.min(u.ncols());
        self.selection.reset(dim, u.nrows());
        if dim == 0 || u.nrows() == 0 {
            return;
        }
        let rows = shrunk_rows(u, dim, shrink);
        let mut basis = SpannerBasis::identity(dim);

        for slot in 0..dim {
            let (best, ratio) = find_max_volume(&basis, &rows, slot);
            if ratio <= SINGULAR_RATIO || basis.replace_row(slot, &rows[best]).is_none() {
                warn!(slot, "no candidate spans this direction; slot left empty");
                continue;
            }
            self.selection.assign(slot, best);
        }

        let limit = max_sweeps(dim, self.c);
        let c = f64::from(self.c);
        let mut sweeps = 0;
        while sweeps < limit {
            sweeps += 1;
            let mut swapped = false;
            for slot in 0..dim {
                let (best, ratio) = find_max_volume(&basis, &rows, slot);
                if ratio > c && basis.replace_row(slot, &rows[best]).is_some() {
                    self.selection.assign(slot, best);
                    swapped = true;
                    break;
                }
            }
            if !swapped {
                break;
            }
        }

        self.selection.finish();
        debug!(
            dim,
            sweeps,
            log_det = basis.log_determinant(),
            selected = self.selection.indices().len(),
            "spanner computed"
        );
    }

    fn action_indices(&self) -> &[usize] {
        self.selection.indices()
    }

    fn is_action_in_spanner(&self, action: usize) -> bool {
        self.selection.contains(action)
    }

    fn membership(&self) -> &[bool] {
        self.selection.membership()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_dominant_directions() {
        let u = DMatrix::from_row_slice(5, 2, &[
            0.1, 0.1, //
            5.0, 0.0, //
            0.2, -0.1, //
            0.0, 4.0, //
            1.0, 1.0,
        ]);
        let mut spanner = OneRankSpanner::new(2.0);
        spanner.compute_spanner(&u, 2, &[1.0; 5]);
        let mut chosen = spanner.action_indices().to_vec();
        chosen.sort_unstable();
        assert_eq!(chosen, vec![1, 3]);
        assert!(spanner.is_action_in_spanner(1));
        assert!(!spanner.is_action_in_spanner(0));
    }

    #[test]
    fn shrink_demotes_actions() {
        let u = DMatrix::from_row_slice(3, 1, &[3.0, 2.0, 1.0]);
        let mut spanner = OneRankSpanner::new(2.0);
        spanner.compute_spanner(&u, 1, &[10.0, 1.0, 1.0]);
        assert_eq!(spanner.action_indices(), &[1]);
    }

    #[test]
    fn zero_rows_leave_slots_empty() {
        let u = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 2.0, 0.0, 0.0, 0.0]);
        let mut spanner = OneRankSpanner::new(2.0);
        spanner.compute_spanner(&u, 2, &[1.0; 3]);
        assert_eq!(spanner.action_indices(), &[1]);
    }

    #[test]
    fn duplicates_are_not_both_selected() {
        let u = DMatrix::from_row_slice(4, 2, &[
            1.0, 2.0, //
            1.0, 2.0, //
            -2.0, 1.0, //
            0.1, 0.1,
        ]);
        let mut spanner = OneRankSpanner::new(2.0);
        spanner.compute_spanner(&u, 2, &[1.0; 4]);
        let chosen = spanner.action_indices();
        assert_eq!(chosen.len(), 2);
        assert!(!(chosen.contains(&0) && chosen.contains(&1)));
    }
}
