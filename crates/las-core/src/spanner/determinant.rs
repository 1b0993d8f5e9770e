//! Reference spanner that recomputes the full determinant for every
//! candidate. Same search as [`super::OneRankSpanner`]; `O(K · d³)` per slot.

use nalgebra::DMatrix;
use tracing::{debug, warn};

use super::{max_sweeps, shrunk_rows, Selection, Spanner, SINGULAR_RATIO};

#[derive(Debug, Clone)]
pub struct DeterminantSpanner {
    c: f32,
    selection: Selection,
}

impl DeterminantSpanner {
    pub fn new(c: f32) -> Self {
        Self {
            c,
            selection: Selection::default(),
        }
    }
}

fn set_slot(m: &mut DMatrix<f64>, slot: usize, row: &[f64]) {
    for (j, v) in row.iter().enumerate() {
        m[(slot, j)] = *v;
    }
}

fn abs_det_with(current: &DMatrix<f64>, slot: usize, row: &[f64]) -> f64 {
    let mut m = current.clone();
    set_slot(&mut m, slot, row);
    m.lu().determinant().abs()
}

fn find_max_det(current: &DMatrix<f64>, rows: &[Vec<f64>], slot: usize) -> (usize, f64) {
    let mut best = (0, -1.0);
    for (a, row) in rows.iter().enumerate() {
        let det = abs_det_with(current, slot, row);
        if det > best.1 {
            best = (a, det);
        }
    }
    best
}

impl Spanner for DeterminantSpanner {
    fn compute_spanner(&mut self, u: &DMatrix<f32>, rank: usize, shrink: &[f32]) {
        let dim = rank.min(u.ncols());
        self.selection.reset(dim, u.nrows());
        if dim == 0 || u.nrows() == 0 {
            return;
        }
        let rows = shrunk_rows(u, dim, shrink);
        let mut current = DMatrix::<f64>::identity(dim, dim);
        let mut det = 1.0f64;

        for slot in 0..dim {
            let (best, candidate) = find_max_det(&current, &rows, slot);
            if candidate <= SINGULAR_RATIO * det {
                warn!(slot, "no candidate spans this direction; slot left empty");
                continue;
            }
            set_slot(&mut current, slot, &rows[best]);
            det = candidate;
            self.selection.assign(slot, best);
        }

        let limit = max_sweeps(dim, self.c);
        let c = f64::from(self.c);
        let mut sweeps = 0;
        while sweeps < limit {
            sweeps += 1;
            let mut swapped = false;
            for slot in 0..dim {
                let (best, candidate) = find_max_det(&current, &rows, slot);
                if candidate > c * det {
                    set_slot(&mut current, slot, &rows[best]);
                    det = candidate;
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
        debug!(dim, sweeps, det, "reference spanner computed");
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
    use crate::spanner::OneRankSpanner;

    fn pseudo_random_u(rows: usize, cols: usize, seed: u64) -> DMatrix<f32> {
        let mut state = seed;
        DMatrix::from_fn(rows, cols, |_, _| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            ((state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
        })
    }

    #[test]
    fn agrees_with_one_rank_search() {
        for seed in [1u64, 2, 3, 4] {
            let u = pseudo_random_u(12, 4, seed);
            let shrink: Vec<f32> = (0..12).map(|i| 1.0 + (i % 4) as f32 * 0.5).collect();
            let mut reference = DeterminantSpanner::new(2.0);
            let mut fast = OneRankSpanner::new(2.0);
            reference.compute_spanner(&u, 4, &shrink);
            fast.compute_spanner(&u, 4, &shrink);
            let mut a = reference.action_indices().to_vec();
            let mut b = fast.action_indices().to_vec();
            a.sort_unstable();
            b.sort_unstable();
            assert_eq!(a, b, "seed {seed}");
        }
    }

    #[test]
    fn result_is_locally_optimal() {
        let u = pseudo_random_u(10, 3, 17);
        let mut spanner = DeterminantSpanner::new(2.0);
        spanner.compute_spanner(&u, 3, &[1.0; 10]);
        let chosen = spanner.action_indices().to_vec();
        assert_eq!(chosen.len(), 3);
        let rows = shrunk_rows(&u, 3, &[1.0; 10]);
        let m = DMatrix::from_fn(3, 3, |i, j| rows[chosen[i]][j]);
        let det = m.determinant().abs();
        for slot in 0..3 {
            for row in &rows {
                assert!(abs_det_with(&m, slot, row) <= 2.0 * det + 1e-9);
            }
        }
    }
}
