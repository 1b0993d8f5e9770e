//! Range finder that keeps its sketches in spare weight-store slots.
//!
//! For every touched feature `f`, slot `slot(f, scratch_offset + j)` holds
//! column `j` of the current sketch:
//!
//! ```text
//!   Ω[f][j] = gaussian(f + j + seed)      written into scratch
//!   Y       = D·A·Ω                       (K × d), read through the slots
//!   Q       = orth(Y)                     (K × r), r ≤ d surviving columns
//!   B       = Qᵀ·D·A                      (r × F'), accumulated into scratch
//!   B       = Ub · S · Vbᵀ,  U = Q·Ub,  V = Vb
//! ```
//!
//! The scratch slots are zeroed again on every exit path.

use las_common::Result;
use las_config::SvdVariant;
use las_math::{orthonormal_basis, thin_svd, GaussianProjection, NEGLIGIBLE_SINGULAR_VALUE};
use nalgebra::DMatrix;
use tracing::trace;

use super::{LowRankBasis, SvdBackend, SvdInput};
use crate::features::for_each_feature;
use crate::weights::WeightStore;

#[derive(Debug, Clone, Copy)]
pub struct ModelWeightSvd {
    scratch_offset: u32,
}

impl ModelWeightSvd {
    pub fn new(scratch_offset: u32) -> Self {
        Self { scratch_offset }
    }
}

impl SvdBackend for ModelWeightSvd {
    fn variant(&self) -> SvdVariant {
        SvdVariant::ModelWeight
    }

    fn run(
        &self,
        input: &SvdInput<'_>,
        shrink: &[f32],
        weights: &mut WeightStore,
    ) -> Result<LowRankBasis> {
        if input.is_rank_deficient() {
            return Ok(LowRankBasis::empty());
        }
        let round = input.round;
        let features = round.columns.as_slice();
        let d = input.rank;
        let k = round.action_count();
        let omega = GaussianProjection::new(input.seed);

        let mut scratch = weights.scratch(self.scratch_offset, d, features.to_vec())?;
        for &f in features {
            for j in 0..d {
                scratch.set(f, j, omega.value(f, j as u64));
            }
        }

        let y_rows = {
            let scratch = &scratch;
            input.parallel.map(k, |i| {
                let mut row = vec![0.0f32; d];
                for_each_feature(&round.actions[i], &round.interactions, |index, value| {
                    for (j, out) in row.iter_mut().enumerate() {
                        *out += value * scratch.get(index, j);
                    }
                });
                for out in &mut row {
                    *out *= shrink[i];
                }
                row
            })
        };
        let q = orthonormal_basis(DMatrix::from_fn(k, d, |i, j| y_rows[i][j]));
        let q_rank = q.ncols();
        trace!(features = features.len(), q_rank, "model-weight range sketch");
        if q_rank == 0 {
            return Ok(LowRankBasis::empty());
        }

        scratch.clear();
        for (i, action) in round.actions.iter().enumerate() {
            let scale = shrink[i];
            for_each_feature(action, &round.interactions, |index, value| {
                for j in 0..q_rank {
                    let delta = q[(i, j)] * scale * value;
                    if delta != 0.0 {
                        scratch.add(index, j, delta);
                    }
                }
            });
        }
        let b = DMatrix::from_fn(q_rank, features.len(), |j, c| scratch.get(features[c], j));
        drop(scratch);

        let svd = thin_svd(&b);
        let keep = svd.numerical_rank(NEGLIGIBLE_SINGULAR_VALUE);
        if keep == 0 {
            return Ok(LowRankBasis::empty());
        }
        let svd = svd.truncate(keep);
        Ok(LowRankBasis {
            u: &q * &svd.u,
            singular_values: svd.singular_values,
            v: svd.v,
        })
    }
}
