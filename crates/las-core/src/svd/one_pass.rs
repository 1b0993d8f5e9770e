//! Single sketch with the sparse Rademacher projection.
//!
//! ```text
//!   p         = min(K, d + oversample)
//!   AΩ[i][j]  = shrink[i] · dot(action_i, column_j)
//!   U         = leading d left singular vectors of AΩ
//! ```
//!
//! Components with a negligible singular value are dropped.
//!
//! `V` is not recovered.

use las_common::Result;
use las_config::SvdVariant;
use las_math::{thin_svd, NEGLIGIBLE_SINGULAR_VALUE};
use nalgebra::DMatrix;
use tracing::trace;

use super::{LowRankBasis, SvdBackend, SvdInput};
use crate::kernel::compute_dot_prod;
use crate::weights::WeightStore;

/// Distance between the projection columns' index offsets.
pub const COLUMN_SPACING: u64 = 0x9E37_79B9;

#[derive(Debug, Clone, Copy)]
pub struct OnePassSvd {
    oversample: usize,
}

impl OnePassSvd {
    pub fn new(oversample: usize) -> Self {
        Self { oversample }
    }

    pub fn sketch_width(&self, actions: usize, rank: usize) -> usize {
        (rank + self.oversample).min(actions)
    }
}

impl SvdBackend for OnePassSvd {
    fn variant(&self) -> SvdVariant {
        SvdVariant::OnePass
    }

    fn run(
        &self,
        input: &SvdInput<'_>,
        shrink: &[f32],
        _weights: &mut WeightStore,
    ) -> Result<LowRankBasis> {
        if input.is_rank_deficient() {
            return Ok(LowRankBasis::empty());
        }
        let round = input.round;
        let k = round.action_count();
        let p = self.sketch_width(k, input.rank);

        let rows = input.parallel.map(k, |i| {
            (0..p)
                .map(|j| {
                    shrink[i]
                        * compute_dot_prod(
                            input.kernel,
                            &round.actions[i],
                            &round.interactions,
                            round.feature_mask,
                            j as u64 * COLUMN_SPACING,
                            input.seed,
                        )
                })
                .collect::<Vec<f32>>()
        });
        let sketch = DMatrix::from_fn(k, p, |i, j| rows[i][j]);
        trace!(actions = k, width = p, kernel = %input.kernel, "one-pass sketch");

        let svd = thin_svd(&sketch);
        let keep = svd.numerical_rank(NEGLIGIBLE_SINGULAR_VALUE).min(input.rank);
        if keep == 0 {
            return Ok(LowRankBasis::empty());
        }
        let svd = svd.truncate(keep);
        Ok(LowRankBasis {
            u: svd.u,
            singular_values: svd.singular_values,
            v: DMatrix::zeros(0, 0),
        })
    }
}
