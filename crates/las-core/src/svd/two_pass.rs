//! Two passes over the batch without materializing `A`.
//!
//! ```text
//!   pass 1:  Y = (D·A)ᵀ · Ω      Ω(i, j) = gaussian(i + j + seed)
//!            Y = orth(Y)
//!   pass 2:  B = D·A · Y
//! ```
//!
//! `Y` is stored over the round's compacted feature columns.

use las_common::Result;
use las_config::SvdVariant;
use las_math::{orthonormal_basis, GaussianProjection};
use nalgebra::DMatrix;
use tracing::trace;

use super::{finish_from_range, LowRankBasis, SvdBackend, SvdInput};
use crate::features::for_each_feature;
use crate::weights::WeightStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct TwoPassSvd;

impl SvdBackend for TwoPassSvd {
    fn variant(&self) -> SvdVariant {
        SvdVariant::TwoPass
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
        let columns = &round.columns;
        let mask = round.feature_mask;
        let d = input.rank;
        let omega = GaussianProjection::new(input.seed);

        // Pass 1: one task per column of Y.
        let y_columns = input.parallel.map(d, |j| {
            let mut column = vec![0.0f32; columns.len()];
            for (i, action) in round.actions.iter().enumerate() {
                let weight = shrink[i] * omega.value(i as u64, j as u64);
                if weight == 0.0 {
                    continue;
                }
                for_each_feature(action, &round.interactions, |index, value| {
                    if let Some(r) = columns.ordinal(index & mask) {
                        column[r] += value * weight;
                    }
                });
            }
            column
        });
        let y = orthonormal_basis(DMatrix::from_fn(columns.len(), d, |r, j| y_columns[j][r]));
        let y_rank = y.ncols();
        trace!(features = columns.len(), y_rank, "two-pass range sketch");
        if y_rank == 0 {
            return Ok(LowRankBasis::empty());
        }

        // Pass 2: one task per row of B.
        let b_rows = input.parallel.map(round.action_count(), |i| {
            let mut row = vec![0.0f32; y_rank];
            for_each_feature(&round.actions[i], &round.interactions, |index, value| {
                if let Some(r) = columns.ordinal(index & mask) {
                    for (j, out) in row.iter_mut().enumerate() {
                        *out += value * y[(r, j)];
                    }
                }
            });
            for out in &mut row {
                *out *= shrink[i];
            }
            row
        });
        let b = DMatrix::from_fn(round.action_count(), y_rank, |i, j| b_rows[i][j]);

        Ok(finish_from_range(&y, &b, input.seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::KernelBackend;
    use crate::parallel::Parallelism;
    use crate::svd::test_support::low_rank_round;
    use las_math::orthonormality_error;

    #[test]
    fn recovers_exact_low_rank_matrix() {
        let round = low_rank_round(12, 9, 3);
        let parallel = Parallelism::inline();
        let input = SvdInput {
            round: &round,
            rank: 3,
            seed: 7,
            kernel: KernelBackend::Scalar,
            parallel: &parallel,
        };
        let shrink = vec![1.0; 12];
        let mut weights = WeightStore::dense(4, 0);
        let basis = TwoPassSvd.run(&input, &shrink, &mut weights).unwrap();

        assert_eq!(basis.u.shape(), (12, 3));
        assert_eq!(basis.v.shape(), (9, 3));
        assert!(orthonormality_error(&basis.u) < 1e-3);

        let a = crate::matrix::ActionMatrix::build(&round).to_dense();
        let mut us = basis.u.clone();
        for (j, s) in basis.singular_values.iter().enumerate() {
            us.column_mut(j).scale_mut(*s);
        }
        let recon = us * basis.v.transpose();
        assert!((recon - a).abs().max() < 1e-3);
    }

    #[test]
    fn pooled_matches_inline() {
        let round = low_rank_round(10, 8, 4);
        let shrink: Vec<f32> = (0..10).map(|i| 1.0 + i as f32 * 0.1).collect();
        let mut weights = WeightStore::dense(4, 0);
        let inline = Parallelism::inline();
        let pooled = Parallelism::new(2).unwrap();
        let run = |parallel: &Parallelism, weights: &mut WeightStore| {
            let input = SvdInput {
                round: &round,
                rank: 3,
                seed: 1,
                kernel: KernelBackend::Scalar,
                parallel,
            };
            TwoPassSvd.run(&input, &shrink, weights).unwrap()
        };
        assert_eq!(run(&inline, &mut weights), run(&pooled, &mut weights));
    }

    #[test]
    fn too_few_features_is_empty() {
        let round = low_rank_round(10, 3, 2);
        let parallel = Parallelism::inline();
        let input = SvdInput {
            round: &round,
            rank: 3,
            seed: 0,
            kernel: KernelBackend::Scalar,
            parallel: &parallel,
        };
        let basis = TwoPassSvd
            .run(&input, &[1.0; 10], &mut WeightStore::dense(4, 0))
            .unwrap();
        assert!(basis.is_empty());
    }

    #[test]
    fn lower_rank_data_yields_unit_columns_only() {
        let round = low_rank_round(12, 9, 2);
        let parallel = Parallelism::inline();
        let input = SvdInput {
            round: &round,
            rank: 3,
            seed: 11,
            kernel: KernelBackend::Scalar,
            parallel: &parallel,
        };
        let basis = TwoPassSvd
            .run(&input, &[1.0; 12], &mut WeightStore::dense(4, 0))
            .unwrap();
        assert_eq!(basis.u.shape(), (12, 2));
        assert_eq!(basis.v.shape(), (9, 2));
        for j in 0..2 {
            assert!((basis.u.column(j).norm() - 1.0).abs() < 1e-4);
        }
    }
}
