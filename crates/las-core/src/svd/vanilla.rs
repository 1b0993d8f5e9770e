//! Range finder over the explicit CSR action matrix.

use las_common::Result;
use las_config::SvdVariant;
use las_math::{orthonormal_basis, GaussianProjection};
use nalgebra::DMatrix;

use super::{finish_from_range, LowRankBasis, SvdBackend, SvdInput};
use crate::matrix::ActionMatrix;
use crate::weights::WeightStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct VanillaSvd;

impl SvdBackend for VanillaSvd {
    fn variant(&self) -> SvdVariant {
        SvdVariant::Vanilla
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
        let a = ActionMatrix::build(input.round);
        let d = input.rank;
        let omega = GaussianProjection::new(input.seed);

        let y_columns = input.parallel.map(d, |j| {
            let mut column = vec![0.0f32; a.ncols()];
            for i in 0..a.nrows() {
                let weight = shrink[i] * omega.value(i as u64, j as u64);
                if weight == 0.0 {
                    continue;
                }
                for (col, value) in a.row(i) {
                    column[col] += value * weight;
                }
            }
            column
        });
        let y = orthonormal_basis(DMatrix::from_fn(a.ncols(), d, |r, j| y_columns[j][r]));
        let y_rank = y.ncols();
        if y_rank == 0 {
            return Ok(LowRankBasis::empty());
        }

        let b_rows = input.parallel.map(a.nrows(), |i| {
            let mut row = vec![0.0f32; y_rank];
            for (col, value) in a.row(i) {
                for (j, out) in row.iter_mut().enumerate() {
                    *out += value * y[(col, j)];
                }
            }
            for out in &mut row {
                *out *= shrink[i];
            }
            row
        });
        let b = DMatrix::from_fn(a.nrows(), y_rank, |i, j| b_rows[i][j]);

        Ok(finish_from_range(&y, &b, input.seed))
    }
}
