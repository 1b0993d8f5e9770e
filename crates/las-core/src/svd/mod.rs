//! Randomized low-rank factorization of the shrunk action matrix `D·A`.
//!
//! All back ends produce `U` (actions × d) for the spanner search. Which
//! other factors are available depends on the back end:
//!
//! | back end       | U | S | V          | action matrix   |
//! |----------------|---|---|------------|-----------------|
//! | `TwoPass`      | ✓ | ✓ | ✓          | implicit        |
//! | `Vanilla`      | ✓ | ✓ | ✓          | explicit CSR    |
//! | `OnePass`      | ✓ | ✓ | empty      | implicit        |
//! | `ModelWeight`  | ✓ | ✓ | ✓          | weight slots    |
//!
//! A round whose compacted feature count does not exceed `d` is rank
//! deficient and yields an empty basis. When `D·A` itself has rank below
//! `d`, the basis is cut to that rank and every column of `U` keeps unit
//! norm.

mod model_weight;
mod one_pass;
mod two_pass;
mod vanilla;

pub use model_weight::ModelWeightSvd;
pub use one_pass::{OnePassSvd, COLUMN_SPACING};
pub use two_pass::TwoPassSvd;
pub use vanilla::VanillaSvd;

use las_common::Result;
use las_config::{LasConfig, SvdVariant};
use las_math::{orthonormal_basis, thin_svd, GaussianProjection, NEGLIGIBLE_SINGULAR_VALUE};
use nalgebra::{DMatrix, DVector};

use crate::features::RoundFeatures;
use crate::kernel::KernelBackend;
use crate::parallel::Parallelism;
use crate::weights::WeightStore;

/// Added to the round seed for the second Gaussian sketch `P`.
pub const SECOND_SKETCH_SALT: u64 = 0x2545_f491_4f6c_dd1d;

/// Truncated factors `D·A ≈ U · diag(S) · Vᵀ`.
#[derive(Debug, Clone, PartialEq)]
pub struct LowRankBasis {
    pub u: DMatrix<f32>,
    pub singular_values: DVector<f32>,
    /// Rows follow the round's compacted feature columns. Empty when the
    /// back end does not recover `V`.
    pub v: DMatrix<f32>,
}

impl LowRankBasis {
    pub fn empty() -> Self {
        Self {
            u: DMatrix::zeros(0, 0),
            singular_values: DVector::zeros(0),
            v: DMatrix::zeros(0, 0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.u.nrows() == 0 || self.u.ncols() == 0
    }

    pub fn rank(&self) -> usize {
        self.u.ncols()
    }
}

/// Everything a back end reads for one round.
#[derive(Debug, Clone, Copy)]
pub struct SvdInput<'a> {
    pub round: &'a RoundFeatures,
    /// Target rank `d`.
    pub rank: usize,
    pub seed: u64,
    /// Dot-product kernel for this round's interactions.
    pub kernel: KernelBackend,
    pub parallel: &'a Parallelism,
}

impl SvdInput<'_> {
    pub fn is_rank_deficient(&self) -> bool {
        self.round.columns.len() <= self.rank
    }
}

/// A randomized SVD back end.
pub trait SvdBackend: Send + Sync + std::fmt::Debug {
    fn variant(&self) -> SvdVariant;

    /// Factor `diag(shrink) · A`. `shrink` has one entry per action.
    fn run(
        &self,
        input: &SvdInput<'_>,
        shrink: &[f32],
        weights: &mut WeightStore,
    ) -> Result<LowRankBasis>;
}

/// Back end selected by `config.svd`.
pub fn backend_for(config: &LasConfig) -> Box<dyn SvdBackend> {
    match config.svd {
        SvdVariant::TwoPass => Box::new(TwoPassSvd),
        SvdVariant::Vanilla => Box::new(VanillaSvd),
        SvdVariant::OnePass => Box::new(OnePassSvd::new(config.one_pass_oversample)),
        SvdVariant::ModelWeight => Box::new(ModelWeightSvd::new(config.learner.scratch_offset)),
    }
}

/// Shared tail of the range finder.
///
/// `y` is the orthonormal feature-side sketch (F' × r) and `b = D·A·Y`
/// (K × r). A second Gaussian sketch orthonormalizes the range of `b`:
///
/// ```text
///   Z = orth(B · P),  C = Zᵀ · B = Uc · S · Vcᵀ
///   U = Z · Uc,  V = Y · Vc
/// ```
///
/// Components with a negligible singular value are dropped, so the
/// returned rank can be below `r` when `D·A` has lower rank.
pub(crate) fn finish_from_range(y: &DMatrix<f32>, b: &DMatrix<f32>, seed: u64) -> LowRankBasis {
    let r = b.ncols();
    let p = GaussianProjection::new(seed.wrapping_add(SECOND_SKETCH_SALT)).block(r, r);
    let z = orthonormal_basis(b * p);
    let c = z.transpose() * b;
    let svd = thin_svd(&c);
    let keep = svd.numerical_rank(NEGLIGIBLE_SINGULAR_VALUE);
    if keep == 0 {
        return LowRankBasis::empty();
    }
    let svd = svd.truncate(keep);
    LowRankBasis {
        u: &z * &svd.u,
        singular_values: svd.singular_values,
        v: y * &svd.v,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use las_common::{ActionBatch, Example, Namespace};

    use crate::features::RoundFeatures;

    /// Actions with dense features over `features` indices, built from a
    /// rank-`rank` generator so the shrunk matrix has exactly that rank.
    pub fn low_rank_round(actions: usize, features: usize, rank: usize) -> RoundFeatures {
        let coeff = |i: usize, r: usize| (((i * 7 + r * 3) % 11) as f32 - 5.0) / 5.0;
        let basis = |r: usize, f: usize| (((r * 13 + f * 5) % 9) as f32 - 4.0) / 4.0;
        let batch = ActionBatch::new(
            None,
            (0..actions)
                .map(|i| {
                    let feats = (0..features)
                        .map(|f| {
                            let v: f32 = (0..rank).map(|r| coeff(i, r) * basis(r, f)).sum();
                            (f as u64 + 1, v)
                        })
                        .collect();
                    Example::new(vec![Namespace::new("a", feats)])
                })
                .collect(),
        );
        RoundFeatures::build(&batch, vec![], u64::MAX)
    }
}
