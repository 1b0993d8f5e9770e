//! Large action space exploration for contextual bandits.
//!
//! When the number of actions `K` is much larger than the target rank `d`,
//! exploration is restricted to an approximate barycentric spanner of the
//! actions' feature representations plus the greedy action:
//!
//! - [`features`] / [`matrix`]: per-round feature expansion and the sparse
//!   action-feature matrix
//! - [`kernel`]: scalar and SIMD dot-product kernels against the Gaussian
//!   projection
//! - [`svd`]: randomized SVD back ends (two-pass, vanilla, one-pass,
//!   model-weight)
//! - [`shrink`], [`spanner`], [`explore`]: shrink factors, spanner search and
//!   the final exploration distribution
//! - [`large_action_space`]: the per-round engine
//! - [`workspace`]: engine plus a linear cost regressor and its weight store

pub mod exit_codes;
pub mod explore;
pub mod features;
pub mod kernel;
pub mod large_action_space;
pub mod learner;
pub mod matrix;
pub mod parallel;
pub mod shrink;
pub mod simulate;
pub mod spanner;
pub mod svd;
pub mod weights;
pub mod workspace;

pub use exit_codes::ExitCode;
pub use explore::{assemble, greedy_action, ActionScore, ExplorationPolicy};
pub use features::{ActionFeatures, FeatureColumns, RoundFeatures};
pub use kernel::{
    compute_dot_prod, compute_dot_prod_scalar, compute_dot_prod_simd, DotProductKernel,
    KernelBackend,
};
pub use large_action_space::{Diagnostics, FallbackReason, LargeActionSpace, RoundOutcome};
pub use learner::LinearScorer;
pub use matrix::ActionMatrix;
pub use parallel::Parallelism;
pub use shrink::{compute_shrink_factors, shrink_factors};
pub use spanner::{DeterminantSpanner, OneRankSpanner, Spanner};
pub use svd::{LowRankBasis, SvdBackend, SvdInput};
pub use weights::WeightStore;
pub use workspace::{Prediction, Workspace};
