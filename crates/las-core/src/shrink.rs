//! Per-action shrink factors.
//!
//! Under SquareCB, actions whose predicted cost is far above the best one are
//! shrunk before the factorization so the spanner prefers competitive actions:
//!
//! ```text
//!   shrink[a] = sqrt(1 + d + gamma / (4d) · (cost[a] - min_cost))
//! ```
//!
//! Epsilon-greedy exploration uses no shrinkage (all ones).

use crate::explore::ExplorationPolicy;

/// SquareCB shrink factors for `costs` at target rank `rank`.
pub fn compute_shrink_factors(costs: &[f32], rank: usize, gamma: f32) -> Vec<f32> {
    let min_cost = costs.iter().copied().fold(f32::INFINITY, f32::min);
    let d = rank.max(1) as f32;
    costs
        .iter()
        .map(|&cost| (1.0 + d + gamma / (4.0 * d) * (cost - min_cost)).sqrt())
        .collect()
}

/// Shrink factors for a round under `policy`.
pub fn shrink_factors(
    policy: &ExplorationPolicy,
    costs: &[f32],
    rank: usize,
    counter: u64,
) -> Vec<f32> {
    match policy {
        ExplorationPolicy::SquareCb { .. } => {
            compute_shrink_factors(costs, rank, policy.gamma(counter))
        }
        ExplorationPolicy::EpsilonGreedy { .. } => vec![1.0; costs.len()],
    }
}
