//! Exploration distributions over a candidate set.
//!
//! Costs are predicted costs: lower is better, and the greedy action is the
//! first action with the minimum cost.

use las_config::ExplorationConfig;
use serde::{Deserialize, Serialize};

/// Probability (or score) attached to one action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionScore {
    pub action: usize,
    pub score: f32,
}

/// Base policy applied to the candidate set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExplorationPolicy {
    EpsilonGreedy { epsilon: f32 },
    SquareCb { gamma_scale: f32, gamma_exponent: f32 },
}

impl From<&ExplorationConfig> for ExplorationPolicy {
    fn from(config: &ExplorationConfig) -> Self {
        match *config {
            ExplorationConfig::EpsilonGreedy { epsilon } => {
                ExplorationPolicy::EpsilonGreedy { epsilon }
            }
            ExplorationConfig::SquareCb {
                gamma_scale,
                gamma_exponent,
            } => ExplorationPolicy::SquareCb {
                gamma_scale,
                gamma_exponent,
            },
        }
    }
}

impl ExplorationPolicy {
    /// SquareCB learning-rate `gamma_scale · counter^gamma_exponent`; zero for
    /// epsilon-greedy.
    pub fn gamma(&self, counter: u64) -> f32 {
        match *self {
            ExplorationPolicy::SquareCb {
                gamma_scale,
                gamma_exponent,
            } => gamma_scale * (counter as f32).powf(gamma_exponent),
            ExplorationPolicy::EpsilonGreedy { .. } => 0.0,
        }
    }

    /// Probabilities over `members` (indices into `costs`), in member order.
    pub fn member_probabilities(&self, costs: &[f32], members: &[usize], counter: u64) -> Vec<f32> {
        let m = members.len();
        if m == 0 {
            return Vec::new();
        }
        let greedy = greedy_member(costs, members);
        match *self {
            ExplorationPolicy::EpsilonGreedy { epsilon } => {
                let share = epsilon / m as f32;
                (0..m)
                    .map(|pos| if pos == greedy { 1.0 - epsilon + share } else { share })
                    .collect()
            }
            ExplorationPolicy::SquareCb { .. } => {
                let gamma = self.gamma(counter);
                let min_cost = costs[members[greedy]];
                let mut probs: Vec<f32> = members
                    .iter()
                    .enumerate()
                    .map(|(pos, &a)| {
                        if pos == greedy {
                            0.0
                        } else {
                            1.0 / (m as f32 + gamma * (costs[a] - min_cost))
                        }
                    })
                    .collect();
                let rest: f32 = probs.iter().sum();
                probs[greedy] = (1.0 - rest).max(0.0);
                probs
            }
        }
    }
}

/// First action with the minimum cost.
pub fn greedy_action(costs: &[f32]) -> usize {
    let mut best = 0;
    for (a, &cost) in costs.iter().enumerate() {
        if cost < costs[best] {
            best = a;
        }
    }
    best
}

fn greedy_member(costs: &[f32], members: &[usize]) -> usize {
    let mut best = 0;
    for (pos, &a) in members.iter().enumerate() {
        if costs[a] < costs[members[best]] {
            best = pos;
        }
    }
    best
}

// ── Assembly ────────────────────────────────────────────────────────────

/// Final distribution of a round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assembled {
    /// One entry per action, in action order.
    pub probabilities: Vec<ActionScore>,
    /// Actions that may receive probability, ascending.
    pub members: Vec<usize>,
    /// The greedy action was added to a spanner that did not contain it.
    pub forced_greedy: bool,
}

/// Restrict `policy` to the spanner plus the greedy action. `None` means the
/// whole action set is eligible.
pub fn assemble(
    policy: &ExplorationPolicy,
    costs: &[f32],
    spanner: Option<&[bool]>,
    counter: u64,
) -> Assembled {
    let k = costs.len();
    let greedy = greedy_action(costs);
    let (members, forced_greedy) = match spanner {
        Some(in_spanner) => {
            let mut members: Vec<usize> = (0..k).filter(|&a| in_spanner[a]).collect();
            let forced = !in_spanner[greedy];
            if forced {
                members.push(greedy);
                members.sort_unstable();
            }
            (members, forced)
        }
        None => ((0..k).collect(), false),
    };

    let member_probs = policy.member_probabilities(costs, &members, counter);
    let mut probabilities: Vec<ActionScore> = (0..k)
        .map(|action| ActionScore { action, score: 0.0 })
        .collect();
    for (&a, &p) in members.iter().zip(&member_probs) {
        probabilities[a].score = p;
    }
    Assembled {
        probabilities,
        members,
        forced_greedy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(probs: &[ActionScore]) -> f32 {
        probs.iter().map(|p| p.score).sum()
    }

    #[test]
    fn greedy_prefers_first_minimum() {
        assert_eq!(greedy_action(&[0.3, 0.1, 0.1, 0.5]), 1);
        assert_eq!(greedy_action(&[0.0, 0.0]), 0);
    }

    #[test]
    fn epsilon_greedy_over_members() {
        let policy = ExplorationPolicy::EpsilonGreedy { epsilon: 0.3 };
        let probs = policy.member_probabilities(&[0.5, 0.1, 0.9], &[0, 1, 2], 1);
        assert!((probs[1] - 0.8).abs() < 1e-6);
        assert!((probs[0] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn square_cb_gives_gap_based_mass() {
        let policy = ExplorationPolicy::SquareCb {
            gamma_scale: 4.0,
            gamma_exponent: 0.0,
        };
        let probs = policy.member_probabilities(&[0.0, 0.5, 1.0], &[0, 1, 2], 10);
        assert!((probs[1] - 1.0 / 5.0).abs() < 1e-6);
        assert!((probs[2] - 1.0 / 7.0).abs() < 1e-6);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn gamma_grows_with_counter() {
        let policy = ExplorationPolicy::SquareCb {
            gamma_scale: 10.0,
            gamma_exponent: 0.5,
        };
        assert!((policy.gamma(1) - 10.0).abs() < 1e-6);
        assert!((policy.gamma(4) - 20.0).abs() < 1e-5);
    }

    #[test]
    fn assemble_adds_greedy_outside_spanner() {
        let policy = ExplorationPolicy::EpsilonGreedy { epsilon: 0.2 };
        let costs = [0.9, 0.0, 0.5, 0.7];
        let spanner = [true, false, true, false];
        let out = assemble(&policy, &costs, Some(&spanner), 1);
        assert!(out.forced_greedy);
        assert_eq!(out.members, vec![0, 1, 2]);
        assert_eq!(out.probabilities[3].score, 0.0);
        assert!(out.probabilities[1].score > out.probabilities[0].score);
        assert!((total(&out.probabilities) - 1.0).abs() < 1e-6);
        for (i, p) in out.probabilities.iter().enumerate() {
            assert_eq!(p.action, i);
        }
    }

    #[test]
    fn assemble_without_spanner_covers_all_actions() {
        let policy = ExplorationPolicy::EpsilonGreedy { epsilon: 0.4 };
        let out = assemble(&policy, &[0.2, 0.1], None, 1);
        assert!(!out.forced_greedy);
        assert!((out.probabilities[1].score - 0.8).abs() < 1e-6);
        assert!((out.probabilities[0].score - 0.2).abs() < 1e-6);
    }
}
