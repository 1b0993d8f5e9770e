//! Synthetic rounds with a hidden linear cost model.
//!
//! Every feature id carries a hidden cost in `[0, 1)`; an action's true cost
//! is the mean hidden cost of its features. Each round the workspace
//! predicts, one action is sampled from its distribution, and the observed
//! cost is fed back as a label.

use las_common::{ActionBatch, CbLabel, Example, FeatureSpace, Namespace, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

use crate::explore::ActionScore;
use crate::workspace::{Prediction, Workspace};

const SHARED_FEATURES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationParams {
    pub rounds: usize,
    pub actions: usize,
    /// Features per action.
    pub features: usize,
    pub seed: u64,
}

/// Summary of a simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub rounds: usize,
    pub mean_cost: f32,
    /// Mean cost over the last quarter of the rounds.
    pub recent_mean_cost: f32,
    pub fallback_rounds: usize,
    pub last: Option<Prediction>,
}

#[derive(Debug)]
pub struct Simulator {
    params: SimulationParams,
    rng: StdRng,
    hidden: Vec<f32>,
}

impl Simulator {
    pub fn new(params: SimulationParams) -> Self {
        let mut rng = StdRng::seed_from_u64(params.seed);
        let pool = (params.actions * params.features).max(1) * 2;
        let hidden = (0..pool).map(|_| rng.random::<f32>()).collect();
        Self {
            params,
            rng,
            hidden,
        }
    }

    pub fn params(&self) -> SimulationParams {
        self.params
    }

    /// A fresh batch: a shared context plus `actions` random feature sets.
    pub fn next_batch(&mut self) -> ActionBatch {
        let pool = self.hidden.len() as u64;
        let shared: FeatureSpace = (0..SHARED_FEATURES)
            .map(|_| (pool + self.rng.random_range(0..64u64), 1.0))
            .collect();
        let actions = (0..self.params.actions)
            .map(|_| {
                let features: FeatureSpace = (0..self.params.features)
                    .map(|_| (self.rng.random_range(0..pool), 1.0))
                    .collect();
                Example::new(vec![Namespace::new("a", features)])
            })
            .collect();
        ActionBatch::new(Some(Example::single("u", shared)), actions)
    }

    /// True cost of `action` in `batch`.
    pub fn cost(&self, batch: &ActionBatch, action: usize) -> f32 {
        let features = &batch.actions[action];
        let mut sum = 0.0;
        let mut count = 0;
        for ns in &features.namespaces {
            for (index, _) in ns.features.iter() {
                if let Some(h) = self.hidden.get(index as usize) {
                    sum += h;
                    count += 1;
                }
            }
        }
        if count == 0 {
            0.5
        } else {
            sum / count as f32
        }
    }

    /// Draw an action from a distribution given in action order.
    pub fn sample(&mut self, probabilities: &[ActionScore]) -> (usize, f32) {
        let draw: f32 = self.rng.random();
        let mut cumulative = 0.0;
        for p in probabilities {
            cumulative += p.score;
            if draw < cumulative && p.score > 0.0 {
                return (p.action, p.score);
            }
        }
        probabilities
            .iter()
            .rev()
            .find(|p| p.score > 0.0)
            .map_or((0, 1.0), |p| (p.action, p.score))
    }

    /// Run every round against `workspace`.
    pub fn run(&mut self, workspace: &mut Workspace) -> Result<SimulationReport> {
        let rounds = self.params.rounds;
        let recent_start = rounds - rounds / 4;
        let mut total = 0.0f32;
        let mut recent = 0.0f32;
        let mut fallback_rounds = 0;
        let mut last = None;

        for round in 0..rounds {
            let batch = self.next_batch();
            let prediction = workspace.predict(&batch)?;
            if prediction.outcome.fallback.is_some() {
                fallback_rounds += 1;
            }
            let (action, probability) = self.sample(&prediction.outcome.probabilities);
            let cost = self.cost(&batch, action);
            total += cost;
            if round >= recent_start {
                recent += cost;
            }
            let labelled = batch.with_label(CbLabel {
                action,
                cost,
                probability,
            });
            last = Some(workspace.learn(&labelled)?);
            debug!(round, action, cost, "simulated round");
        }

        let recent_rounds = rounds - recent_start;
        Ok(SimulationReport {
            rounds,
            mean_cost: if rounds == 0 { 0.0 } else { total / rounds as f32 },
            recent_mean_cost: if recent_rounds == 0 {
                0.0
            } else {
                recent / recent_rounds as f32
            },
            fallback_rounds,
            last,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use las_config::LasConfig;

    fn params() -> SimulationParams {
        SimulationParams {
            rounds: 8,
            actions: 12,
            features: 4,
            seed: 11,
        }
    }

    #[test]
    fn batches_are_reproducible() {
        let a = Simulator::new(params()).next_batch();
        let b = Simulator::new(params()).next_batch();
        assert_eq!(a, b);
        assert_eq!(a.action_count(), 12);
    }

    #[test]
    fn costs_are_in_unit_interval() {
        let mut sim = Simulator::new(params());
        let batch = sim.next_batch();
        for a in 0..batch.action_count() {
            let c = sim.cost(&batch, a);
            assert!((0.0..1.0).contains(&c));
        }
    }

    #[test]
    fn sample_respects_zero_mass() {
        let mut sim = Simulator::new(params());
        let probs = vec![
            ActionScore { action: 0, score: 0.0 },
            ActionScore { action: 1, score: 1.0 },
            ActionScore { action: 2, score: 0.0 },
        ];
        for _ in 0..20 {
            assert_eq!(sim.sample(&probs), (1, 1.0));
        }
    }

    #[test]
    fn run_learns_every_round() {
        let mut sim = Simulator::new(params());
        let mut ws = Workspace::new(LasConfig {
            max_actions: 3,
            ..Default::default()
        })
        .unwrap();
        let report = sim.run(&mut ws).unwrap();
        assert_eq!(report.rounds, 8);
        assert_eq!(ws.engine().counter(), 9);
        assert!(report.last.is_some());
    }
}
