//! Learner facade: weight store, cost regressor and exploration engine.

use las_common::{ActionBatch, Result};
use las_config::LasConfig;
use serde::Serialize;
use tracing::trace;

use crate::features::RoundFeatures;
use crate::large_action_space::{LargeActionSpace, RoundOutcome};
use crate::learner::LinearScorer;
use crate::weights::WeightStore;

/// Predicted costs and the exploration distribution of one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub costs: Vec<f32>,
    #[serde(flatten)]
    pub outcome: RoundOutcome,
    /// Squared error of the labelled action before the update, when learned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss: Option<f32>,
}

#[derive(Debug)]
pub struct Workspace {
    weights: WeightStore,
    scorer: LinearScorer,
    engine: LargeActionSpace,
}

impl Workspace {
    pub fn new(config: LasConfig) -> Result<Self> {
        let weights = WeightStore::new(&config.learner);
        let scorer = LinearScorer::new(config.learner.learning_rate);
        let engine = LargeActionSpace::new(config)?;
        Ok(Self {
            weights,
            scorer,
            engine,
        })
    }

    pub fn engine(&self) -> &LargeActionSpace {
        &self.engine
    }

    pub fn weights(&self) -> &WeightStore {
        &self.weights
    }

    pub fn config(&self) -> &LasConfig {
        self.engine.config()
    }

    /// Score every action and build the exploration distribution.
    pub fn predict(&mut self, batch: &ActionBatch) -> Result<Prediction> {
        self.predict_expanded(batch).map(|(_, prediction)| prediction)
    }

    /// Predict, then update the regressor from the batch label (if any).
    pub fn learn(&mut self, batch: &ActionBatch) -> Result<Prediction> {
        let (round, mut prediction) = self.predict_expanded(batch)?;
        let Some(label) = batch.label else {
            return Ok(prediction);
        };
        let loss = self.scorer.learn(
            &round.actions[label.action],
            &round.interactions,
            &mut self.weights,
            &label,
        );
        self.engine.record_learn();
        trace!(action = label.action, cost = label.cost, loss, "learned");
        prediction.loss = Some(loss);
        Ok(prediction)
    }

    /// Expands `batch` once and predicts over that expansion.
    fn predict_expanded(&mut self, batch: &ActionBatch) -> Result<(RoundFeatures, Prediction)> {
        batch.validate()?;
        let round = self.engine.round_features(batch, &self.weights);
        let costs = self
            .scorer
            .predict(&round.actions, &round.interactions, &self.weights);
        let outcome = self.engine.predict_round(&round, &costs, &mut self.weights)?;
        let prediction = Prediction {
            costs,
            outcome,
            loss: None,
        };
        Ok((round, prediction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use las_common::{CbLabel, Example};

    fn batch() -> ActionBatch {
        ActionBatch::new(
            Some(Example::single("u", vec![(1000, 1.0)].into())),
            (0..6)
                .map(|i| Example::single("a", vec![(i * 2 + 1, 1.0), (i * 2 + 2, 0.5)].into()))
                .collect(),
        )
    }

    #[test]
    fn fresh_workspace_predicts_zero_costs() {
        let mut ws = Workspace::new(LasConfig {
            max_actions: 2,
            ..Default::default()
        })
        .unwrap();
        let p = ws.predict(&batch()).unwrap();
        assert_eq!(p.costs, vec![0.0; 6]);
        assert_eq!(p.outcome.probabilities.len(), 6);
    }

    #[test]
    fn learning_moves_costs_and_counter() {
        let mut ws = Workspace::new(LasConfig {
            max_actions: 2,
            ..Default::default()
        })
        .unwrap();
        let labelled = batch().with_label(CbLabel {
            action: 3,
            cost: 1.0,
            probability: 0.5,
        });
        let p = ws.learn(&labelled).unwrap();
        assert!(p.loss.is_some());
        assert_eq!(ws.engine().counter(), 2);
        let after = ws.predict(&batch()).unwrap();
        assert!(after.costs[3] > 0.5);
        // the shared feature moves every action's cost
        assert!(after.costs[0] > 0.0);
    }

    #[test]
    fn unlabelled_learn_does_not_advance() {
        let mut ws = Workspace::new(LasConfig::default()).unwrap();
        let p = ws.learn(&batch()).unwrap();
        assert!(p.loss.is_none());
        assert_eq!(ws.engine().counter(), 1);
    }

    #[test]
    fn learn_loss_uses_the_predicted_cost() {
        let mut ws = Workspace::new(LasConfig {
            max_actions: 2,
            ..Default::default()
        })
        .unwrap();
        let label = CbLabel {
            action: 2,
            cost: 0.8,
            probability: 0.25,
        };
        ws.learn(&batch().with_label(label)).unwrap();

        let labelled = batch().with_label(label);
        let before = ws.predict(&labelled).unwrap();
        let learned = ws.learn(&labelled).unwrap();
        assert_eq!(learned.costs, before.costs);
        let expected = (label.cost - learned.costs[2]).powi(2);
        let loss = learned.loss.unwrap();
        assert!((loss - expected).abs() < 1e-6, "{loss} vs {expected}");
    }
}
