//! Linear cost regressor over weight slot 0.
//!
//! Updates are importance weighted by the logged probability of the played
//! action and normalized by the squared feature norm:
//!
//! ```text
//!   w += min(lr / p, 1) · (cost - predicted) · x / |x|²
//! ```

use las_common::{CbLabel, Interaction};

use crate::features::{for_each_feature, ActionFeatures};
use crate::weights::WeightStore;

const REGRESSOR_SLOT: u32 = 0;

#[derive(Debug, Clone, Copy)]
pub struct LinearScorer {
    learning_rate: f32,
}

impl LinearScorer {
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }

    pub fn predict_one(
        &self,
        action: &ActionFeatures,
        interactions: &[Interaction],
        weights: &WeightStore,
    ) -> f32 {
        let mut sum = 0.0;
        for_each_feature(action, interactions, |index, value| {
            sum += value * weights.get(index, REGRESSOR_SLOT);
        });
        sum
    }

    /// Predicted cost of every action.
    pub fn predict(
        &self,
        actions: &[ActionFeatures],
        interactions: &[Interaction],
        weights: &WeightStore,
    ) -> Vec<f32> {
        actions
            .iter()
            .map(|a| self.predict_one(a, interactions, weights))
            .collect()
    }

    /// One update toward the observed cost of the played action. Returns the
    /// squared error before the update.
    pub fn learn(
        &self,
        action: &ActionFeatures,
        interactions: &[Interaction],
        weights: &mut WeightStore,
        label: &CbLabel,
    ) -> f32 {
        let predicted = self.predict_one(action, interactions, weights);
        let error = label.cost - predicted;
        let mut norm = 0.0f32;
        for_each_feature(action, interactions, |_, value| norm += value * value);
        if norm == 0.0 {
            return error * error;
        }
        let step = (self.learning_rate / label.probability).min(1.0) * error / norm;
        for_each_feature(action, interactions, |index, value| {
            weights.add(index, REGRESSOR_SLOT, step * value);
        });
        error * error
    }
}
