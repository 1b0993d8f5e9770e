//! Per-round action batches.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::features::Example;
use crate::interaction::Interaction;

/// Contextual-bandit label for the action that was played.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CbLabel {
    /// Index of the played action within the batch.
    pub action: usize,
    /// Observed cost (lower is better).
    pub cost: f32,
    /// Probability with which the logging policy played the action.
    pub probability: f32,
}

/// One decision round: an optional shared context and K actions.
///
/// The shared context is merged into every action's features but is never
/// a row of the action matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionBatch {
    #[serde(default)]
    pub shared: Option<Example>,
    pub actions: Vec<Example>,
    /// Overrides the configured interactions for this round.
    #[serde(default)]
    pub interactions: Option<Vec<Interaction>>,
    #[serde(default)]
    pub label: Option<CbLabel>,
}

impl ActionBatch {
    pub fn new(shared: Option<Example>, actions: Vec<Example>) -> Self {
        Self {
            shared,
            actions,
            interactions: None,
            label: None,
        }
    }

    pub fn with_label(mut self, label: CbLabel) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_interactions(mut self, interactions: Vec<Interaction>) -> Self {
        self.interactions = Some(interactions);
        self
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Structural checks performed before a round runs.
    pub fn validate(&self) -> Result<()> {
        if self.actions.is_empty() {
            return Err(Error::InvalidBatch("batch has no actions".to_string()));
        }
        if let Some(label) = &self.label {
            if label.action >= self.actions.len() {
                return Err(Error::LabelOutOfRange {
                    action: label.action,
                    actions: self.actions.len(),
                });
            }
            if !(label.probability > 0.0 && label.probability <= 1.0) {
                return Err(Error::InvalidBatch(format!(
                    "label probability must be in (0, 1], got {}",
                    label.probability
                )));
            }
            if !label.cost.is_finite() {
                return Err(Error::InvalidBatch("label cost is not finite".to_string()));
            }
        }
        let non_finite = self
            .shared
            .iter()
            .chain(self.actions.iter())
            .flat_map(|ex| ex.namespaces.iter())
            .flat_map(|ns| ns.features.values.iter())
            .any(|v| !v.is_finite());
        if non_finite {
            return Err(Error::InvalidBatch(
                "feature values must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
