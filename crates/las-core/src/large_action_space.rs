//! Spanner-restricted exploration for large action sets.
//!
//! Each round factors the (shrunk) action-feature matrix, picks an
//! approximate barycentric spanner of its left singular vectors, and spreads
//! the base exploration policy over the spanner plus the greedy action.
//!
//! # Round
//!
//! ```text
//!   costs ─► shrink ─► SVD back end ─► U ─► spanner ─► member set ─► policy
//! ```
//!
//! # Fallback
//!
//! With `d ≥ K`, a disabled engine, or a degenerate round (no features, too
//! few features for rank `d`, no spanner), the base policy runs over every
//! action and the outcome carries a [`FallbackReason`].

use las_common::{ActionBatch, Error, Interaction, Result};
use las_config::{validate, LasConfig};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use tracing::{debug, info};

use crate::explore::{assemble, ActionScore, ExplorationPolicy};
use crate::features::RoundFeatures;
use crate::kernel::{DotProductKernel, KernelBackend};
use crate::matrix::ActionMatrix;
use crate::parallel::Parallelism;
use crate::shrink::shrink_factors;
use crate::spanner::{spanner_for, Spanner};
use crate::svd::{backend_for, SvdBackend, SvdInput};
use crate::weights::WeightStore;

// ── Outcome ─────────────────────────────────────────────────────────────

/// Why a round used the base policy over all actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    Disabled,
    /// `max_actions ≥` number of actions.
    WithinRank,
    /// No action has a non-zero feature.
    EmptyActionMatrix,
    /// Too few distinct features for the target rank.
    RankDeficient,
    /// The spanner selected no action.
    EmptySpanner,
}

/// Result of one round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundOutcome {
    /// One probability per action, in action order.
    pub probabilities: Vec<ActionScore>,
    /// Spanner actions, ascending. Empty on fallback.
    pub spanner: Vec<usize>,
    pub forced_greedy: bool,
    pub fallback: Option<FallbackReason>,
    pub kernel: KernelBackend,
}

/// Intermediate results of the last round, kept when diagnostics are on.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub u: DMatrix<f32>,
    pub singular_values: DVector<f32>,
    pub v: DMatrix<f32>,
    pub shrink: Vec<f32>,
    /// Explicit action matrix over compacted feature columns.
    pub action_matrix: DMatrix<f32>,
}

// ── Engine ──────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct LargeActionSpace {
    config: LasConfig,
    interactions: Vec<Interaction>,
    policy: ExplorationPolicy,
    backend: Box<dyn SvdBackend>,
    spanner: Box<dyn Spanner>,
    kernel: DotProductKernel,
    parallel: Parallelism,
    counter: u64,
    diagnostics: Option<Diagnostics>,
}

impl LargeActionSpace {
    /// Validate `config` and build the engine.
    pub fn new(config: LasConfig) -> Result<Self> {
        validate(&config)?;
        let interactions = Interaction::parse_all(&config.interactions)?;
        let kernel = DotProductKernel::new(config.simd);
        let parallel = Parallelism::new(config.thread_pool_size)?;
        info!(
            rank = config.max_actions,
            svd = %config.svd,
            kernel = %kernel.preferred(),
            threads = parallel.threads(),
            "large action space engine ready"
        );
        Ok(Self {
            policy: ExplorationPolicy::from(&config.exploration),
            backend: backend_for(&config),
            spanner: spanner_for(&config),
            interactions,
            kernel,
            parallel,
            counter: 1,
            diagnostics: None,
            config,
        })
    }

    pub fn config(&self) -> &LasConfig {
        &self.config
    }

    pub fn policy(&self) -> &ExplorationPolicy {
        &self.policy
    }

    /// Rounds learned so far, plus one.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn kernel(&self) -> &DotProductKernel {
        &self.kernel
    }

    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        self.diagnostics.as_ref()
    }

    /// Advance the SquareCB counter after a learned round.
    pub fn record_learn(&mut self) {
        self.counter += 1;
    }

    /// Interactions for `batch`: its own override, or the configured ones.
    pub fn interactions_for(&self, batch: &ActionBatch) -> Vec<Interaction> {
        batch
            .interactions
            .clone()
            .unwrap_or_else(|| self.interactions.clone())
    }

    /// Feature view of `batch` under the weight store's mask.
    pub fn round_features(&self, batch: &ActionBatch, weights: &WeightStore) -> RoundFeatures {
        RoundFeatures::build(batch, self.interactions_for(batch), weights.feature_mask())
    }

    /// Exploration distribution for `batch` given predicted `costs`.
    pub fn predict(
        &mut self,
        batch: &ActionBatch,
        costs: &[f32],
        weights: &mut WeightStore,
    ) -> Result<RoundOutcome> {
        batch.validate()?;
        let round = self.round_features(batch, weights);
        self.predict_round(&round, costs, weights)
    }

    /// Same as [`Self::predict`] for an already expanded round.
    pub fn predict_round(
        &mut self,
        round: &RoundFeatures,
        costs: &[f32],
        weights: &mut WeightStore,
    ) -> Result<RoundOutcome> {
        let k = round.action_count();
        if costs.len() != k {
            return Err(Error::ScoreMismatch {
                scores: costs.len(),
                actions: k,
            });
        }
        if k == 0 {
            return Err(Error::InvalidBatch("batch has no actions".to_string()));
        }
        if costs.iter().any(|c| !c.is_finite()) {
            return Err(Error::InvalidBatch("predicted costs must be finite".to_string()));
        }
        let kernel = self.kernel.for_interactions(&round.interactions);
        let d = self.config.max_actions;

        if !self.config.enabled {
            return Ok(self.fallback(costs, FallbackReason::Disabled, kernel));
        }
        if d >= k {
            return Ok(self.fallback(costs, FallbackReason::WithinRank, kernel));
        }
        if round.columns.is_empty() {
            return Ok(self.fallback(costs, FallbackReason::EmptyActionMatrix, kernel));
        }

        let shrink = shrink_factors(&self.policy, costs, d, self.counter);
        let input = SvdInput {
            round,
            rank: d,
            seed: self.config.seed,
            kernel,
            parallel: &self.parallel,
        };
        let basis = self.backend.run(&input, &shrink, weights)?;
        if basis.is_empty() {
            return Ok(self.fallback(costs, FallbackReason::RankDeficient, kernel));
        }
        assert_eq!(basis.u.nrows(), k, "U must have one row per action");
        if basis.u.iter().any(|v| !v.is_finite()) {
            return Err(Error::NumericalInstability(
                "non-finite entry in the left singular vectors".to_string(),
            ));
        }

        self.spanner.compute_spanner(&basis.u, d, &shrink);
        let membership = self.spanner.membership();
        let mut spanner: Vec<usize> = self.spanner.action_indices().to_vec();
        assert!(spanner.iter().all(|&a| a < k), "spanner index out of range");
        spanner.sort_unstable();

        if self.config.diagnostics {
            self.diagnostics = Some(Diagnostics {
                u: basis.u.clone(),
                singular_values: basis.singular_values.clone(),
                v: basis.v.clone(),
                shrink: shrink.clone(),
                action_matrix: ActionMatrix::build(round).to_dense(),
            });
        }

        if spanner.is_empty() {
            return Ok(self.fallback(costs, FallbackReason::EmptySpanner, kernel));
        }

        let assembled = assemble(&self.policy, costs, Some(membership), self.counter);
        debug!(
            actions = k,
            rank = d,
            basis_rank = basis.rank(),
            backend = %self.backend.variant(),
            kernel = %kernel,
            spanner = spanner.len(),
            forced_greedy = assembled.forced_greedy,
            "round assembled"
        );
        Ok(RoundOutcome {
            probabilities: assembled.probabilities,
            spanner,
            forced_greedy: assembled.forced_greedy,
            fallback: None,
            kernel,
        })
    }

    fn fallback(&self, costs: &[f32], reason: FallbackReason, kernel: KernelBackend) -> RoundOutcome {
        debug!(?reason, actions = costs.len(), "base policy over all actions");
        let assembled = assemble(&self.policy, costs, None, self.counter);
        RoundOutcome {
            probabilities: assembled.probabilities,
            spanner: Vec::new(),
            forced_greedy: false,
            fallback: Some(reason),
            kernel,
        }
    }
}
