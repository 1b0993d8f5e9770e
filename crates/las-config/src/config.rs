//! Configuration types for large action space exploration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ── Variants ────────────────────────────────────────────────────────────

/// Randomized SVD back end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SvdVariant {
    /// Two passes over the batch with an implicit action matrix.
    #[default]
    TwoPass,
    /// Same algorithm over an explicitly built sparse action matrix.
    Vanilla,
    /// Single pass with a sparse Rademacher sketch.
    OnePass,
    /// Sketch stored in unused weight-store slots.
    ModelWeight,
}

impl std::fmt::Display for SvdVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SvdVariant::TwoPass => write!(f, "two_pass"),
            SvdVariant::Vanilla => write!(f, "vanilla"),
            SvdVariant::OnePass => write!(f, "one_pass"),
            SvdVariant::ModelWeight => write!(f, "model_weight"),
        }
    }
}

/// Spanner search algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SpannerVariant {
    /// Rank-one inverse/determinant updates.
    #[default]
    OneRank,
    /// Full determinant per candidate; reference implementation.
    FullDeterminant,
}

/// SIMD preference for the dot-product kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SimdHint {
    /// Always use the scalar kernel.
    Off,
    /// Use SIMD when the CPU supports it and the interactions allow it.
    #[default]
    Auto,
    /// Like `Auto`, but configured interactions the SIMD kernel cannot
    /// evaluate are a configuration error.
    Required,
}

// ── Exploration ─────────────────────────────────────────────────────────

/// Base exploration policy applied over the spanner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExplorationConfig {
    EpsilonGreedy {
        epsilon: f32,
    },
    /// SquareCB with `gamma = gamma_scale · rounds^gamma_exponent`.
    SquareCb {
        gamma_scale: f32,
        gamma_exponent: f32,
    },
}

impl ExplorationConfig {
    pub const DEFAULT_EPSILON: f32 = 0.05;
    pub const DEFAULT_GAMMA_SCALE: f32 = 10.0;
    pub const DEFAULT_GAMMA_EXPONENT: f32 = 0.5;

    pub fn epsilon_greedy() -> Self {
        ExplorationConfig::EpsilonGreedy {
            epsilon: Self::DEFAULT_EPSILON,
        }
    }

    pub fn square_cb() -> Self {
        ExplorationConfig::SquareCb {
            gamma_scale: Self::DEFAULT_GAMMA_SCALE,
            gamma_exponent: Self::DEFAULT_GAMMA_EXPONENT,
        }
    }

    pub fn is_square_cb(&self) -> bool {
        matches!(self, ExplorationConfig::SquareCb { .. })
    }
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self::epsilon_greedy()
    }
}

// ── Learner / weights ───────────────────────────────────────────────────

/// Weight store and base regressor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LearnerConfig {
    /// Feature hash space is `2^num_bits`.
    pub num_bits: u32,
    /// Each feature owns `2^stride_shift` consecutive weight slots.
    pub stride_shift: u32,
    pub learning_rate: f32,
    /// Use a hash-map weight store instead of a dense array.
    pub sparse_weights: bool,
    /// First weight slot (within a feature's stride) reserved for the
    /// model-weight SVD scratch columns. Slot 0 belongs to the regressor.
    pub scratch_offset: u32,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            num_bits: 18,
            stride_shift: 2,
            learning_rate: 0.5,
            sparse_weights: false,
            scratch_offset: 1,
        }
    }
}

impl LearnerConfig {
    pub fn stride(&self) -> u64 {
        1u64 << self.stride_shift
    }
}

// ── Top level ───────────────────────────────────────────────────────────

/// Complete large action space configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LasConfig {
    /// Enable spanner-restricted exploration.
    pub enabled: bool,
    /// Target rank `d`: the number of actions kept for exploration.
    pub max_actions: usize,
    /// Seed for every random projection.
    pub seed: u64,
    pub svd: SvdVariant,
    /// Extra sketch columns drawn by the one-pass back end.
    pub one_pass_oversample: usize,
    pub spanner: SpannerVariant,
    /// Approximation constant `c` of the barycentric spanner (`c > 1`).
    pub spanner_c: f32,
    pub simd: SimdHint,
    /// Worker threads for the SVD sweeps; 0 runs on the calling thread.
    pub thread_pool_size: usize,
    pub exploration: ExplorationConfig,
    /// Default interactions, e.g. `"ua"`, `"abc"`, `"user|item"`.
    pub interactions: Vec<String>,
    pub learner: LearnerConfig,
    /// Retain `U`, `S`, `V` and the explicit action matrix of the last round.
    pub diagnostics: bool,
}

impl Default for LasConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_actions: 20,
            seed: 0,
            svd: SvdVariant::default(),
            one_pass_oversample: 5,
            spanner: SpannerVariant::default(),
            spanner_c: 2.0,
            simd: SimdHint::default(),
            thread_pool_size: 0,
            exploration: ExplorationConfig::default(),
            interactions: Vec::new(),
            learner: LearnerConfig::default(),
            diagnostics: false,
        }
    }
}

impl LasConfig {
    /// Parse a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse a TOML configuration.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// JSON schema describing the configuration file.
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(LasConfig)
    }
}
