//! Semantic validation of a [`LasConfig`].
//!
//! Every problem is collected so a single run reports all of them.

use las_common::Interaction;

use crate::config::{ExplorationConfig, LasConfig, SimdHint, SvdVariant};

/// Upper bound on `num_bits + stride_shift` for the dense weight store,
/// which allocates `2^(num_bits + stride_shift)` floats up front.
pub const MAX_DENSE_WEIGHT_BITS: u32 = 30;

/// One configuration problem.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All problems found in a configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid configuration: {}", join_errors(.errors))]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationReport {
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl From<ValidationReport> for las_common::Error {
    fn from(report: ValidationReport) -> Self {
        las_common::Error::Config(join_errors(&report.errors))
    }
}

/// Validate a configuration.
pub fn validate(config: &LasConfig) -> Result<(), ValidationReport> {
    let mut errors = Vec::new();

    if config.max_actions == 0 {
        errors.push(ValidationError::new("max_actions", "must be at least 1"));
    }
    if !config.spanner_c.is_finite() || config.spanner_c <= 1.0 {
        errors.push(ValidationError::new(
            "spanner_c",
            format!("must be a finite value above 1, got {}", config.spanner_c),
        ));
    }

    match config.exploration {
        ExplorationConfig::EpsilonGreedy { epsilon } => {
            if !(0.0..=1.0).contains(&epsilon) {
                errors.push(ValidationError::new(
                    "exploration.epsilon",
                    format!("must be in [0, 1], got {epsilon}"),
                ));
            }
        }
        ExplorationConfig::SquareCb {
            gamma_scale,
            gamma_exponent,
        } => {
            if !gamma_scale.is_finite() || gamma_scale < 0.0 {
                errors.push(ValidationError::new(
                    "exploration.gamma_scale",
                    format!("must be finite and non-negative, got {gamma_scale}"),
                ));
            }
            if !gamma_exponent.is_finite() || gamma_exponent < 0.0 {
                errors.push(ValidationError::new(
                    "exploration.gamma_exponent",
                    format!("must be finite and non-negative, got {gamma_exponent}"),
                ));
            }
        }
    }

    match Interaction::parse_all(&config.interactions) {
        Ok(interactions) => {
            if config.simd == SimdHint::Required {
                if let Some(bad) = interactions.iter().find(|i| i.as_quadratic().is_none()) {
                    errors.push(ValidationError::new(
                        "interactions",
                        format!("SIMD kernel cannot evaluate interaction {bad:?}"),
                    ));
                }
            }
        }
        Err(err) => errors.push(ValidationError::new("interactions", err.to_string())),
    }

    let learner = &config.learner;
    if !(1..=30).contains(&learner.num_bits) {
        errors.push(ValidationError::new(
            "learner.num_bits",
            format!("must be in 1..=30, got {}", learner.num_bits),
        ));
    }
    if learner.stride_shift > 16 {
        errors.push(ValidationError::new(
            "learner.stride_shift",
            format!("must be at most 16, got {}", learner.stride_shift),
        ));
    }
    let weight_bits = learner.num_bits.saturating_add(learner.stride_shift);
    if !learner.sparse_weights && weight_bits > MAX_DENSE_WEIGHT_BITS {
        errors.push(ValidationError::new(
            "learner.num_bits",
            format!(
                "num_bits + stride_shift must be at most {MAX_DENSE_WEIGHT_BITS} for dense weights, got {weight_bits}"
            ),
        ));
    }
    if !learner.learning_rate.is_finite() || learner.learning_rate <= 0.0 {
        errors.push(ValidationError::new(
            "learner.learning_rate",
            format!("must be positive, got {}", learner.learning_rate),
        ));
    }
    if config.svd == SvdVariant::ModelWeight {
        if learner.scratch_offset == 0 {
            errors.push(ValidationError::new(
                "learner.scratch_offset",
                "slot 0 belongs to the regressor",
            ));
        }
        let needed = u64::from(learner.scratch_offset) + config.max_actions as u64;
        if learner.stride_shift <= 16 && needed > learner.stride() {
            errors.push(ValidationError::new(
                "learner.stride_shift",
                format!(
                    "model_weight needs {needed} slots per feature but the stride holds {}",
                    learner.stride()
                ),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationReport { errors })
    }
}
