//! Large action space configuration loading and validation.
//!
//! This crate provides:
//! - Typed configuration structs with defaults
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation, run before any round is processed
//! - Config snapshots for run reports

pub mod config;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use config::{
    ExplorationConfig, LasConfig, LearnerConfig, SimdHint, SpannerVariant, SvdVariant,
};
pub use resolve::{load_config_file, resolve_config, ConfigSource, ResolveError, ResolvedConfig};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate, ValidationError, ValidationReport, MAX_DENSE_WEIGHT_BITS};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
