//! Large action space common types and errors.
//!
//! This crate provides foundational types shared across the exploration crates:
//! - Sparse feature storage and namespaces
//! - Namespace interaction specifications
//! - Per-round action batches and contextual-bandit labels
//! - The unified error type

pub mod batch;
pub mod error;
pub mod features;
pub mod interaction;
pub mod schema;

pub use batch::{ActionBatch, CbLabel};
pub use error::{Error, Result};
pub use features::{Example, FeatureSpace, Namespace};
pub use interaction::{Interaction, InteractionParseError};
pub use schema::SCHEMA_VERSION;
