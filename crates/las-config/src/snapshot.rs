//! Config snapshots attached to run reports.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::LasConfig;
use crate::resolve::ResolvedConfig;

/// The configuration a run used, with a content hash.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    pub source: String,
    /// SHA-256 of the canonical JSON encoding of `config`.
    pub hash: String,
    pub config: LasConfig,
}

impl ConfigSnapshot {
    pub fn capture(resolved: &ResolvedConfig) -> Self {
        Self {
            source: resolved.source.to_string(),
            hash: config_hash(&resolved.config),
            config: resolved.config.clone(),
        }
    }
}

/// Hash of the canonical JSON encoding of a configuration.
pub fn config_hash(config: &LasConfig) -> String {
    // Struct fields serialize in declaration order, so the encoding is stable.
    let json = serde_json::to_string(config).unwrap_or_default();
    hex::encode(Sha256::digest(json.as_bytes()))
}
