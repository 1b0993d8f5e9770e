//! Configuration resolution.
//!
//! Precedence, highest first:
//! 1. An explicit path (`--config`)
//! 2. The `LAS_CONFIG` environment variable
//! 3. `$XDG_CONFIG_HOME/large_action_space/config.json` (or `config.toml`)
//! 4. Built-in defaults
//!
//! The resolved configuration is always validated before it is returned.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::config::LasConfig;
use crate::validate::{validate, ValidationReport};

/// Environment variable naming a configuration file.
pub const CONFIG_ENV_VAR: &str = "LAS_CONFIG";

/// Directory name under the user config dir.
pub const CONFIG_DIR_NAME: &str = "large_action_space";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse TOML config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationReport),
}

impl From<ResolveError> for las_common::Error {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Io { source, .. } => las_common::Error::Io(source),
            other => las_common::Error::Config(other.to_string()),
        }
    }
}

/// Where the resolved configuration came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum ConfigSource {
    Explicit(PathBuf),
    Env(PathBuf),
    Xdg(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Explicit(p) => write!(f, "explicit:{}", p.display()),
            ConfigSource::Env(p) => write!(f, "env:{}", p.display()),
            ConfigSource::Xdg(p) => write!(f, "xdg:{}", p.display()),
            ConfigSource::Defaults => write!(f, "defaults"),
        }
    }
}

/// A validated configuration and its origin.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: LasConfig,
    pub source: ConfigSource,
}

/// Load a configuration file; `.toml` files are parsed as TOML, anything
/// else as JSON. The result is not validated.
pub fn load_config_file(path: &Path) -> Result<LasConfig, ResolveError> {
    let text = std::fs::read_to_string(path).map_err(|source| ResolveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
    if is_toml {
        LasConfig::from_toml(&text).map_err(|source| ResolveError::Toml {
            path: path.to_path_buf(),
            source,
        })
    } else {
        LasConfig::from_json(&text).map_err(|source| ResolveError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolve the configuration from the process environment.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ResolvedConfig, ResolveError> {
    let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
    let config_dir = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME));
    resolve_config_with(explicit, env_path.as_deref(), config_dir.as_deref())
}

/// Resolution with every input passed explicitly.
pub fn resolve_config_with(
    explicit: Option<&Path>,
    env_path: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<ResolvedConfig, ResolveError> {
    let (config, source) = if let Some(path) = explicit {
        (load_config_file(path)?, ConfigSource::Explicit(path.to_path_buf()))
    } else if let Some(path) = env_path.filter(|p| !p.as_os_str().is_empty()) {
        (load_config_file(path)?, ConfigSource::Env(path.to_path_buf()))
    } else if let Some(path) = config_dir.and_then(find_in_dir) {
        (load_config_file(&path)?, ConfigSource::Xdg(path))
    } else {
        (LasConfig::default(), ConfigSource::Defaults)
    };
    validate(&config)?;
    Ok(ResolvedConfig { config, source })
}

fn find_in_dir(dir: &Path) -> Option<PathBuf> {
    ["config.json", "config.toml"]
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_when_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_config_with(None, None, Some(dir.path())).unwrap();
        assert_eq!(resolved.source, ConfigSource::Defaults);
        assert_eq!(resolved.config, LasConfig::default());
    }

    #[test]
    fn explicit_beats_env_and_xdg() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("explicit.json");
        let env = dir.path().join("env.json");
        fs::write(&explicit, r#"{"max_actions": 3}"#).unwrap();
        fs::write(&env, r#"{"max_actions": 4}"#).unwrap();
        fs::write(dir.path().join("config.json"), r#"{"max_actions": 5}"#).unwrap();

        let resolved =
            resolve_config_with(Some(&explicit), Some(&env), Some(dir.path())).unwrap();
        assert_eq!(resolved.config.max_actions, 3);

        let resolved = resolve_config_with(None, Some(&env), Some(dir.path())).unwrap();
        assert_eq!(resolved.config.max_actions, 4);
        assert!(matches!(resolved.source, ConfigSource::Env(_)));

        let resolved = resolve_config_with(None, None, Some(dir.path())).unwrap();
        assert_eq!(resolved.config.max_actions, 5);
        assert!(matches!(resolved.source, ConfigSource::Xdg(_)));
    }

    #[test]
    fn toml_file_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("las.toml");
        fs::write(&path, "max_actions = 7\nseed = 11\n").unwrap();
        let cfg = load_config_file(&path).unwrap();
        assert_eq!(cfg.max_actions, 7);
        assert_eq!(cfg.seed, 11);
    }

    #[test]
    fn invalid_config_fails_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"max_actions": 0}"#).unwrap();
        let err = resolve_config_with(Some(&path), None, None).unwrap_err();
        assert!(matches!(err, ResolveError::Invalid(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config_file(Path::new("/nonexistent/las.json")).unwrap_err();
        assert!(matches!(err, ResolveError::Io { .. }));
    }

    #[test]
    fn malformed_json_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ResolveError::Json { .. }));
    }
}
