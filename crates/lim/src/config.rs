//! Interpreter configuration, read from JSON.
//!
//! ```json
//! { "max_include_depth": 8, "instruction_budget": null, "memory_limit": 16777216 }
//! ```
//!
//! Every field is optional. `instruction_budget: null` disables the budget.

use lim_eval::session::{DEFAULT_INSTRUCTION_BUDGET, DEFAULT_MAX_INCLUDE_DEPTH};
use lim_eval::EngineOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Nested includes allowed below the top-level document.
    pub max_include_depth: usize,
    /// VM instructions per run; `None` disables the budget.
    pub instruction_budget: Option<u64>,
    /// Lua heap limit in bytes.
    pub memory_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            instruction_budget: Some(DEFAULT_INSTRUCTION_BUDGET),
            memory_limit: None,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        log::debug!("loaded config from {}: {config:?}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.instruction_budget == Some(0) {
            return Err(ConfigError::Invalid(
                "instruction_budget must be positive; use null to disable it".into(),
            ));
        }
        if self.memory_limit == Some(0) {
            return Err(ConfigError::Invalid("memory_limit must be positive".into()));
        }
        Ok(())
    }

    /// Limits handed to every evaluation session.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            instruction_budget: self.instruction_budget,
            memory_limit: self.memory_limit,
            max_include_depth: self.max_include_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.engine_options(), EngineOptions::default());
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_json(r#"{ "max_include_depth": 3, "instruction_budget": null }"#)
            .unwrap();
        assert_eq!(config.max_include_depth, 3);
        assert_eq!(config.instruction_budget, None);
        assert_eq!(config.memory_limit, None);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Config::from_json(r#"{ "max_depth": 3 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_zero_budget_rejected() {
        let err = Config::from_json(r#"{ "instruction_budget": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lim.json");
        std::fs::write(&path, r#"{ "memory_limit": 1048576 }"#).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.memory_limit, Some(1_048_576));

        let err = Config::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
