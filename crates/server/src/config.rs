//! Engine configuration, loaded from YAML.
//!
//! Every field has a default, so an empty document (or no file at all) is a
//! valid configuration.
//!
//! ```yaml
//! ranking:
//!   url: http://localhost:5000
//!   recommend_timeout_ms: 3000
//!   training_timeout_ms: 30000
//!   train_before_recommend: true
//! fallback:
//!   oversample_factor: 2
//!   recent_similarity: false
//!   recent_window: 3
//! session:
//!   ttl_seconds: 1800
//! default_count: 16
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ranking: RankingConfig,
    pub fallback: FallbackConfig,
    pub session: SessionConfig,
    pub default_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub url: String,
    pub recommend_timeout_ms: u64,
    pub training_timeout_ms: u64,
    /// Refit the model in the background before each warm-start request
    pub train_before_recommend: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub oversample_factor: usize,
    pub recent_similarity: bool,
    pub recent_window: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle time after which a user's session entry is dropped
    pub ttl_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ranking: RankingConfig::default(),
            fallback: FallbackConfig::default(),
            session: SessionConfig::default(),
            default_count: 16,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000".to_string(),
            recommend_timeout_ms: 3000,
            training_timeout_ms: 30000,
            train_before_recommend: true,
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            oversample_factor: 2,
            recent_similarity: false,
            recent_window: 3,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_seconds: 1800 }
    }
}

impl RankingConfig {
    pub fn recommend_timeout(&self) -> Duration {
        Duration::from_millis(self.recommend_timeout_ms)
    }

    pub fn training_timeout(&self) -> Duration {
        Duration::from_millis(self.training_timeout_ms)
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str, origin: &Path) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml, path)
    }

    /// Defaults when `path` is `None` or names a file that does not exist
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => Self::from_yaml_file(path),
            _ => Ok(Self::default()),
        }
    }
}
