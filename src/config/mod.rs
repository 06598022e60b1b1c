use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{ReformaError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Highlight storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Annotation engine configuration
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the JSON file holding every page bucket
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> String {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reforma")
        .join("highlights.json")
        .to_string_lossy()
        .to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Delay before the first reconciliation pass, in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Longest selection (in characters) that can become a highlight
    #[serde(default = "default_max_anchor_len")]
    pub max_anchor_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            max_anchor_len: default_max_anchor_len(),
        }
    }
}

fn default_settle_delay_ms() -> u64 {
    500
}

fn default_max_anchor_len() -> usize {
    10_000
}

impl Config {
    /// Load configuration from all sources (file, env, defaults)
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration with an explicit config file location
    pub fn load_from(config_path: &std::path::Path) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            // REFORMA_STORAGE_PATH, REFORMA_ENGINE_SETTLE_DELAY_MS, ...
            .merge(Env::prefixed("REFORMA_").map(|key| {
                key.as_str().replacen('_', ".", 1).into()
            }))
            .extract()
            .map_err(|e| ReformaError::ConfigError(e.to_string()))?;

        if config.engine.max_anchor_len == 0 {
            return Err(ReformaError::ConfigError(
                "engine.max_anchor_len must be greater than zero".to_string(),
            ));
        }

        Ok(config)
    }

    /// Get the configuration file path (`REFORMA_CONFIG` overrides it)
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os("REFORMA_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reforma")
            .join("config.toml")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ReformaError::ConfigError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(self.storage.path.trim())
    }
}
