//! Configuration management for campus-thrift.
//!
//! Configuration is read from `~/.config/campus-thrift/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! The points economy lives here rather than in the core, so campuses can tune it.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::store::retry::{RetryPolicy, DEFAULT_MAX_RETRIES};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub points: PointsConfig,
    pub boost: BoostConfig,
    pub chat: ChatConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PointsConfig {
    /// Points credited to buyer and seller for each completed trade
    pub per_transaction: u64,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self { per_transaction: 5 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BoostConfig {
    /// Points debited from the seller for one boost
    pub cost: u64,
    pub duration_days: u32,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            cost: 25,
            duration_days: 7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum message length in characters, after trimming
    pub max_message_len: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_len: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file; defaults to the platform data directory
    pub database_path: Option<PathBuf>,
    /// Retries after a lost optimistic-concurrency race
    pub max_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl StoreConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path: `~/.config/campus-thrift/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("campus-thrift").join("config.toml"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.boost.duration_days == 0 {
            return Err(ConfigError::Invalid(
                "boost.duration_days must be at least 1".into(),
            ));
        }
        if self.chat.max_message_len == 0 {
            return Err(ConfigError::Invalid(
                "chat.max_message_len must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# campus-thrift configuration

[points]
# Points credited to both buyer and seller when a trade completes
per_transaction = 5

[boost]
# Points it costs a seller to boost one listing
cost = 25
# How long a boost keeps a listing at the top
duration_days = 7

[chat]
# Maximum message length in characters
max_message_len = 1000

[store]
# SQLite database file (defaults to the platform data directory)
# database_path = "/var/lib/campus-thrift/campus-thrift.db"

# Retries after losing an optimistic-concurrency race on one entity
max_retries = 5
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
