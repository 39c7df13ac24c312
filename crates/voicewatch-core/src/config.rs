//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/voicewatch/config.toml)
//! 3. Environment variables (VOICEWATCH_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::store::DEFAULT_DELIMITER;

/// Environment variable prefix
const ENV_PREFIX: &str = "VOICEWATCH";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the table files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Field delimiter used by every table
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// File name of the subject -> watchers table
    #[serde(default = "default_watchers_file")]
    pub watchers_file: String,

    /// File name of the watcher -> contact table
    #[serde(default = "default_contacts_file")]
    pub contacts_file: String,

    /// Write logs here instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            delimiter: default_delimiter(),
            watchers_file: default_watchers_file(),
            contacts_file: default_contacts_file(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (VOICEWATCH_DATA_DIR, VOICEWATCH_DELIMITER, VOICEWATCH_LOG_FILE)
    /// 2. Config file (~/.config/voicewatch/config.toml or VOICEWATCH_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // VOICEWATCH_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // VOICEWATCH_DELIMITER
        if let Ok(val) = std::env::var(format!("{}_DELIMITER", ENV_PREFIX)) {
            let mut chars = val.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => self.delimiter = c,
                _ => warn!(
                    "Ignoring {}_DELIMITER={:?}: expected a single character",
                    ENV_PREFIX, val
                ),
            }
        }

        // VOICEWATCH_LOG_FILE
        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with VOICEWATCH_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voicewatch")
            .join("config.toml")
    }

    /// Get the path to the subject -> watchers table
    pub fn watchers_path(&self) -> PathBuf {
        self.data_dir.join(&self.watchers_file)
    }

    /// Get the path to the watcher -> contact table
    pub fn contacts_path(&self) -> PathBuf {
        self.data_dir.join(&self.contacts_file)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voicewatch")
}

fn default_delimiter() -> char {
    DEFAULT_DELIMITER
}

fn default_watchers_file() -> String {
    "watchers.csv".to_string()
}

fn default_contacts_file() -> String {
    "contacts.csv".to_string()
}
