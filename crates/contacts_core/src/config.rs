//! Application configuration.
//!
//! # Responsibility
//! - Load `[database]` and `[logging]` settings from an optional TOML file.
//! - Apply `CONTACTS_*` environment overrides on top of file values.
//!
//! # Invariants
//! - A missing file section falls back to its defaults.
//! - Empty override values are ignored.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_DB_PATH: &str = "CONTACTS_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "CONTACTS_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CONTACTS_LOG_DIR";

const DEFAULT_DB_FILE: &str = "contacts.sqlite3";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_FILE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Rotating log files go here; stderr is used when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            dir: None,
        }
    }
}

impl AppConfig {
    /// Loads `path` (defaults when `None`) and applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Applies `CONTACTS_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(path) = non_empty(ENV_DB_PATH) {
            self.database.path = PathBuf::from(path);
        }
        if let Some(level) = non_empty(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(dir) = non_empty(ENV_LOG_DIR) {
            self.logging.dir = Some(PathBuf::from(dir));
        }
    }
}
