//! Runtime settings read from `~/.reading-statistics/config.toml`.
//!
//! ```toml
//! database = "~/.reading-statistics/library.sqlite"
//! library = "data/library.json"
//! views = "data/views.json"
//!
//! [logging]
//! level = "info"
//! file = "~/.reading-statistics/reading-statistics.log"
//! ```
//!
//! Every key is optional. A missing file means all defaults.

use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_CONFIG: &str = "~/.reading-statistics/config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file holding the library.
    pub database: String,
    /// Source for the Load Library flow.
    pub library: String,
    /// Source for the Views Setup flow.
    pub views: String,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    pub level: String,
    pub file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: "~/.reading-statistics/library.sqlite".to_string(),
            library: "data/library.json".to_string(),
            views: "data/views.json".to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: "~/.reading-statistics/reading-statistics.log".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let path = expand_path(path)?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        Ok(expand(&self.database)?)
    }

    pub fn library_path(&self) -> anyhow::Result<PathBuf> {
        Ok(expand(&self.library)?)
    }

    pub fn views_path(&self) -> anyhow::Result<PathBuf> {
        Ok(expand(&self.views)?)
    }

    pub fn log_path(&self) -> anyhow::Result<PathBuf> {
        Ok(expand(&self.logging.file)?)
    }
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    expand(DEFAULT_CONFIG)
}

/// Resolve a leading `~/` against the home directory. Anything else is
/// returned untouched.
pub fn expand(path: &str) -> Result<PathBuf, ConfigError> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let base_dirs = BaseDirs::new().ok_or(ConfigError::NoHome)?;
            Ok(base_dirs.home_dir().join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

fn expand_path(path: &Path) -> Result<PathBuf, ConfigError> {
    match path.to_str() {
        Some(text) => expand(text),
        None => Ok(path.to_path_buf()),
    }
}
