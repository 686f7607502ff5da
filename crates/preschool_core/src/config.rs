//! Runtime configuration for the core crate.
//!
//! # Responsibility
//! - Load database, logging and blob storage locations from a JSON file.
//! - Apply `PRESCHOOL_*` environment overrides on top of file values.
//!
//! # Invariants
//! - Every field has a default, so an empty JSON object is a valid config.
//! - `log_level` is normalized to one of `trace|debug|info|warn|error`.

use crate::logging::{default_log_level, normalize_level};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "PRESCHOOL_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "PRESCHOOL_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "PRESCHOOL_LOG_DIR";
pub const ENV_BLOB_ROOT: &str = "PRESCHOOL_BLOB_ROOT";

/// Configuration load errors.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    InvalidValue { field: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::InvalidValue { field, message } => {
                write!(f, "invalid config value for `{field}`: {message}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::InvalidValue { .. } => None,
        }
    }
}

/// Core process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite database file holding all organizations.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
    /// Root directory of the filesystem blob store.
    pub blob_root: PathBuf,
}

impl Default for CoreConfig {
    fn default() -> Self {
        let base = std::env::temp_dir().join("preschool");
        Self {
            db_path: base.join("preschool.sqlite3"),
            log_level: default_log_level().to_string(),
            log_dir: base.join("logs"),
            blob_root: base.join("blobs"),
        }
    }
}

impl CoreConfig {
    /// Reads a JSON config file, then applies environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Builds a config from defaults plus environment overrides.
    ///
    /// Reads:
    /// - `PRESCHOOL_DB_PATH`
    /// - `PRESCHOOL_LOG_LEVEL`
    /// - `PRESCHOOL_LOG_DIR`
    /// - `PRESCHOOL_BLOB_ROOT`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup and validates the result.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = non_blank(ENV_DB_PATH) {
            self.db_path = PathBuf::from(value.trim());
        }
        if let Some(value) = non_blank(ENV_LOG_LEVEL) {
            self.log_level = value;
        }
        if let Some(value) = non_blank(ENV_LOG_DIR) {
            self.log_dir = PathBuf::from(value.trim());
        }
        if let Some(value) = non_blank(ENV_BLOB_ROOT) {
            self.blob_root = PathBuf::from(value.trim());
        }

        self.log_level = normalize_level(&self.log_level)
            .map_err(|message| ConfigError::InvalidValue {
                field: "log_level",
                message,
            })?
            .to_string();
        if !self.log_dir.is_absolute() {
            return Err(ConfigError::InvalidValue {
                field: "log_dir",
                message: format!("must be absolute, got `{}`", self.log_dir.display()),
            });
        }
        Ok(self)
    }
}
