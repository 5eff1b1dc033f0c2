//! Environment-driven configuration.
//!
//! # Responsibility
//! - Resolve manifest directory, record path and logging settings.
//!
//! # Invariants
//! - Blank environment values are treated as unset.
//! - The default record lives inside the manifest directory and carries the
//!   `COMPILED` prefix, so compilation never loads it back.

use crate::logging::{default_log_level, normalize_level, LoggingConfig};
use crate::manifest::compiler::{CompileOptions, COMPILED_PREFIX};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_JSON_DIR: &str = "SIMPLEX_JSON_DIR";
pub const ENV_RECORD_FILEPATH: &str = "SIMPLEX_TASK_RECORD_FILEPATH";
pub const ENV_LOG_LEVEL: &str = "SIMPLEX_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "SIMPLEX_LOG_DIR";

const DEFAULT_JSON_SUBDIR: &str = ".simplex/json";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No override was given and the home directory is unknown.
    HomeDirUnavailable,
    InvalidLogLevel(String),
    RelativeLogDir(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HomeDirUnavailable => write!(
                f,
                "home directory is unavailable; set {ENV_JSON_DIR} explicitly"
            ),
            Self::InvalidLogLevel(details) => write!(f, "{ENV_LOG_LEVEL}: {details}"),
            Self::RelativeLogDir(path) => write!(
                f,
                "{ENV_LOG_DIR} must be an absolute path, got `{}`",
                path.display()
            ),
        }
    }
}

impl Error for ConfigError {}

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimplexConfig {
    pub json_dir: PathBuf,
    pub record_path: PathBuf,
    pub logging: LoggingConfig,
}

impl SimplexConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), dirs::home_dir())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F, home_dir: Option<PathBuf>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let json_dir = match read(ENV_JSON_DIR) {
            Some(dir) => PathBuf::from(dir),
            None => home_dir
                .ok_or(ConfigError::HomeDirUnavailable)?
                .join(DEFAULT_JSON_SUBDIR),
        };
        let record_path = match read(ENV_RECORD_FILEPATH) {
            Some(path) => PathBuf::from(path),
            None => json_dir.join(format!("{COMPILED_PREFIX}_TASKS.json")),
        };

        let level = match read(ENV_LOG_LEVEL) {
            Some(level) => normalize_level(&level).map_err(ConfigError::InvalidLogLevel)?,
            None => default_log_level(),
        };
        let log_dir = read(ENV_LOG_DIR).map(PathBuf::from);
        if let Some(dir) = &log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir.clone()));
            }
        }

        Ok(Self {
            json_dir,
            record_path,
            logging: LoggingConfig {
                level: level.to_string(),
                log_dir,
            },
        })
    }

    /// Compile options persisting to the configured record.
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions::new(self.json_dir.clone()).with_record(self.record_path.clone())
    }
}
