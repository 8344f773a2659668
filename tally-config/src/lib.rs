//! Layered configuration: a TOML file overridden by `TALLY_`-prefixed
//! environment variables.

use std::path::PathBuf;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

/// Top-level runtime configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct TallyConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// How long a writer waits on a busy database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EngineConfig {
    /// Bound on optimistic retries before a conflict surfaces.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// When set, logs additionally roll into daily files here.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tally.db")
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            directory: None,
        }
    }
}

impl TallyConfig {
    /// Load from an explicit file, or `tally.toml` beside the working
    /// directory when none is given; environment variables win.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        builder = match path {
            Some(path) => builder.add_source(File::new(path, FileFormat::Toml)),
            None => builder.add_source(File::new("tally", FileFormat::Toml).required(false)),
        };
        let config = builder
            .add_source(Environment::with_prefix("TALLY").separator("__"))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(document, FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
