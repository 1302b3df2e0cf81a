//! Configuration data structures for socialgraph.
//!
//! Defines the YAML config format. Sources are merged with well-defined
//! priority: built-in defaults, then a YAML file, then environment
//! variables, then command-line flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SocialGraphError};

/// Config file looked up in the working directory when `--config` is not
/// given.
pub const DEFAULT_CONFIG_FILE: &str = "socialgraph.yaml";

/// Environment variable overriding the database path.
pub const ENV_DB: &str = "SOCIALGRAPH_DB";

/// Environment variable overriding the log filter.
pub const ENV_LOG: &str = "SOCIALGRAPH_LOG";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialGraphConfig {
    /// Config format version (currently "1.0").
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for SocialGraphConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl SocialGraphConfig {
    /// Parse a YAML document. Missing sections fall back to defaults.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
            .map_err(|e| SocialGraphError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load from an explicit path, or from [`DEFAULT_CONFIG_FILE`] in the
    /// working directory if it exists, or fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(SocialGraphError::Config(format!(
                        "No config file found at {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !local.is_file() {
                    return Ok(Self::default());
                }
                local
            }
        };
        let contents = std::fs::read_to_string(&path)?;
        let config = Self::from_yaml(&contents)?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides through `lookup`, which is normally
    /// `|k| std::env::var(k).ok()`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(db) = lookup(ENV_DB).filter(|v| !v.is_empty()) {
            self.database.path = PathBuf::from(db);
        }
        if let Some(filter) = lookup(ENV_LOG).filter(|v| !v.is_empty()) {
            self.logging.filter = filter;
        }
    }

    /// The database path as the string rusqlite expects.
    pub fn database_path(&self) -> String {
        self.database.path.to_string_lossy().into_owned()
    }
}

// ---------------------------------------------------------------------------
// DatabaseConfig
// ---------------------------------------------------------------------------

/// Where the SQLite record store lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the database file. `:memory:` is accepted.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is
    /// unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

// ---------------------------------------------------------------------------
// OutputConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Pretty-print JSON responses.
    #[serde(default)]
    pub pretty: bool,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_version() -> String {
    "1.0".to_string()
}

fn default_log_filter() -> String {
    "socialgraph=info".to_string()
}

/// `<platform data dir>/socialgraph.db`, or `./socialgraph.db` when the
/// platform has no notion of a data directory.
fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "socialgraph")
        .map(|dirs| dirs.data_dir().join("socialgraph.db"))
        .unwrap_or_else(|| PathBuf::from("socialgraph.db"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
