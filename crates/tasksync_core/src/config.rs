//! Core runtime configuration.
//!
//! # Responsibility
//! - Collect the knobs hosts may set: logging, database path, sync policy.
//! - Resolve them from `TASKSYNC_*` environment variables.
//!
//! # Invariants
//! - Blank environment values count as unset.
//! - Invalid values are reported, never silently replaced by defaults.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_LOG_LEVEL: &str = "TASKSYNC_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TASKSYNC_LOG_DIR";
pub const ENV_DB_PATH: &str = "TASKSYNC_DB_PATH";
pub const ENV_TOGGLE_ROLLBACK: &str = "TASKSYNC_TOGGLE_ROLLBACK";

const DEFAULT_DB_FILE_NAME: &str = "tasksync.sqlite3";
const DEFAULT_FAILURE_CHANNEL_CAPACITY: usize = 32;

/// What the synchronizer does with the local flag when a status update fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToggleFailurePolicy {
    /// Keep the optimistic flip; local and remote may diverge until reload.
    #[default]
    KeepLocal,
    /// Restore the previous value unless a newer toggle happened meanwhile.
    Rollback,
}

/// Synchronizer-level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub toggle_failure_policy: ToggleFailurePolicy,
    /// Buffered notices per failure subscriber before the oldest is dropped.
    pub failure_channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            toggle_failure_policy: ToggleFailurePolicy::default(),
            failure_channel_capacity: DEFAULT_FAILURE_CHANNEL_CAPACITY,
        }
    }
}

/// Process-level configuration for hosts embedding the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub log_level: String,
    /// File logging is disabled when `None`.
    pub log_dir: Option<PathBuf>,
    pub db_path: PathBuf,
    pub sync: SyncConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            sync: SyncConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = read(ENV_LOG_DIR).map(PathBuf::from);
        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(raw) = read(ENV_TOGGLE_ROLLBACK) {
            config.sync.toggle_failure_policy = if parse_flag(ENV_TOGGLE_ROLLBACK, &raw)? {
                ToggleFailurePolicy::Rollback
            } else {
                ToggleFailurePolicy::KeepLocal
            };
        }
        Ok(config)
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for {key}")
            }
        }
    }
}

impl Error for ConfigError {}
