//! Runtime configuration resolved from the environment.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const CACHE_PATH_VAR: &str = "TASKERER_CACHE_PATH";
pub const LOG_LEVEL_VAR: &str = "TASKERER_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "TASKERER_LOG_DIR";

const DEFAULT_CACHE_FILE: &str = "taskerer-session.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite file backing the session cache.
    pub cache_path: PathBuf,
    pub log_level: String,
    /// File logging is disabled when `None`.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            cache_path: std::env::temp_dir().join(DEFAULT_CACHE_FILE),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves settings through `lookup`; blank values fall back to
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };
        let defaults = Self::default();

        Self {
            cache_path: value(CACHE_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            log_level: value(LOG_LEVEL_VAR).unwrap_or(defaults.log_level),
            log_dir: value(LOG_DIR_VAR).map(PathBuf::from),
        }
    }
}
