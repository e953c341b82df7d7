//! Runtime configuration.

use std::path::PathBuf;

use tracing::warn;

use crate::review::{DEFAULT_QUEUE_LIMIT, clamp_limit};

/// File name of the SQLite database inside the data directory
pub const DATABASE_FILE: &str = "recollect.db";

/// Overrides the platform data directory
pub const ENV_DATA_DIR: &str = "RECOLLECT_DATA_DIR";

/// Default due-queue page size
pub const ENV_QUEUE_LIMIT: &str = "RECOLLECT_QUEUE_LIMIT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `None` means the platform data directory
    pub data_dir: Option<PathBuf>,
    /// Always within `1..=50`
    pub default_queue_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_queue_limit: DEFAULT_QUEUE_LIMIT,
        }
    }
}

impl Config {
    /// Read from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read from an arbitrary key lookup. Unparseable values fall back to
    /// defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.trim().is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(raw) = lookup(ENV_QUEUE_LIMIT) {
            match raw.trim().parse::<i64>() {
                Ok(limit) => config.default_queue_limit = clamp_limit(limit),
                Err(_) => warn!(value = %raw, "Ignoring invalid {}", ENV_QUEUE_LIMIT),
            }
        }

        config
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_queue_limit(mut self, limit: i64) -> Self {
        self.default_queue_limit = clamp_limit(limit);
        self
    }

    /// Database path for `SqliteStore::new`; `None` lets the store pick the
    /// platform default
    pub fn db_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(DATABASE_FILE))
    }
}
