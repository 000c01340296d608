//! Store configuration.
//!
//! Precedence, lowest to highest: built-in defaults, an optional `scout.toml`
//! next to the store file, then `SCOUT_*` environment variables.

use crate::core::error::ScoutError;
use crate::core::schemas;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const ENV_BUSY_TIMEOUT_MS: &str = "SCOUT_BUSY_TIMEOUT_MS";
pub const ENV_JOURNAL_MODE: &str = "SCOUT_JOURNAL_MODE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Wal,
    Delete,
}

impl JournalMode {
    pub fn as_pragma(&self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
        }
    }

    fn parse(value: &str) -> Result<Self, ScoutError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "wal" => Ok(JournalMode::Wal),
            "delete" => Ok(JournalMode::Delete),
            other => Err(ScoutError::ConfigError(format!(
                "journal mode must be 'wal' or 'delete', got '{}'",
                other
            ))),
        }
    }
}

/// Connection settings applied to every scoped connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub busy_timeout_ms: u64,
    pub journal_mode: JournalMode,
    pub foreign_keys: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            journal_mode: JournalMode::Wal,
            foreign_keys: true,
        }
    }
}

/// The `scout.toml` file structure.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    store: StoreConfig,
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Load configuration for the store at `store_path`.
    pub fn load(store_path: &Path) -> Result<Self, ScoutError> {
        let mut config = match store_path.parent() {
            Some(dir) => Self::from_file(&dir.join(schemas::CONFIG_FILE_NAME))?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Parse a `scout.toml`. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ScoutError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| ScoutError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ScoutError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| ScoutError::ConfigError(e.to_string()))?;
        Ok(file.store)
    }

    fn apply_env(&mut self) -> Result<(), ScoutError> {
        self.apply_overrides(
            std::env::var(ENV_BUSY_TIMEOUT_MS).ok().as_deref(),
            std::env::var(ENV_JOURNAL_MODE).ok().as_deref(),
        )
    }

    fn apply_overrides(
        &mut self,
        busy_timeout_ms: Option<&str>,
        journal_mode: Option<&str>,
    ) -> Result<(), ScoutError> {
        if let Some(raw) = busy_timeout_ms {
            self.busy_timeout_ms = raw.trim().parse().map_err(|_| {
                ScoutError::ConfigError(format!(
                    "{} must be a non-negative integer, got '{}'",
                    ENV_BUSY_TIMEOUT_MS, raw
                ))
            })?;
        }
        if let Some(raw) = journal_mode {
            self.journal_mode = JournalMode::parse(raw)?;
        }
        Ok(())
    }
}
