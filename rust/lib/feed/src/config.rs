use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Errors loading or validating a [`FeedConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Feed engine configuration.
///
/// Loaded from a TOML file or taken from defaults; the binary applies its
/// command-line overrides on top. Unknown TOML keys are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Posts requested per fetch.
    pub page_size: usize,

    /// Maximum gap between two presses that still counts as a double tap.
    pub double_tap_window_ms: u64,

    /// Substitute the placeholder dataset when the initial load fails or
    /// comes back empty.
    pub fallback_enabled: bool,

    /// Path to the redb database file.
    pub db_path: PathBuf,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            double_tap_window_ms: 300,
            fallback_enabled: true,
            db_path: PathBuf::from("lumigram.redb"),
        }
    }
}

impl FeedConfig {
    /// Load configuration from a TOML file. Missing keys take defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: FeedConfig =
            toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be positive".into()));
        }
        if self.double_tap_window_ms == 0 {
            return Err(ConfigError::Invalid(
                "double_tap_window_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn double_tap_window(&self) -> Duration {
        Duration::from_millis(self.double_tap_window_ms)
    }
}
