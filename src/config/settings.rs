//! Configuration settings and validation.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Directory-level marker file that stops recursion into a subtree.
const DEFAULT_STOP_MARKER: &str = ".fileindex-ignore";

/// Runtime configuration for the file index subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gitignore-style patterns excluded from scans and watch events.
    pub exclude_patterns: Vec<String>,

    /// Name of the marker file that stops recursion into a directory.
    pub stop_marker: String,

    /// Whether directories are subscribed to the watch backend at all.
    pub watch_enabled: bool,

    /// Force every reload to run synchronously, for deterministic tests.
    pub force_synchronous: bool,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude_patterns: Vec::new(),
            stop_marker: DEFAULT_STOP_MARKER.to_string(),
            watch_enabled: true,
            force_synchronous: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.stop_marker.is_empty() {
            return Err(Error::config("stop_marker cannot be empty"));
        }

        if self.stop_marker.contains('/') || self.stop_marker.contains('\\') {
            return Err(Error::config(
                "stop_marker must be a bare file name, not a path",
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }
}
