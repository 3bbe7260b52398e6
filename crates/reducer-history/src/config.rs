/// Construction-time configuration for the history engine.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Maximum number of entries kept on the action stack.
/// Oldest entries are evicted once this limit is exceeded.
const DEFAULT_MAX_HISTORY_LENGTH: usize = 64;

/// Configuration for an `UndoManager`.
///
/// The update callback is not part of this struct because it cannot be
/// serialized; install it with `UndoManager::with_on_updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Max entries on the stack. `0` disables the cap.
    pub max_history_length: usize,
    /// Whether registering a name twice is an error instead of an overwrite.
    pub forbid_overwrite_reducers: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history_length: DEFAULT_MAX_HISTORY_LENGTH,
            forbid_overwrite_reducers: false,
        }
    }
}

impl HistoryConfig {
    /// Sets the stack length cap.
    #[must_use]
    pub fn with_max_history_length(mut self, max: usize) -> Self {
        self.max_history_length = max;
        self
    }

    /// Makes `register` fail with `DuplicateReducer` on an existing name.
    #[must_use]
    pub fn forbid_overwrite(mut self) -> Self {
        self.forbid_overwrite_reducers = true;
        self
    }

    /// Whether a stack of `len` entries is over the configured cap.
    pub(crate) fn exceeds_cap(&self, len: usize) -> bool {
        self.max_history_length != 0 && len > self.max_history_length
    }

    /// Loads config from a JSON file at `path`.
    ///
    /// Missing keys fall back to their defaults. Returns the default config
    /// on any error (missing file, parse error, etc.).
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<HistoryConfig>(&contents) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to parse history config at {}: {e}", path.display());
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read history config at {}: {e}", path.display());
            }
        }
        Self::default()
    }

    /// Saves config to `path` as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the file write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to encode history config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write history config: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = HistoryConfig::default();
        assert_eq!(config.max_history_length, 64);
        assert!(!config.forbid_overwrite_reducers);
    }

    #[test]
    fn test_builders() {
        let config = HistoryConfig::default()
            .with_max_history_length(3)
            .forbid_overwrite();
        assert_eq!(config.max_history_length, 3);
        assert!(config.forbid_overwrite_reducers);
    }

    #[test]
    fn test_exceeds_cap() {
        let config = HistoryConfig::default().with_max_history_length(2);
        assert!(!config.exceeds_cap(2));
        assert!(config.exceeds_cap(3));
    }

    #[test]
    fn test_zero_cap_is_unlimited() {
        let config = HistoryConfig::default().with_max_history_length(0);
        assert!(!config.exceeds_cap(1_000_000));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("history.json");
        let config = HistoryConfig::default()
            .with_max_history_length(10)
            .forbid_overwrite();
        config.save(&path).expect("save");

        let loaded = HistoryConfig::load_or_default(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("history.json");
        std::fs::write(&path, r#"{"forbid_overwrite_reducers": true}"#).expect("write");

        let loaded = HistoryConfig::load_or_default(&path);
        assert_eq!(loaded.max_history_length, 64);
        assert!(loaded.forbid_overwrite_reducers);
    }

    #[test]
    fn test_missing_or_broken_file_gives_defaults() {
        let dir = TempDir::new().expect("create temp dir");
        let missing = dir.path().join("missing.json");
        assert_eq!(HistoryConfig::load_or_default(&missing), HistoryConfig::default());

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").expect("write");
        assert_eq!(HistoryConfig::load_or_default(&broken), HistoryConfig::default());
    }
}
