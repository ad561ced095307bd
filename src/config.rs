//! Console configuration.
//!
//! One explicit struct passed to the console at construction; there is no
//! global config singleton. Persisted as JSON next to the position files.
//! Defaults: 100 ms refresh period, unit jog step.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default live-position refresh period in milliseconds.
pub const DEFAULT_REFRESH_PERIOD_MS: u64 = 100;

/// Default jog step size, in actuator units.
pub const DEFAULT_JOG_STEP: f64 = 1.0;

/// Directory under `$HOME` holding console state.
const CONFIG_DIR: &str = ".manipulator";

/// Configuration surface of the positioning console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Directory holding position-set files.
    pub storage_root: PathBuf,
    /// Live-position refresh period in milliseconds (runtime-adjustable).
    pub refresh_period_ms: u64,
    /// Jog step size in actuator units (runtime-adjustable).
    pub jog_step: f64,
}

impl ConsoleConfig {
    /// Config rooted at the given positions directory, defaults elsewhere.
    pub fn with_storage_root(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            refresh_period_ms: DEFAULT_REFRESH_PERIOD_MS,
            jog_step: DEFAULT_JOG_STEP,
        }
    }

    /// Default storage root: `~/.manipulator/positions`.
    pub fn default_storage_root() -> std::io::Result<PathBuf> {
        let home = std::env::var("HOME").map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "HOME not set")
        })?;
        Ok(PathBuf::from(home).join(CONFIG_DIR).join("positions"))
    }

    /// Refresh period as a duration.
    pub fn refresh_period(&self) -> Duration {
        Duration::from_millis(self.refresh_period_ms)
    }

    /// Save to JSON file.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Load from JSON file.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        let root = Self::default_storage_root()
            .unwrap_or_else(|_| PathBuf::from(CONFIG_DIR).join("positions"));
        Self::with_storage_root(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::with_storage_root("/tmp/positions");
        assert_eq!(config.refresh_period(), Duration::from_millis(100));
        assert_relative_eq!(config.jog_step, 1.0);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("console.json");

        let mut config = ConsoleConfig::with_storage_root("/data/positions");
        config.refresh_period_ms = 250;
        config.jog_step = 0.5;
        config.save_to_file(&path).unwrap();

        let loaded = ConsoleConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.storage_root, PathBuf::from("/data/positions"));
        assert_eq!(loaded.refresh_period_ms, 250);
        assert_relative_eq!(loaded.jog_step, 0.5);
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("console.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(ConsoleConfig::load_from_file(&path).is_err());
    }
}
