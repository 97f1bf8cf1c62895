//! Configuration for inbox tracking

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Visibility shorter than this (seconds) is not an impression
    pub min_impression_secs: f64,

    /// Section index used for sectioned diffs
    pub section: usize,

    /// Fetch item assets when rows are requested
    pub load_assets: bool,
}

impl TrackerConfig {
    pub fn new() -> Self {
        Self {
            min_impression_secs: 1.0,
            section: 0,
            load_assets: true,
        }
    }

    pub fn min_impression_duration(&self) -> TimeDelta {
        TimeDelta::milliseconds((self.min_impression_secs.max(0.0) * 1000.0).round() as i64)
    }

    /// Load from a JSON file. A missing file yields defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = TrackerConfig::new();
        assert_eq!(config.min_impression_secs, 1.0);
        assert_eq!(config.section, 0);
        assert!(config.load_assets);
        assert_eq!(config.min_impression_duration(), TimeDelta::seconds(1));
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"min_impression_secs": 0.5}"#).unwrap();

        let config = TrackerConfig::load(&path).unwrap();
        assert_eq!(config.min_impression_duration(), TimeDelta::milliseconds(500));
        assert!(config.load_assets);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrackerConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, TrackerConfig::default());
    }
}
