//! Path resolution for recorded analytics

use std::path::PathBuf;

/// Resolves where session analytics live on disk
#[derive(Debug, Clone)]
pub struct Paths {
    pub root: PathBuf,
}

impl Paths {
    /// Resolve the platform data directory (`<data_dir>/inboxview`)
    pub fn new() -> std::io::Result<Self> {
        let data = dirs::data_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "data directory not found")
        })?;

        Ok(Self {
            root: data.join("inboxview"),
        })
    }

    /// Use an explicit root directory
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get sessions.jsonl path
    pub fn sessions_file(&self) -> PathBuf {
        self.root.join("sessions.jsonl")
    }

    /// Get config.json path
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }
}
