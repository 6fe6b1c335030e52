//! Evidence artifact persistence
//!
//! Writing extracted binaries and JSON bodies to disk is a side effect of
//! the harness, not of the core logic, so it lives behind an injectable
//! sink. The session and extraction code never touch the filesystem.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Destination for per-scenario evidence artifacts
pub trait EvidenceSink: Send + Sync {
    /// Persist `bytes` as `{category}/{name}`; returns the written path,
    /// or `None` if the sink discards artifacts
    fn store(&self, category: &str, name: &str, bytes: &[u8]) -> Result<Option<PathBuf>>;
}

/// Sink that writes artifacts under a root directory
///
/// Categories become subdirectories (e.g. `retrieve/instance`), created on
/// first use.
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl EvidenceSink for DirectorySink {
    fn store(&self, category: &str, name: &str, bytes: &[u8]) -> Result<Option<PathBuf>> {
        let dir = self.root.join(category);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(name);
        std::fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "evidence stored");
        Ok(Some(path))
    }
}

/// Sink that discards everything (tests, evidence-disabled runs)
pub struct NullSink;

impl EvidenceSink for NullSink {
    fn store(&self, _category: &str, _name: &str, _bytes: &[u8]) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}
