//! The persisted snapshot file.
//!
//! The store is the only resource whose failure aborts a run: a file that
//! exists but cannot be read or parsed is an error, never an empty snapshot.

pub mod merge;

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::core::snapshot::Snapshot;

pub use merge::merge_files;

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored snapshot, or an empty one when the file does not exist yet.
    pub fn load(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No snapshot yet, starting empty");
            return Ok(Snapshot::new());
        }
        read_snapshot(&self.path)
    }

    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        write_snapshot(&self.path, snapshot)
    }
}

pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;
    let snapshot = Snapshot::from_value(value)
        .with_context(|| format!("Invalid snapshot: {}", path.display()))?;
    debug!(path = %path.display(), keys = snapshot.keys().count(), "Loaded snapshot");
    Ok(snapshot)
}

pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let body = serde_json::to_vec_pretty(&snapshot.clone().into_value())
        .context("Failed to serialize snapshot")?;
    write_atomic(path, &body)?;
    info!(path = %path.display(), bytes = body.len(), "Saved snapshot");
    Ok(())
}

/// Writes `bytes` to a temporary file next to `path` and renames it into
/// place, so readers see either the old file or the new one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .with_context(|| format!("Failed to write temporary file for {}", path.display()))?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
