//! Folds partial scope outputs into the main snapshot.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{SnapshotStore, read_snapshot};
use crate::core::clock::LocalTime;

/// Overlays each partial file onto `base`, in order. Only non-null keys
/// replace; missing or unreadable partials are skipped. Returns the number
/// of partials merged.
pub fn merge_files(base: &Path, inputs: &[PathBuf], now: &LocalTime) -> Result<usize> {
    let store = SnapshotStore::new(base);
    let mut snapshot = store.load()?;
    let mut merged = 0;

    for input in inputs {
        if !input.exists() {
            warn!(input = %input.display(), "Partial output not found, skipping");
            continue;
        }
        match read_snapshot(input) {
            Ok(partial) => {
                let keys = snapshot.overlay(&partial);
                info!(input = %input.display(), ?keys, "Merged partial output");
                merged += 1;
            }
            Err(e) => {
                warn!(input = %input.display(), error = %e, "Skipping unreadable partial output")
            }
        }
    }

    snapshot.stamp(now);
    store.save(&snapshot)?;
    Ok(merged)
}
