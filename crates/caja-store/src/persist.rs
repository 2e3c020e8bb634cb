//! # Snapshot Persistence
//!
//! Saves the store's contents to a JSON file after successful remote reads
//! and restores it at startup, so a register that boots without a network
//! link still has the catalog from its last good session.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Snapshot File Lifecycle                              │
//! │                                                                         │
//! │  Startup                                                                │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  load() ──► file exists? ──► parse ──► seed the store                  │
//! │     │            │                                                      │
//! │     │            └─ missing/corrupt ──► None (start from defaults)     │
//! │     │                                                                   │
//! │  Every successful remote fetch                                          │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  save() ──► create dirs ──► write JSON                                 │
//! │                                                                         │
//! │  Location:                                                              │
//! │  ~/.local/share/caja-pos/snapshot.json          (Linux)                 │
//! │  ~/Library/Application Support/com.caja.caja-pos/snapshot.json (macOS)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A corrupt or unreadable snapshot is never fatal: the store falls back to
//! starter data and the next successful fetch rewrites the file.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use caja_core::AppData;

/// File name of the persisted snapshot inside the data directory.
const SNAPSHOT_FILE_NAME: &str = "snapshot.json";

/// Handle to the on-disk snapshot of the store.
///
/// ## Usage
/// ```rust,ignore
/// let snapshot = SnapshotFile::default_location()?;
/// if let Some(data) = snapshot.load() {
///     store.replace_all(data);
/// }
/// snapshot.save(&store.snapshot())?;
/// ```
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Creates a snapshot handle for an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        SnapshotFile { path: path.into() }
    }

    /// Creates a snapshot handle at the platform data directory.
    pub fn default_location() -> StoreResult<Self> {
        let dirs = directories::ProjectDirs::from("com", "caja", "caja-pos")
            .ok_or(StoreError::NoDataDir)?;
        Ok(SnapshotFile {
            path: dirs.data_dir().join(SNAPSHOT_FILE_NAME),
        })
    }

    /// Returns the snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted snapshot, if one exists and parses.
    ///
    /// Missing and corrupt files both yield `None`; a corrupt file logs a
    /// warning so the operator can see the snapshot was discarded.
    pub fn load(&self) -> Option<AppData> {
        if !self.path.exists() {
            debug!(path = ?self.path, "No persisted snapshot");
            return None;
        }

        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Failed to read snapshot, ignoring");
                return None;
            }
        };

        match serde_json::from_str::<AppData>(&contents) {
            Ok(data) => {
                debug!(
                    path = ?self.path,
                    products = data.products.len(),
                    sales = data.sales.len(),
                    "Loaded persisted snapshot"
                );
                Some(data)
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Snapshot file is corrupt, ignoring");
                None
            }
        }
    }

    /// Writes the given data to the snapshot file.
    ///
    /// Creates parent directories on first use.
    pub fn save(&self, data: &AppData) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string(data)?;
        std::fs::write(&self.path, contents)?;

        debug!(path = ?self.path, "Snapshot saved");
        Ok(())
    }
}
