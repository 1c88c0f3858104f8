//! Snapshot persistence -- one JSON document per fleet, plus an
//! append-only event log.
//!
//! A corrupt or missing snapshot is never fatal: it is treated as "no
//! previous snapshot" and the next run simply scans everything. Saving
//! writes to a temp file in the same directory and renames over the old
//! snapshot, so a crash mid-write cannot corrupt the previous good one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{AuditError, Result};
use crate::types::Snapshot;

/// Snapshot file name inside the audit directory.
pub const SNAPSHOT_FILE: &str = "lifecycle-snapshot.json";

/// Append-only run log inside the audit directory.
pub const EVENT_LOG_FILE: &str = "events.jsonl";

/// Loads and persists fleet snapshots under a single audit directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

/// One line in the append-only event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A run completed and persisted a snapshot
    RunCompleted {
        /// When the run finished
        at: DateTime<Utc>,
        /// Projects in the snapshot
        projects: usize,
        /// Projects served from the incremental cache
        reused: usize,
        /// Projects scanned fresh
        scanned: usize,
    },
    /// A run detected drift against the previous snapshot
    DriftDetected {
        /// When drift was observed
        at: DateTime<Utc>,
        /// Folders added since the previous snapshot
        added: usize,
        /// Folders removed since the previous snapshot
        removed: usize,
        /// Folders whose classification changed
        changed: usize,
    },
}

impl SnapshotStore {
    /// Store rooted at the given audit directory (created on save).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default audit directory: `audit/` next to the running executable.
    #[must_use]
    pub fn default_dir() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("audit")
    }

    /// Path of the snapshot document.
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    /// Load the previous snapshot, if a valid one exists.
    ///
    /// Missing, unreadable, or schema-invalid files all yield `None`.
    #[must_use]
    pub fn load(&self) -> Option<Snapshot> {
        let path = self.snapshot_path();
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no previous snapshot");
                return None;
            }
        };

        let snapshot: Snapshot = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt snapshot, treating as absent");
                return None;
            }
        };

        // Folders must be unique within a snapshot.
        let mut seen = BTreeSet::new();
        for entry in &snapshot.entries {
            if !seen.insert(entry.folder.as_str()) {
                warn!(
                    path = %path.display(),
                    folder = %entry.folder,
                    "duplicate folder in snapshot, treating as absent"
                );
                return None;
            }
        }

        Some(snapshot)
    }

    /// Persist a snapshot atomically: temp file in the same directory,
    /// then rename over the previous one.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let path = self.snapshot_path();
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| AuditError::io(&self.dir.display().to_string(), e))?;

        let json = serde_json::to_vec_pretty(snapshot)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| {
            AuditError::SnapshotWrite {
                path: path.display().to_string(),
                reason: format!("cannot create temp file: {e}"),
            }
        })?;
        tmp.write_all(&json).map_err(|e| AuditError::SnapshotWrite {
            path: path.display().to_string(),
            reason: format!("write failed: {e}"),
        })?;
        tmp.persist(&path).map_err(|e| AuditError::SnapshotWrite {
            path: path.display().to_string(),
            reason: format!("rename failed: {e}"),
        })?;

        debug!(path = %path.display(), entries = snapshot.entries.len(), "snapshot saved");
        Ok(())
    }

    /// Append an event to the run log. Best-effort: failures are logged,
    /// never surfaced.
    pub fn append_event(&self, event: &AuditEvent) {
        let path = self.dir.join(EVENT_LOG_FILE);
        let result = std::fs::create_dir_all(&self.dir).and_then(|()| {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            let line = serde_json::to_string(event).unwrap_or_default();
            writeln!(file, "{line}")
        });
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "failed to append audit event");
        }
    }
}
