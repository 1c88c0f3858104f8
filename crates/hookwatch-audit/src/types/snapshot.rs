//! Fleet snapshot -- point-in-time audit state across all projects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::record::ProjectRecord;

/// One audit run's complete result set, persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// When this snapshot was taken
    pub timestamp: DateTime<Utc>,
    /// One record per project, keyed by unique `folder`
    pub entries: Vec<ProjectRecord>,
    /// Number of directories considered (including skipped non-projects)
    pub total_projects_considered: usize,
}

impl Snapshot {
    /// Build a snapshot from scan results, stamped with the current time.
    #[must_use]
    pub fn new(entries: Vec<ProjectRecord>, total_projects_considered: usize) -> Self {
        Self {
            timestamp: Utc::now(),
            entries,
            total_projects_considered,
        }
    }

    /// Index entries by folder for keyed lookup.
    #[must_use]
    pub fn entry_map(&self) -> HashMap<&str, &ProjectRecord> {
        self.entries
            .iter()
            .map(|e| (e.folder.as_str(), e))
            .collect()
    }

    /// Summary counts for reporting.
    #[must_use]
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary::from_entries(&self.entries)
    }
}

/// Summary statistics for a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSummary {
    /// Projects audited
    pub total_projects: usize,
    /// Projects with at least one lockfile
    pub with_lockfile: usize,
    /// Dependencies allowed by the default-trust set, fleet-wide
    pub default_trusted: usize,
    /// Dependencies allowed by per-project declarations, fleet-wide
    pub explicitly_trusted: usize,
    /// Dependencies whose hooks are blocked, fleet-wide
    pub blocked: usize,
    /// Dependencies flagged by the native-code heuristic, fleet-wide
    pub native_flagged: usize,
}

impl SnapshotSummary {
    /// Build summary counts from a set of project records.
    #[must_use]
    pub fn from_entries(entries: &[ProjectRecord]) -> Self {
        Self {
            total_projects: entries.len(),
            with_lockfile: entries.iter().filter(|e| e.has_lockfile()).count(),
            default_trusted: entries
                .iter()
                .map(|e| e.lifecycle.default_trusted.len())
                .sum(),
            explicitly_trusted: entries
                .iter()
                .map(|e| e.lifecycle.explicitly_trusted.len())
                .sum(),
            blocked: entries.iter().map(|e| e.lifecycle.blocked.len()).sum(),
            native_flagged: entries.iter().map(|e| e.native.len()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::LifecycleBuckets;

    fn record(folder: &str, hash: &str, blocked: &[&str]) -> ProjectRecord {
        ProjectRecord {
            folder: folder.into(),
            lock_hash: hash.into(),
            trusted_declared: std::collections::BTreeSet::new(),
            lifecycle: LifecycleBuckets {
                default_trusted: vec![],
                explicitly_trusted: vec![],
                blocked: blocked.iter().map(|s| (*s).to_string()).collect(),
            },
            native: vec![],
        }
    }

    #[test]
    fn entry_map_keys_by_folder() {
        let snap = Snapshot::new(vec![record("a", "h1", &[]), record("b", "-", &[])], 2);
        let map = snap.entry_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"].lock_hash, "h1");
    }

    #[test]
    fn summary_counts() {
        let snap = Snapshot::new(
            vec![record("a", "h1", &["gyp-pkg"]), record("b", "-", &[])],
            3,
        );
        let summary = snap.summary();
        assert_eq!(summary.total_projects, 2);
        assert_eq!(summary.with_lockfile, 1);
        assert_eq!(summary.blocked, 1);
    }
}
