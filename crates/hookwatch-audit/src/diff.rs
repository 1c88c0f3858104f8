//! Snapshot comparison and the incremental cache rule.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::hash::NO_LOCKFILE;
use crate::scanner::lockfile_hash;
use crate::types::{DiffReport, FieldDelta, ProjectDelta, ProjectRecord, ScanJob, Snapshot};

/// The scan work remaining after consulting the previous snapshot.
#[derive(Debug, Clone, Default)]
pub struct ScanPlan {
    /// Cache hits: previous records reused verbatim, keyed by the
    /// position they occupy in the final output
    pub reused: Vec<(usize, ProjectRecord)>,
    /// Cache misses that must be dispatched to the pool
    pub pending: Vec<ScanJob>,
}

/// Decide, per directory, whether the previous record can be reused.
///
/// The single caching rule: reuse iff a previous entry exists for the
/// folder, its lock hash equals the directory's current lockfile content
/// hash, and the hash is not the no-lockfile sentinel. The sentinel
/// never cache-hits, so lockfile-less projects are rescanned every run.
pub async fn plan_jobs(prev: Option<&Snapshot>, dirs: &[PathBuf]) -> ScanPlan {
    let prev_entries = prev.map(Snapshot::entry_map).unwrap_or_default();
    let mut plan = ScanPlan::default();

    for (id, dir) in dirs.iter().enumerate() {
        let folder = folder_name(dir);
        let current_hash = lockfile_hash(dir).await;

        match prev_entries.get(folder.as_str()) {
            Some(entry) if current_hash != NO_LOCKFILE && entry.lock_hash == current_hash => {
                debug!(folder = %folder, "lockfile unchanged, reusing previous record");
                plan.reused.push((id, (*entry).clone()));
            }
            _ => {
                plan.pending.push(ScanJob {
                    id,
                    dir: dir.clone(),
                });
            }
        }
    }

    plan
}

/// Compare two snapshots and report drift.
#[must_use]
pub fn diff(prev: &Snapshot, curr: &Snapshot) -> DiffReport {
    let prev_map = prev.entry_map();
    let curr_map = curr.entry_map();
    let mut report = DiffReport::default();

    for entry in &curr.entries {
        match prev_map.get(entry.folder.as_str()) {
            None => report.added.push(entry.folder.clone()),
            Some(before) => {
                let deltas = bucket_deltas(before, entry);
                if deltas.is_empty() {
                    report.unchanged += 1;
                } else {
                    report.changed.push(ProjectDelta {
                        folder: entry.folder.clone(),
                        deltas,
                    });
                }
            }
        }
    }

    for entry in &prev.entries {
        if !curr_map.contains_key(entry.folder.as_str()) {
            report.removed.push(entry.folder.clone());
        }
    }

    report.added.sort();
    report.removed.sort();
    report.changed.sort_by(|a, b| a.folder.cmp(&b.folder));
    report
}

/// Per-field bucket-count deltas between two records of the same project.
fn bucket_deltas(before: &ProjectRecord, after: &ProjectRecord) -> Vec<FieldDelta> {
    let fields = [
        (
            "default_trusted",
            before.lifecycle.default_trusted.len(),
            after.lifecycle.default_trusted.len(),
        ),
        (
            "explicitly_trusted",
            before.lifecycle.explicitly_trusted.len(),
            after.lifecycle.explicitly_trusted.len(),
        ),
        (
            "blocked",
            before.lifecycle.blocked.len(),
            after.lifecycle.blocked.len(),
        ),
    ];

    fields
        .into_iter()
        .filter(|(_, b, a)| b != a)
        .map(|(field, before, after)| FieldDelta {
            field: field.to_string(),
            before,
            after,
        })
        .collect()
}

/// Directory basename, used as the project key.
#[must_use]
pub fn folder_name(dir: &Path) -> String {
    dir.file_name()
        .map_or_else(|| dir.display().to_string(), |n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LifecycleBuckets;
    use std::fs;
    use tempfile::TempDir;

    fn record(folder: &str, hash: &str, blocked: usize) -> ProjectRecord {
        ProjectRecord {
            folder: folder.into(),
            lock_hash: hash.into(),
            trusted_declared: std::collections::BTreeSet::new(),
            lifecycle: LifecycleBuckets {
                default_trusted: vec![],
                explicitly_trusted: vec![],
                blocked: (0..blocked).map(|i| format!("pkg-{i}")).collect(),
            },
            native: vec![],
        }
    }

    fn snap(records: Vec<ProjectRecord>) -> Snapshot {
        let count = records.len();
        Snapshot::new(records, count)
    }

    #[test]
    fn diff_of_identical_snapshots_is_empty() {
        let s = snap(vec![record("a", "h1", 2), record("b", "-", 0)]);
        let report = diff(&s, &s);
        assert!(report.added.is_empty());
        assert!(report.removed.is_empty());
        assert!(report.changed.is_empty());
        assert_eq!(report.unchanged, 2);
        assert!(!report.has_drift());
    }

    #[test]
    fn diff_detects_added_removed_changed() {
        let prev = snap(vec![record("kept", "h1", 1), record("gone", "h2", 0)]);
        let curr = snap(vec![record("kept", "h1", 3), record("fresh", "h3", 0)]);

        let report = diff(&prev, &curr);
        assert_eq!(report.added, vec!["fresh"]);
        assert_eq!(report.removed, vec!["gone"]);
        assert_eq!(report.changed.len(), 1);
        assert_eq!(report.changed[0].folder, "kept");
        assert_eq!(
            report.changed[0].deltas,
            vec![FieldDelta {
                field: "blocked".into(),
                before: 1,
                after: 3,
            }]
        );
        assert_eq!(report.unchanged, 0);
        assert!(report.has_drift());
    }

    #[tokio::test]
    async fn plan_reuses_only_matching_nonsentinel_hashes() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        let c = tmp.path().join("c");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::create_dir_all(&c).unwrap();
        fs::write(a.join("yarn.lock"), "stable").unwrap();
        fs::write(c.join("yarn.lock"), "drifted-now").unwrap();

        let a_hash = lockfile_hash(&a).await;
        let prev = snap(vec![
            record("a", &a_hash, 0),
            record("b", "-", 0),
            record("c", "old-hash", 0),
        ]);

        let dirs = vec![a, b, c];
        let plan = plan_jobs(Some(&prev), &dirs).await;

        // Only `a` is reused: `b` carries the sentinel, `c` changed.
        assert_eq!(plan.reused.len(), 1);
        assert_eq!(plan.reused[0].0, 0);
        assert_eq!(plan.reused[0].1.folder, "a");
        let pending_ids: Vec<_> = plan.pending.iter().map(|j| j.id).collect();
        assert_eq!(pending_ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn lockfile_content_change_invalidates_cache_at_equal_length() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("proj");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("bun.lock"), "version-A").unwrap();

        let h1 = lockfile_hash(&dir).await;
        let prev = snap(vec![record("proj", &h1, 0)]);

        // Same byte length, different content.
        fs::write(dir.join("bun.lock"), "version-B").unwrap();

        let dirs = vec![dir];
        let plan = plan_jobs(Some(&prev), &dirs).await;
        assert!(plan.reused.is_empty());
        assert_eq!(plan.pending.len(), 1);
    }

    #[tokio::test]
    async fn no_previous_snapshot_means_everything_pending() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("any");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("bun.lock"), "x").unwrap();

        let dirs = vec![dir];
        let plan = plan_jobs(None, &dirs).await;
        assert!(plan.reused.is_empty());
        assert_eq!(plan.pending.len(), 1);
    }
}
