//! # hookwatch-audit
//!
//! Concurrent, incremental lifecycle-script audit for a fleet of
//! independently-versioned projects under one root directory.
//!
//! For each project the audit collects manifest metadata, lockfile
//! identity, and the set of installed dependencies that declare
//! install-time lifecycle scripts, classified by whether the host's
//! trust policy permits them to run. The dependency walk is the
//! expensive part, so it is distributed across worker processes and
//! skipped entirely for projects whose lockfile has not changed since
//! the previous run.
//!
//! ## Data Flow
//!
//! ```text
//! Phase 1: Plan (cheap)
//!   discover_projects() -> load previous snapshot -> plan_jobs()
//!   -> cache hits reused verbatim, misses become scan jobs
//!
//! Phase 2: Scan (expensive, distributed)
//!   WorkerPool::scan_all() -> scan_project() inside each worker
//!   -> per-job failures rescanned locally, pool failures fall back
//!      to sequential scanning in this process
//!
//! Phase 3: Report & Persist
//!   merge reused + fresh records -> Snapshot -> diff() against the
//!   previous snapshot -> save() atomically -> DiffReport
//! ```
//!
//! A timed-out or interrupted run persists nothing: the previous
//! snapshot stays authoritative.

pub mod diff;
pub mod error;
pub mod hash;
pub mod pool;
pub mod scanner;
pub mod store;
pub mod types;

pub use error::{AuditError, Result};
pub use types::*;

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::diff::plan_jobs;
use crate::pool::{PoolConfig, WorkerPool};
use crate::store::{AuditEvent, SnapshotStore};

/// Everything one audit run produced.
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    /// The snapshot persisted by this run
    pub snapshot: Snapshot,
    /// Drift against the previous snapshot (all-added on a first run)
    pub report: DiffReport,
    /// Projects served from the incremental cache
    pub reused: usize,
    /// Projects scanned fresh
    pub scanned: usize,
}

/// Audit the fleet under `root`: plan, scan, diff, persist.
///
/// # Errors
///
/// Fails on an unreadable root, a pool timeout or interrupt, or a
/// snapshot write failure. A failed run never replaces the previous
/// snapshot.
pub async fn run_audit(
    root: &Path,
    store: &SnapshotStore,
    pool_config: PoolConfig,
) -> Result<AuditOutcome> {
    let dirs = discover_projects(root)?;
    let prev = store.load();

    let plan = plan_jobs(prev.as_ref(), &dirs).await;
    let reused = plan.reused.len();
    let pending_dirs: Vec<PathBuf> = plan.pending.iter().map(|job| job.dir.clone()).collect();
    debug!(
        projects = dirs.len(),
        reused,
        pending = pending_dirs.len(),
        "audit planned"
    );

    let pool = WorkerPool::with_config(pool_config);
    let fresh = pool.scan_all(&pending_dirs).await?;

    // Reassemble in input order: cache hits keep their slot, fresh
    // records fill the job slots they were dispatched for.
    let mut slots: Vec<Option<ProjectRecord>> = (0..dirs.len()).map(|_| None).collect();
    for (id, record) in plan.reused {
        slots[id] = Some(record);
    }
    for (job, record) in plan.pending.iter().zip(fresh) {
        slots[job.id] = Some(record);
    }
    let entries: Vec<ProjectRecord> = slots.into_iter().flatten().collect();

    let snapshot = Snapshot::new(entries, dirs.len());
    let report = match &prev {
        Some(prev) => diff::diff(prev, &snapshot),
        None => DiffReport {
            added: snapshot.entries.iter().map(|e| e.folder.clone()).collect(),
            ..DiffReport::default()
        },
    };

    store.save(&snapshot)?;
    store.append_event(&AuditEvent::RunCompleted {
        at: snapshot.timestamp,
        projects: snapshot.entries.len(),
        reused,
        scanned: snapshot.entries.len() - reused,
    });
    if report.has_drift() {
        store.append_event(&AuditEvent::DriftDetected {
            at: snapshot.timestamp,
            added: report.added.len(),
            removed: report.removed.len(),
            changed: report.changed.len(),
        });
    }

    let scanned = snapshot.entries.len() - reused;
    Ok(AuditOutcome {
        snapshot,
        report,
        reused,
        scanned,
    })
}

/// List the fleet's project directories: immediate, non-hidden
/// subdirectories of the root, sorted by name.
pub fn discover_projects(root: &Path) -> Result<Vec<PathBuf>> {
    let root_str = root.display().to_string();
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)
        .map_err(|e| AuditError::io(&root_str, e))?
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .is_some_and(|n| !n.to_string_lossy().starts_with('.'))
        })
        .collect();
    dirs.sort();
    Ok(dirs)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Pool config whose workers cannot spawn, forcing the sequential
    /// path; keeps these tests independent of a built worker binary.
    fn local_pool() -> PoolConfig {
        PoolConfig {
            max_workers: 2,
            timeout: Duration::from_secs(10),
            worker_cmd: pool::WorkerCommand {
                program: PathBuf::from("/nonexistent/worker-binary"),
                args: vec![],
            },
        }
    }

    fn write_project(root: &Path, name: &str, lock: Option<&str>) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("package.json"), format!(r#"{{"name":"{name}"}}"#)).unwrap();
        if let Some(content) = lock {
            fs::write(dir.join("bun.lock"), content).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn first_run_scans_everything_and_persists() {
        let tmp = TempDir::new().unwrap();
        let fleet = tmp.path().join("fleet");
        write_project(&fleet, "a", Some("lock-a"));
        write_project(&fleet, "b", None);

        let store = SnapshotStore::new(tmp.path().join("audit"));
        let outcome = run_audit(&fleet, &store, local_pool()).await.unwrap();

        assert_eq!(outcome.scanned, 2);
        assert_eq!(outcome.reused, 0);
        assert_eq!(outcome.report.added, vec!["a", "b"]);
        assert!(store.load().is_some());
    }

    #[tokio::test]
    async fn second_run_skips_unchanged_lockfile_but_rescans_sentinel() {
        let tmp = TempDir::new().unwrap();
        let fleet = tmp.path().join("fleet");
        write_project(&fleet, "a", Some("h1-content"));
        write_project(&fleet, "b", None);

        let store = SnapshotStore::new(tmp.path().join("audit"));
        let first = run_audit(&fleet, &store, local_pool()).await.unwrap();
        assert_eq!(first.scanned, 2);

        // Nothing changed on disk: `a` cache-hits, `b` never does.
        let second = run_audit(&fleet, &store, local_pool()).await.unwrap();
        assert_eq!(second.reused, 1);
        assert_eq!(second.scanned, 1);
        assert!(!second.report.has_drift());
        assert_eq!(second.report.unchanged, 2);

        // Lifecycle buckets identical across the two runs.
        assert_eq!(first.snapshot.entries, second.snapshot.entries);
    }

    #[tokio::test]
    async fn lockfile_change_invalidates_the_cache() {
        let tmp = TempDir::new().unwrap();
        let fleet = tmp.path().join("fleet");
        let a = write_project(&fleet, "a", Some("version-A"));

        let store = SnapshotStore::new(tmp.path().join("audit"));
        run_audit(&fleet, &store, local_pool()).await.unwrap();

        // Same length, different bytes.
        fs::write(a.join("bun.lock"), "version-B").unwrap();
        let second = run_audit(&fleet, &store, local_pool()).await.unwrap();
        assert_eq!(second.reused, 0);
        assert_eq!(second.scanned, 1);
    }

    #[tokio::test]
    async fn removed_project_shows_in_drift() {
        let tmp = TempDir::new().unwrap();
        let fleet = tmp.path().join("fleet");
        write_project(&fleet, "keep", Some("lock"));
        let gone = write_project(&fleet, "gone", Some("lock"));

        let store = SnapshotStore::new(tmp.path().join("audit"));
        run_audit(&fleet, &store, local_pool()).await.unwrap();

        fs::remove_dir_all(&gone).unwrap();
        let second = run_audit(&fleet, &store, local_pool()).await.unwrap();
        assert_eq!(second.report.removed, vec!["gone"]);
        assert!(second.report.has_drift());
    }

    #[tokio::test]
    async fn timed_out_run_does_not_replace_the_snapshot() {
        let tmp = TempDir::new().unwrap();
        let fleet = tmp.path().join("fleet");
        write_project(&fleet, "a", Some("lock"));
        let store = SnapshotStore::new(tmp.path().join("audit"));

        let good = run_audit(&fleet, &store, local_pool()).await.unwrap();

        // Force the pool path with a worker that never answers, and
        // change the lockfile so the cache cannot short-circuit.
        fs::write(fleet.join("a/bun.lock"), "changed").unwrap();
        let stalled = tmp.path().join("stalled.sh");
        fs::write(&stalled, "#!/bin/sh\necho '{\"type\":\"ready\"}'\nexec sleep 600\n").unwrap();
        fs::set_permissions(&stalled, fs::Permissions::from_mode(0o755)).unwrap();
        let config = PoolConfig {
            max_workers: 1,
            timeout: Duration::from_millis(300),
            worker_cmd: pool::WorkerCommand {
                program: PathBuf::from("/bin/sh"),
                args: vec![stalled.display().to_string()],
            },
        };

        let result = run_audit(&fleet, &store, config).await;
        assert!(matches!(result, Err(AuditError::Timeout(_))));

        // Previous snapshot intact.
        let loaded = store.load().unwrap();
        assert_eq!(loaded.entries, good.snapshot.entries);
    }

    #[test]
    fn discover_projects_lists_sorted_non_hidden_dirs() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("zeta")).unwrap();
        fs::create_dir_all(tmp.path().join("alpha")).unwrap();
        fs::create_dir_all(tmp.path().join(".git")).unwrap();
        fs::write(tmp.path().join("stray-file"), "x").unwrap();

        let dirs = discover_projects(tmp.path()).unwrap();
        let names: Vec<_> = dirs
            .iter()
            .map(|d| d.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
