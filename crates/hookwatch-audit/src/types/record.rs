//! Per-project audit record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::hash::NO_LOCKFILE;

/// Audit record for one project in the fleet.
///
/// Created fresh by a scan, or copied verbatim from the previous
/// snapshot on a cache hit. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Directory name of the project (unique key within a snapshot)
    pub folder: String,
    /// Content hash of the dependency lockfile, `"-"` if none exists
    pub lock_hash: String,
    /// Dependency names the project explicitly trusts in its manifest
    #[serde(default)]
    pub trusted_declared: BTreeSet<String>,
    /// Installed dependencies with lifecycle hooks, bucketed by trust
    pub lifecycle: LifecycleBuckets,
    /// Dependencies flagged by the native-code heuristic.
    ///
    /// Annotation only: membership here never changes which bucket a
    /// dependency lands in.
    #[serde(default)]
    pub native: Vec<String>,
}

impl ProjectRecord {
    /// A record with sentinel/default fields for a directory that could
    /// not be read as a project. Scanning never fails outright.
    #[must_use]
    pub fn empty(folder: &str) -> Self {
        Self {
            folder: folder.to_string(),
            lock_hash: NO_LOCKFILE.to_string(),
            trusted_declared: BTreeSet::new(),
            lifecycle: LifecycleBuckets::default(),
            native: Vec::new(),
        }
    }

    /// True if this record carries the no-lockfile sentinel.
    #[must_use]
    pub fn has_lockfile(&self) -> bool {
        self.lock_hash != NO_LOCKFILE
    }
}

/// Dependencies with lifecycle hooks, partitioned by trust policy.
///
/// The three buckets are pairwise disjoint: a dependency is classified
/// exactly once even if it declares several hook names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleBuckets {
    /// Hooks allowed by the static default-trust set
    pub default_trusted: Vec<String>,
    /// Hooks allowed because the project declared trust for the package
    pub explicitly_trusted: Vec<String>,
    /// Hooks the trust policy does not permit to run
    pub blocked: Vec<String>,
}

impl LifecycleBuckets {
    /// Total number of dependencies carrying lifecycle hooks.
    #[must_use]
    pub fn total(&self) -> usize {
        self.default_trusted.len() + self.explicitly_trusted.len() + self.blocked.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_record_uses_sentinel() {
        let rec = ProjectRecord::empty("api");
        assert_eq!(rec.folder, "api");
        assert!(!rec.has_lockfile());
        assert_eq!(rec.lifecycle.total(), 0);
    }

    #[test]
    fn record_roundtrips_through_json() {
        let rec = ProjectRecord {
            folder: "web".into(),
            lock_hash: "abc123".into(),
            trusted_declared: ["sharp".to_string()].into(),
            lifecycle: LifecycleBuckets {
                default_trusted: vec!["esbuild".into()],
                explicitly_trusted: vec!["sharp".into()],
                blocked: vec!["leftpad-native".into()],
            },
            native: vec!["sharp".into()],
        };
        let json = serde_json::to_string(&rec).unwrap();
        let back: ProjectRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }
}
