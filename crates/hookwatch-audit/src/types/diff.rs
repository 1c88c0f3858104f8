//! Snapshot drift report types.

use serde::{Deserialize, Serialize};

/// Differences between two consecutive snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffReport {
    /// Project folders present now but not in the previous snapshot
    pub added: Vec<String>,
    /// Project folders present previously but gone now
    pub removed: Vec<String>,
    /// Projects whose lifecycle classification changed
    pub changed: Vec<ProjectDelta>,
    /// Projects present in both snapshots with identical bucket counts
    pub unchanged: usize,
}

impl DiffReport {
    /// True if anything about the fleet changed between the two runs.
    #[must_use]
    pub fn has_drift(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || !self.changed.is_empty()
    }
}

/// Per-project change description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDelta {
    /// Which project changed
    pub folder: String,
    /// Which bucket counts moved, and how
    pub deltas: Vec<FieldDelta>,
}

/// A single bucket-count change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDelta {
    /// Bucket name: `default_trusted`, `explicitly_trusted`, or `blocked`
    pub field: String,
    /// Count in the previous snapshot
    pub before: usize,
    /// Count in the current snapshot
    pub after: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_has_no_drift() {
        let report = DiffReport::default();
        assert!(!report.has_drift());
    }

    #[test]
    fn any_change_is_drift() {
        let report = DiffReport {
            added: vec!["new-service".into()],
            ..DiffReport::default()
        };
        assert!(report.has_drift());

        let report = DiffReport {
            changed: vec![ProjectDelta {
                folder: "api".into(),
                deltas: vec![FieldDelta {
                    field: "blocked".into(),
                    before: 1,
                    after: 2,
                }],
            }],
            ..DiffReport::default()
        };
        assert!(report.has_drift());
    }
}
