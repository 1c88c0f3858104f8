//! Error types for the audit library.

use thiserror::Error;

/// Result type alias for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Errors that can occur while auditing a fleet
#[derive(Error, Debug)]
pub enum AuditError {
    /// Filesystem access failed for a specific path
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that was being accessed
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Worker processes could not be spawned
    #[error("failed to spawn worker process: {0}")]
    Spawn(String),

    /// A worker sent a message that does not match the protocol
    #[error("worker protocol violation: {0}")]
    Protocol(String),

    /// The whole batch did not settle before the deadline
    #[error("scan pool timed out after {0} seconds")]
    Timeout(u64),

    /// The batch was cancelled by an external interrupt
    #[error("scan interrupted by signal")]
    Interrupted,

    /// Persisting the new snapshot failed; the previous snapshot is intact
    #[error("failed to persist snapshot at {path}: {reason}")]
    SnapshotWrite {
        /// Destination snapshot path
        path: String,
        /// What went wrong
        reason: String,
    },

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuditError {
    /// Construct an `Io` error from a path and source error.
    pub fn io(path: &str, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }

    /// Returns true if the batch failed because it was too slow,
    /// as opposed to crashing.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
