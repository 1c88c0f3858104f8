//! Worker IPC protocol messages.
//!
//! One JSON object per line over the worker's stdin/stdout. Messages
//! are internally tagged; a line that does not deserialize into a known
//! variant is a protocol violation, rejected and logged rather than
//! silently ignored.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::record::ProjectRecord;

/// A single unit of work: scan one project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanJob {
    /// Index into the caller's input list; results are reassembled by id
    pub id: usize,
    /// Project directory to scan
    pub dir: PathBuf,
}

/// Coordinator → worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerRequest {
    /// Scan the given directory and report back under `id`
    Scan {
        /// Job id, echoed back in the reply
        id: usize,
        /// Project directory
        dir: PathBuf,
    },
    /// No more work; exit cleanly
    Shutdown,
}

/// Worker → coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerReply {
    /// Sent once at startup and after each finished job; the trigger
    /// for the next dispatch (pull-based protocol)
    Ready,
    /// Job completed
    #[serde(rename = "result")]
    Completed {
        /// Job id this record answers
        id: usize,
        /// The scanned record
        record: ProjectRecord,
    },
    /// Job failed inside the worker
    #[serde(rename = "error")]
    Failed {
        /// Job id that failed
        id: usize,
        /// Human-readable failure description
        reason: String,
    },
}
