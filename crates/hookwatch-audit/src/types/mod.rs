//! Core types for the audit system.

pub mod diff;
pub mod message;
pub mod record;
pub mod snapshot;

pub use diff::{DiffReport, FieldDelta, ProjectDelta};
pub use message::{ScanJob, WorkerReply, WorkerRequest};
pub use record::{LifecycleBuckets, ProjectRecord};
pub use snapshot::{Snapshot, SnapshotSummary};
