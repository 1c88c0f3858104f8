//! Worker pool -- distributes per-project scan jobs across OS worker
//! processes.
//!
//! The coordinator owns the job cursor and the results array; workers
//! own nothing beyond the one job they currently hold. Dispatch is
//! pull-based: a worker announces `ready`, the coordinator hands it the
//! next undispatched job or a shutdown. Faster workers naturally take
//! more jobs; there is no explicit work queue.
//!
//! Failure ladder:
//! - one job fails in a worker: rescan that project locally, once, and
//!   keep dispatching to the worker that reported the error;
//! - a worker breaks the protocol or the pool cannot spawn at all: scan
//!   everything sequentially in this process;
//! - the global deadline passes: the whole batch fails with a timeout,
//!   no partial results;
//! - ctrl-c: the batch fails as interrupted. Worker processes are
//!   killed on drop in every exit path.

pub mod worker;

pub use worker::run_worker;

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{AuditError, Result};
use crate::scanner::scan_project;
use crate::types::{ProjectRecord, WorkerReply, WorkerRequest};

/// Hard ceiling on pool size regardless of host parallelism.
pub const MAX_WORKERS: usize = 8;

/// Default wall-clock budget for a whole batch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Command used to launch a worker process.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    /// Program to execute
    pub program: PathBuf,
    /// Arguments passed to the program
    pub args: Vec<String>,
}

impl WorkerCommand {
    /// Re-invoke the current executable with the `worker` subcommand.
    #[must_use]
    pub fn current_exe() -> Self {
        Self {
            program: std::env::current_exe().unwrap_or_else(|_| PathBuf::from("hookwatch")),
            args: vec!["worker".to_string()],
        }
    }
}

/// Pool tuning knobs. The defaults mirror the constants the tool has
/// always shipped with; they are configuration, not a dynamic formula.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Upper bound on worker processes (further capped by job count and
    /// host parallelism)
    pub max_workers: usize,
    /// Global all-or-nothing deadline for one batch
    pub timeout: Duration,
    /// How to launch a worker
    pub worker_cmd: WorkerCommand,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: MAX_WORKERS,
            timeout: DEFAULT_TIMEOUT,
            worker_cmd: WorkerCommand::current_exe(),
        }
    }
}

/// The coordinator. One instance per batch invocation; re-entrant
/// because all state lives in a per-call `CoordinatorState`, never in
/// process-wide globals.
#[derive(Debug, Clone, Default)]
pub struct WorkerPool {
    config: PoolConfig,
}

/// Shared coordinator state for one batch. Mutated exclusively from the
/// coordinator's event loop.
struct CoordinatorState {
    /// Next undispatched job index (shared monotonic cursor)
    cursor: usize,
    /// Results slotted by job id
    results: Vec<Option<ProjectRecord>>,
    /// Jobs without a result yet
    remaining: usize,
}

impl CoordinatorState {
    fn new(jobs: usize) -> Self {
        Self {
            cursor: 0,
            results: (0..jobs).map(|_| None).collect(),
            remaining: jobs,
        }
    }

    fn settled(&self) -> bool {
        self.remaining == 0
    }

    fn store(&mut self, id: usize, record: ProjectRecord) {
        match self.results.get_mut(id) {
            Some(slot) if slot.is_none() => {
                *slot = Some(record);
                self.remaining -= 1;
            }
            Some(_) => warn!(id, "duplicate result for job, ignoring"),
            None => warn!(id, "result for unknown job id, ignoring"),
        }
    }

    fn into_records(self) -> Vec<ProjectRecord> {
        self.results.into_iter().flatten().collect()
    }
}

/// One event arriving at the coordinator from a worker's reader task.
enum PoolEvent {
    Reply(usize, WorkerReply),
    Malformed(usize, String),
}

/// A live worker as seen by the coordinator.
struct WorkerHandle {
    _child: Child,
    stdin: ChildStdin,
}

impl WorkerPool {
    /// Pool with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Pool with custom configuration.
    #[must_use]
    pub const fn with_config(config: PoolConfig) -> Self {
        Self { config }
    }

    /// Scan every directory, returning one record per input directory
    /// in input order.
    ///
    /// # Errors
    ///
    /// `AuditError::Timeout` if the batch misses the global deadline,
    /// `AuditError::Interrupted` on ctrl-c. Per-job and infrastructure
    /// failures are recovered internally and do not surface.
    pub async fn scan_all(&self, dirs: &[PathBuf]) -> Result<Vec<ProjectRecord>> {
        if dirs.is_empty() {
            return Ok(Vec::new());
        }

        let pool_size = pool_size(self.config.max_workers, dirs.len());
        let (workers, rx) = match self.spawn_workers(pool_size) {
            Ok(spawned) => spawned,
            Err(e) => {
                warn!(error = %e, "cannot spawn workers, scanning sequentially");
                return Ok(scan_sequential(dirs).await);
            }
        };

        debug!(workers = pool_size, jobs = dirs.len(), "pool started");

        // The ctrl-c future is dropped with the select, so no signal
        // handler outlives the batch.
        let outcome = tokio::select! {
            res = tokio::time::timeout(self.config.timeout, run_pool(workers, rx, dirs)) => {
                match res {
                    Ok(inner) => inner,
                    Err(_) => Err(AuditError::Timeout(self.config.timeout.as_secs())),
                }
            }
            _ = tokio::signal::ctrl_c() => Err(AuditError::Interrupted),
        };

        match outcome {
            Ok(records) => Ok(records),
            Err(AuditError::Protocol(reason)) => {
                warn!(%reason, "worker protocol violation, scanning sequentially");
                Ok(scan_sequential(dirs).await)
            }
            Err(e) => Err(e),
        }
    }

    /// Spawn the worker processes and their stdout reader tasks.
    fn spawn_workers(
        &self,
        count: usize,
    ) -> Result<(Vec<WorkerHandle>, mpsc::Receiver<PoolEvent>)> {
        let (tx, rx) = mpsc::channel(count * 2 + 1);
        let mut workers = Vec::with_capacity(count);

        for idx in 0..count {
            let mut child = Command::new(&self.config.worker_cmd.program)
                .args(&self.config.worker_cmd.args)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| AuditError::Spawn(e.to_string()))?;

            let stdin = child
                .stdin
                .take()
                .ok_or_else(|| AuditError::Spawn("worker stdin unavailable".into()))?;
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| AuditError::Spawn("worker stdout unavailable".into()))?;

            let tx = tx.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let event = match serde_json::from_str::<WorkerReply>(&line) {
                        Ok(reply) => PoolEvent::Reply(idx, reply),
                        Err(_) => PoolEvent::Malformed(idx, line),
                    };
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            });

            workers.push(WorkerHandle {
                _child: child,
                stdin,
            });
        }

        drop(tx);
        Ok((workers, rx))
    }
}

/// Coordinator event loop: select over worker messages, dispatch off
/// the shared cursor, reassemble results by job id.
async fn run_pool(
    mut workers: Vec<WorkerHandle>,
    mut rx: mpsc::Receiver<PoolEvent>,
    dirs: &[PathBuf],
) -> Result<Vec<ProjectRecord>> {
    let mut state = CoordinatorState::new(dirs.len());

    while !state.settled() {
        let Some(event) = rx.recv().await else {
            return Err(AuditError::Protocol(
                "all workers exited before the batch settled".into(),
            ));
        };

        match event {
            PoolEvent::Reply(idx, WorkerReply::Ready) => {
                let request = if state.cursor < dirs.len() {
                    let id = state.cursor;
                    state.cursor += 1;
                    WorkerRequest::Scan {
                        id,
                        dir: dirs[id].clone(),
                    }
                } else {
                    WorkerRequest::Shutdown
                };
                send_request(&mut workers[idx].stdin, &request).await?;
            }
            PoolEvent::Reply(_, WorkerReply::Completed { id, record }) => {
                state.store(id, record);
            }
            PoolEvent::Reply(idx, WorkerReply::Failed { id, reason }) => {
                // Bounded retry: exactly one fallback attempt, on a
                // different execution path (this process, no pool).
                warn!(worker = idx, id, %reason, "job failed in worker, rescanning locally");
                let record = scan_project(&dirs[id]).await;
                state.store(id, record);
            }
            PoolEvent::Malformed(idx, line) => {
                return Err(AuditError::Protocol(format!(
                    "worker {idx} sent unrecognized message: {line}"
                )));
            }
        }
    }

    // Idle workers that never saw the exhausted cursor still need a
    // shutdown; ignore write errors from already-exited workers.
    for worker in &mut workers {
        let _ = send_request(&mut worker.stdin, &WorkerRequest::Shutdown).await;
    }

    Ok(state.into_records())
}

/// Write one request as a JSON line to a worker's stdin.
async fn send_request(stdin: &mut ChildStdin, request: &WorkerRequest) -> Result<()> {
    let mut line = serde_json::to_string(request)?;
    line.push('\n');
    stdin
        .write_all(line.as_bytes())
        .await
        .map_err(|e| AuditError::Protocol(format!("worker stdin closed: {e}")))?;
    stdin
        .flush()
        .await
        .map_err(|e| AuditError::Protocol(format!("worker stdin closed: {e}")))?;
    Ok(())
}

/// Scan every directory in this process, in order. The zero-worker
/// path: slower, but the audit still works.
pub async fn scan_sequential(dirs: &[PathBuf]) -> Vec<ProjectRecord> {
    let mut records = Vec::with_capacity(dirs.len());
    for dir in dirs {
        records.push(scan_project(dir).await);
    }
    records
}

/// Effective pool size: host parallelism, capped by job count and the
/// configured maximum.
fn pool_size(max_workers: usize, jobs: usize) -> usize {
    let parallelism = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    parallelism.min(jobs).min(max_workers).max(1)
}
