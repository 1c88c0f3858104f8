//! Worker process entry point.
//!
//! Speaks the JSON-lines protocol over stdin/stdout: announce `ready`,
//! serve `scan` requests one at a time, answer each with `result` or
//! `error` followed by the next `ready`, exit on `shutdown` or EOF.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tracing::warn;

use crate::error::{AuditError, Result};
use crate::scanner::scan_project;
use crate::types::{WorkerReply, WorkerRequest};

/// Run the worker loop until shutdown or EOF on stdin.
///
/// # Errors
///
/// Returns an error only if stdout or stdin break, which means the
/// coordinator is gone and there is nobody left to serve.
pub async fn run_worker() -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    send_reply(&mut stdout, &WorkerReply::Ready).await?;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| AuditError::Protocol(format!("worker stdin broke: {e}")))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request = match serde_json::from_str::<WorkerRequest>(&line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, %line, "rejecting unrecognized coordinator message");
                continue;
            }
        };

        match request {
            WorkerRequest::Scan { id, dir } => {
                let reply = if dir.is_dir() {
                    WorkerReply::Completed {
                        id,
                        record: scan_project(&dir).await,
                    }
                } else {
                    WorkerReply::Failed {
                        id,
                        reason: format!("not a directory: {}", dir.display()),
                    }
                };
                send_reply(&mut stdout, &reply).await?;
                send_reply(&mut stdout, &WorkerReply::Ready).await?;
            }
            WorkerRequest::Shutdown => break,
        }
    }

    Ok(())
}

/// Write one reply as a JSON line to stdout.
async fn send_reply(stdout: &mut Stdout, reply: &WorkerReply) -> Result<()> {
    let mut line = serde_json::to_string(reply)?;
    line.push('\n');
    stdout
        .write_all(line.as_bytes())
        .await
        .map_err(|e| AuditError::Protocol(format!("worker stdout broke: {e}")))?;
    stdout
        .flush()
        .await
        .map_err(|e| AuditError::Protocol(format!("worker stdout broke: {e}")))?;
    Ok(())
}
