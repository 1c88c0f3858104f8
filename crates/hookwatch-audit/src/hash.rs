//! Streaming SHA-256 hashing via `ring::digest`.
//!
//! Lockfile identity is a content hash: any byte change to the lockfile
//! must produce a different hash, because the incremental cache is gated
//! solely on hash equality.

use ring::digest::{Context, SHA256};
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::error::{AuditError, Result};

/// Buffer size for streaming file reads (64 KiB).
const BUF_SIZE: usize = 64 * 1024;

/// Sentinel hash recorded when a project has no lockfile.
///
/// The sentinel never satisfies the cache rule: a project without a
/// lockfile is rescanned on every run.
pub const NO_LOCKFILE: &str = "-";

/// Compute SHA-256 of a file, streaming to avoid loading it all into memory.
///
/// Returns lowercase hex-encoded digest.
///
/// # Errors
///
/// Returns `AuditError::Io` if the file cannot be opened or read.
pub async fn sha256_file(path: &Path) -> Result<String> {
    let path_str = path.display().to_string();
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| AuditError::io(&path_str, e))?;

    let mut context = Context::new(&SHA256);
    let mut buf = vec![0u8; BUF_SIZE];

    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| AuditError::io(&path_str, e))?;
        if n == 0 {
            break;
        }
        context.update(&buf[..n]);
    }

    let digest = context.finish();
    Ok(hex::encode(digest.as_ref()))
}

/// Compute SHA-256 of raw bytes.
#[must_use]
pub fn sha256_bytes(data: &[u8]) -> String {
    let digest = ring::digest::digest(&SHA256, data);
    hex::encode(digest.as_ref())
}
