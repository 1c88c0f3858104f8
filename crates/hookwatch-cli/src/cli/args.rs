//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Audit a fleet of projects for dependency lifecycle scripts
///
/// Walks every project under a root directory, finds installed
/// dependencies that declare install-time hooks, and classifies them
/// against the host's trust policy. Unchanged projects are served from
/// an incremental cache keyed on lockfile content.
#[derive(Parser, Debug)]
#[command(name = "hookwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (diagnostic logs to stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan the fleet and report lifecycle-script classifications
    Audit(AuditArgs),

    /// Worker process entry point (spawned by the pool, not for direct use)
    #[command(hide = true)]
    Worker,
}

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Root directory containing one subdirectory per project
    pub root: PathBuf,

    /// Exit non-zero when drift against the previous snapshot is detected
    #[arg(long)]
    pub compare: bool,

    /// Emit the snapshot and drift report as JSON
    #[arg(long)]
    pub json: bool,

    /// Maximum worker processes (default 8, further capped by host parallelism)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Global scan deadline in seconds (default 30)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Audit directory for the snapshot and event log
    /// (default: `audit/` next to the executable)
    #[arg(long)]
    pub audit_dir: Option<PathBuf>,
}
