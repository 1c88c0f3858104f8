//! Hidden worker subcommand -- the pool's child-process entry point.

use anyhow::Result;

/// Serve scan jobs over stdin/stdout until shutdown.
pub async fn execute() -> Result<()> {
    hookwatch_audit::pool::run_worker().await?;
    Ok(())
}
