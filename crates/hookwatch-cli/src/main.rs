//! hookwatch - fleet lifecycle-script audit CLI.

use anyhow::Result;

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
