//! Audit command implementation — fleet scan, drift report, exit codes.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::time::Duration;

use hookwatch_audit::pool::PoolConfig;
use hookwatch_audit::store::SnapshotStore;
use hookwatch_audit::{run_audit, AuditError, AuditOutcome, DiffReport, ProjectRecord};

use crate::cli::args::AuditArgs;

/// Exit code when `--compare` detects drift.
const EXIT_DRIFT: i32 = 2;

/// Exit code when the process is interrupted by a signal.
const EXIT_INTERRUPTED: i32 = 130;

/// JSON payload for `--json` output.
#[derive(Serialize)]
struct JsonReport<'a> {
    snapshot: &'a hookwatch_audit::Snapshot,
    report: &'a DiffReport,
    reused: usize,
    scanned: usize,
}

/// Execute the audit command.
pub async fn execute(args: AuditArgs) -> Result<()> {
    let store = args
        .audit_dir
        .clone()
        .map_or_else(|| SnapshotStore::new(SnapshotStore::default_dir()), SnapshotStore::new);

    let mut config = PoolConfig::default();
    if let Some(workers) = args.workers {
        config.max_workers = workers;
    }
    if let Some(secs) = args.timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }

    let outcome = match run_audit(&args.root, &store, config).await {
        Ok(outcome) => outcome,
        Err(e @ AuditError::Interrupted) => {
            eprintln!("{}", e.to_string().bright_red());
            std::process::exit(EXIT_INTERRUPTED);
        }
        Err(e) => return Err(e.into()),
    };

    if args.json {
        let payload = JsonReport {
            snapshot: &outcome.snapshot,
            report: &outcome.report,
            reused: outcome.reused,
            scanned: outcome.scanned,
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        render(&outcome);
    }

    if args.compare && outcome.report.has_drift() {
        std::process::exit(EXIT_DRIFT);
    }
    Ok(())
}

/// Pretty-print the fleet report.
fn render(outcome: &AuditOutcome) {
    let summary = outcome.snapshot.summary();

    println!(
        "{}",
        "  Lifecycle-script audit".bright_cyan().bold()
    );
    println!();
    println!(
        "  {} projects ({} scanned, {} from cache)",
        summary.total_projects.to_string().bright_white(),
        outcome.scanned.to_string().bright_white(),
        outcome.reused.to_string().dimmed()
    );
    println!();

    for record in &outcome.snapshot.entries {
        render_project(record);
    }

    println!();
    println!(
        "  fleet totals: {} default-trusted, {} explicitly trusted, {} blocked, {} native",
        summary.default_trusted.to_string().bright_green(),
        summary.explicitly_trusted.to_string().bright_yellow(),
        summary.blocked.to_string().bright_red(),
        summary.native_flagged.to_string().dimmed()
    );
    println!();

    render_drift(&outcome.report);
}

fn render_project(record: &ProjectRecord) {
    let lock = if record.has_lockfile() {
        record.lock_hash[..12.min(record.lock_hash.len())].dimmed()
    } else {
        "no lockfile ".bright_yellow()
    };

    let blocked = record.lifecycle.blocked.len();
    let blocked_str = if blocked > 0 {
        format!("{blocked} blocked").bright_red()
    } else {
        "0 blocked".bright_green()
    };

    println!(
        "  {} {} {} trusted, {}",
        lock,
        record.folder.bright_white(),
        (record.lifecycle.default_trusted.len() + record.lifecycle.explicitly_trusted.len())
            .to_string()
            .bright_green(),
        blocked_str
    );

    for name in &record.lifecycle.blocked {
        println!("      {} {}", "blocked:".bright_red(), name);
    }
}

fn render_drift(report: &DiffReport) {
    if !report.has_drift() {
        println!(
            "  {} ({} unchanged)",
            "no drift since previous snapshot".bright_green(),
            report.unchanged
        );
        return;
    }

    println!("{}", "  drift detected:".bright_yellow().bold());
    for folder in &report.added {
        println!("    {} {}", "added".bright_green(), folder.bright_white());
    }
    for folder in &report.removed {
        println!("    {} {}", "removed".bright_red(), folder.bright_white());
    }
    for delta in &report.changed {
        println!("    {} {}", "changed".bright_yellow(), delta.folder.bright_white());
        for field in &delta.deltas {
            println!(
                "      {}: {} -> {}",
                field.field.dimmed(),
                field.before,
                field.after
            );
        }
    }
}
