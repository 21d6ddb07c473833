//! robomigrate - Supervised robocopy folder migration
//!
//! CLI entry point for the migration orchestrator.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use robomigrate::cli::{open_report, MigrationDisplay};
use robomigrate::log::jsonl::{HistoryLogger, RunRecord};
use robomigrate::run::config::MigrationConfig;
use robomigrate::run::facade::{Completion, Migrator};

/// Exit status when the request is rejected before anything runs
const EXIT_REJECTED: i32 = 2;
/// Exit status after an operator cancel (128 + SIGINT)
const EXIT_CANCELLED: i32 = 130;

/// Supervised robocopy folder migration
///
/// Copies a source folder tree to a destination with robocopy, shows
/// progress, and saves a timestamped report next to the copied files.
#[derive(Parser, Debug)]
#[command(name = "robomigrate", version, about)]
struct Cli {
    /// Folder to copy from
    #[arg(long)]
    source: String,

    /// Folder to copy into (created if missing)
    #[arg(long)]
    destination: String,

    /// Path to the robomigrate.toml configuration file
    #[arg(long, default_value = "robomigrate.toml")]
    config: PathBuf,

    /// Directory for the run history (.robomigrate by default)
    #[arg(long, default_value = ".robomigrate")]
    history_dir: PathBuf,

    /// Open the report in the default viewer after a successful copy
    #[arg(long)]
    open: bool,
}

/// Map a terminal state to the process exit status.
fn exit_status(completion: &Completion) -> i32 {
    match completion {
        Completion::Completed { .. } => 0,
        Completion::Cancelled => EXIT_CANCELLED,
        Completion::ReportFailed { .. }
        | Completion::Failed { .. }
        | Completion::LaunchFailed { .. } => 1,
    }
}

/// Install the stderr tracing subscriber, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Append the run to the history. A history failure never changes the run's result.
fn record_history(logger: &HistoryLogger, cli: &Cli, completion: &Completion, duration_secs: u64) {
    let record = RunRecord::from_completion(
        Path::new(cli.source.trim()),
        Path::new(cli.destination.trim()),
        completion,
        duration_secs,
    );
    if let Err(err) = logger.append(&record) {
        warn!(error = %format!("{err:#}"), "failed to write run history");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = MigrationConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config from '{}'", cli.config.display()))?;
    let history =
        HistoryLogger::new(&cli.history_dir).context("Failed to initialize run history")?;

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let migrator = Arc::new(Migrator::new(config, events_tx));
    let mut display = MigrationDisplay::new(cli.source.trim(), cli.destination.trim());
    let started = Instant::now();

    let mut job = match migrator.submit(&cli.source, &cli.destination) {
        Ok(job) => job,
        Err(err) => {
            eprintln!("{} {err}", "Error:".red().bold());
            std::process::exit(EXIT_REJECTED);
        }
    };
    display.print_header();

    let completion = loop {
        tokio::select! {
            Some(event) = events_rx.recv() => display.render_event(&event),
            joined = &mut job => break joined.context("Migration task failed")?,
            _ = tokio::signal::ctrl_c() => {
                // Failures are already shown as a status event.
                if let Err(err) = migrator.cancel().await {
                    warn!(error = %err, "cancel failed");
                }
            }
        }
    };
    while let Ok(event) = events_rx.try_recv() {
        display.render_event(&event);
    }

    record_history(&history, &cli, &completion, started.elapsed().as_secs());

    if cli.open {
        if let Completion::Completed { report, .. } = &completion {
            if let Err(err) = open_report(report) {
                eprintln!("{} {err:#}", "Warning:".yellow().bold());
            }
        }
    }

    match exit_status(&completion) {
        0 => Ok(()),
        code => std::process::exit(code),
    }
}
