//! Terminal display for migration runs
//!
//! Renders orchestrator events as human-readable terminal output.
//! All output goes to stderr so stdout remains clean for piping.

use colored::Colorize;

use crate::robocopy::outcome::describe_exit_code;
use crate::run::facade::{Completion, MigrationEvent, RunPhase};

const BAR_WIDTH: usize = 30;

/// Display handler for one migration run
pub struct MigrationDisplay {
    source: String,
    destination: String,
    last_percent: Option<u8>,
}

impl MigrationDisplay {
    /// Create a display for a copy from `source` to `destination`
    #[must_use]
    pub fn new(source: &str, destination: &str) -> Self {
        Self {
            source: source.to_string(),
            destination: destination.to_string(),
            last_percent: None,
        }
    }

    /// Print the run header
    pub fn print_header(&self) {
        eprintln!("\n{} {}", "===".bold().cyan(), "Migration".bold().cyan());
        eprintln!("  {} {}", "Source:".dimmed(), self.source);
        eprintln!("  {} {}", "Destination:".dimmed(), self.destination);
        eprintln!("{}", "─".repeat(50).dimmed());
    }

    /// Render one event to stderr
    pub fn render_event(&mut self, event: &MigrationEvent) {
        match event {
            MigrationEvent::Status { phase, text } => {
                // The Idle status repeats what Finished prints.
                if *phase != RunPhase::Idle {
                    eprintln!("  {} {}", phase_marker(*phase), text);
                }
            }
            MigrationEvent::Progress {
                percent,
                eta,
                status_text,
            } => {
                // Only redraw when the percentage moves; ETA-only lines are noise.
                if percent.is_some() && *percent != self.last_percent {
                    self.last_percent = *percent;
                    let bar = progress_bar(percent.unwrap_or(0), BAR_WIDTH);
                    let eta = eta
                        .as_deref()
                        .map_or_else(String::new, |e| format!("  ETA {e}"));
                    eprintln!("  {}{}", bar.green(), eta.dimmed());
                } else if percent.is_none() && self.last_percent.is_none() {
                    eprintln!("  {}", status_text.dimmed());
                }
            }
            MigrationEvent::Finished(completion) => render_completion(completion),
        }
    }
}

fn phase_marker(phase: RunPhase) -> colored::ColoredString {
    match phase {
        RunPhase::Idle => "■".dimmed(),
        RunPhase::Validating | RunPhase::Completing => "…".cyan(),
        RunPhase::Running => "▶".blue(),
        RunPhase::Cancelling => "⚠".yellow().bold(),
    }
}

/// Render a fixed-width text bar such as `[#####.....]  50%`
#[must_use]
pub fn progress_bar(percent: u8, width: usize) -> String {
    let percent = percent.min(100);
    let filled = width * usize::from(percent) / 100;
    format!(
        "[{}{}] {percent:>3}%",
        "#".repeat(filled),
        ".".repeat(width - filled)
    )
}

/// Render the post-run summary
pub fn render_completion(completion: &Completion) {
    eprintln!("{}", "─".repeat(50).dimmed());

    match completion {
        Completion::Completed { exit_code, report } => {
            eprintln!("  {}", "COMPLETED".green().bold());
            eprintln!(
                "  {} {exit_code} ({})",
                "Exit code:".dimmed(),
                describe_exit_code(*exit_code)
            );
            eprintln!("  {} {}", "Report:".dimmed(), report.display());
        }
        Completion::ReportFailed { exit_code, error } => {
            eprintln!("  {}", "COMPLETED".green().bold());
            eprintln!(
                "  {} {exit_code} ({})",
                "Exit code:".dimmed(),
                describe_exit_code(*exit_code)
            );
            eprintln!(
                "  {} report not saved: {}",
                "⚠".yellow().bold(),
                error.yellow()
            );
        }
        Completion::Failed {
            exit_code,
            reason,
            report,
            ..
        } => {
            eprintln!("  {}", "FAILED".red().bold());
            eprintln!("  {}", reason.red());
            if let Some(code) = exit_code {
                eprintln!("  {} {code}", "Exit code:".dimmed());
            }
            if let Some(report) = report {
                eprintln!("  {} {}", "Report:".dimmed(), report.display());
            }
        }
        Completion::LaunchFailed { error } => {
            eprintln!("  {}", "FAILED TO START".red().bold());
            eprintln!("  {}", error.red());
        }
        Completion::Cancelled => {
            eprintln!("  {}", "CANCELLED".yellow().bold());
        }
    }

    eprintln!();
}
