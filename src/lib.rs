//! robomigrate - Supervised robocopy folder migration
//!
//! Runs robocopy as a child process, turns its output into progress updates,
//! classifies the exit code, and saves a timestamped report in the destination.
//! One run at a time; a front end drives it through [`Migrator`] and listens
//! on its event channel.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

pub mod cli;
pub mod log;
pub mod robocopy;
pub mod run;

#[cfg(test)]
mod testutil;

// Re-export commonly used types
pub use log::{HistoryLogger, ReportWriter, RunRecord, SharedLog};
pub use robocopy::cli::build_command;
pub use robocopy::outcome::{classify, RunOutcome};
pub use robocopy::progress::{parse_line, ProgressSample, ProgressTracker};
pub use run::config::MigrationConfig;
pub use run::facade::{Completion, MigrationEvent, Migrator, RunPhase};
pub use run::request::{CopyRequest, SubmitError};
pub use run::supervisor::{CancelOutcome, RunHandle, SupervisorError};
