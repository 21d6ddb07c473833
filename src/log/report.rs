//! Run report writer
//!
//! Writes the human-readable record of a finished run into the destination
//! directory as `<prefix>_<YYYYMMDD_HHMMSS>.txt`. The file is written to a
//! temporary sibling first and renamed into place, so readers never see a
//! half-written report.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::run::config::ReportConfig;
use crate::run::request::CopyRequest;

/// Width of the `-` rule around the captured output.
const OUTPUT_RULE_WIDTH: usize = 40;

/// Immutable snapshot of one run, rendered into the report file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// When the report was produced (local time)
    pub timestamp: DateTime<Local>,
    /// Source directory
    pub source: PathBuf,
    /// Destination directory
    pub destination: PathBuf,
    /// Process exit code (None if the process was killed by a signal)
    pub exit_code: Option<i32>,
    /// Failure reason; None for a successful run
    pub failure: Option<String>,
    /// Everything the tool printed, verbatim
    pub full_log: String,
}

impl RunReport {
    /// Render the report document.
    #[must_use]
    pub fn render(&self, config: &ReportConfig) -> String {
        let exit_code = self
            .exit_code
            .map_or_else(|| "unknown".to_string(), |c| c.to_string());

        let mut doc = String::with_capacity(self.full_log.len() + 512);
        push_line(&mut doc, &config.header);
        push_line(&mut doc, &"=".repeat(config.header.chars().count()));
        push_line(
            &mut doc,
            &format!("Date/Time: {}", self.timestamp.format("%Y-%m-%d %H:%M:%S")),
        );
        push_line(&mut doc, &format!("Source: {}", self.source.display()));
        push_line(
            &mut doc,
            &format!("Destination: {}", self.destination.display()),
        );
        push_line(&mut doc, &format!("Exit Code: {exit_code}"));
        if let Some(reason) = &self.failure {
            push_line(&mut doc, &format!("Status: FAILED: {reason}"));
        }
        push_line(&mut doc, "");
        push_line(&mut doc, "Robocopy Output:");
        push_line(&mut doc, &"-".repeat(OUTPUT_RULE_WIDTH));
        doc.push_str(&self.full_log);
        push_line(&mut doc, &"-".repeat(OUTPUT_RULE_WIDTH));
        push_line(&mut doc, &config.footer);
        doc
    }

    /// File name for this report, e.g. `SSFCU_Migration_Log_20250101_093000.txt`
    #[must_use]
    pub fn file_name(&self, config: &ReportConfig) -> String {
        let stamp = self.timestamp.format("%Y%m%d_%H%M%S");
        if self.failure.is_some() {
            format!("{}_{stamp}_FAILED.txt", config.prefix)
        } else {
            format!("{}_{stamp}.txt", config.prefix)
        }
    }
}

fn push_line(doc: &mut String, line: &str) {
    doc.push_str(line);
    doc.push('\n');
}

/// Persists run reports into the destination directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    config: ReportConfig,
}

impl ReportWriter {
    /// Create a writer using the given report settings
    #[must_use]
    pub const fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Write the report for a successful run and return its path.
    pub fn write(&self, request: &CopyRequest, exit_code: i32, full_log: &str) -> Result<PathBuf> {
        let report = RunReport {
            timestamp: Local::now(),
            source: request.source().to_path_buf(),
            destination: request.destination().to_path_buf(),
            exit_code: Some(exit_code),
            failure: None,
            full_log: full_log.to_string(),
        };
        self.persist(&report)
    }

    /// Write a diagnostic report for a failed run and return its path.
    pub fn write_failure(
        &self,
        request: &CopyRequest,
        exit_code: Option<i32>,
        reason: &str,
        full_log: &str,
    ) -> Result<PathBuf> {
        let report = RunReport {
            timestamp: Local::now(),
            source: request.source().to_path_buf(),
            destination: request.destination().to_path_buf(),
            exit_code,
            failure: Some(reason.to_string()),
            full_log: full_log.to_string(),
        };
        self.persist(&report)
    }

    /// Atomically write a report (write to temp, then rename).
    ///
    /// An existing report is never replaced: a second report stamped in the
    /// same second gets a `_1`, `_2`, ... suffix.
    pub fn persist(&self, report: &RunReport) -> Result<PathBuf> {
        let path = unused_path(&report.destination.join(report.file_name(&self.config)));
        let tmp_path = temp_path_for(&path);
        let document = report.render(&self.config);

        if let Err(err) = std::fs::write(&tmp_path, document.as_bytes()) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(err)
                .with_context(|| format!("Failed to write report: {}", tmp_path.display()));
        }

        if let Err(err) = std::fs::rename(&tmp_path, &path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(err).with_context(|| {
                format!(
                    "Failed to rename {} -> {}",
                    tmp_path.display(),
                    path.display()
                )
            });
        }

        Ok(path)
    }
}

/// `path` itself, or the first `<stem>_<n>.<ext>` sibling that does not exist yet.
fn unused_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    let extension = path
        .extension()
        .map_or_else(String::new, |e| format!(".{}", e.to_string_lossy()));

    (1u32..)
        .map(|n| path.with_file_name(format!("{stem}_{n}{extension}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.tmp"))
}
