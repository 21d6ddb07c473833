//! JSONL (JSON Lines) history of migration runs
//!
//! Provides append-only logging of run outcomes to `<history_dir>/history.jsonl`

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use crate::run::facade::Completion;

/// Terminal status of a recorded run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Copy succeeded and the report was saved
    Completed,
    /// Copy succeeded but the report could not be saved
    ReportFailed,
    /// Copy failed
    Failed,
    /// Copy tool could not be started
    LaunchFailed,
    /// Operator cancelled the run
    Cancelled,
}

/// One line of the run history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunRecord {
    /// When the run finished
    pub timestamp: DateTime<Utc>,
    /// Source directory
    pub source: String,
    /// Destination directory
    pub destination: String,
    /// Terminal status
    pub status: RunStatus,
    /// Robocopy exit code, when the tool ran to completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Wall-clock duration of the run in seconds
    pub duration_secs: u64,
    /// Report file written for this run, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
    /// Failure or report-write error text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RunRecord {
    /// Build a record from a finished run.
    #[must_use]
    pub fn from_completion(
        source: &Path,
        destination: &Path,
        completion: &Completion,
        duration_secs: u64,
    ) -> Self {
        let (status, exit_code, report_path, message) = match completion {
            Completion::Completed { exit_code, report } => (
                RunStatus::Completed,
                Some(*exit_code),
                Some(report.display().to_string()),
                None,
            ),
            Completion::ReportFailed { exit_code, error } => (
                RunStatus::ReportFailed,
                Some(*exit_code),
                None,
                Some(error.clone()),
            ),
            Completion::Failed {
                exit_code,
                reason,
                report,
                ..
            } => (
                RunStatus::Failed,
                *exit_code,
                report.as_ref().map(|p| p.display().to_string()),
                Some(reason.clone()),
            ),
            Completion::LaunchFailed { error } => {
                (RunStatus::LaunchFailed, None, None, Some(error.clone()))
            }
            Completion::Cancelled => (RunStatus::Cancelled, None, None, None),
        };

        Self {
            timestamp: Utc::now(),
            source: source.display().to_string(),
            destination: destination.display().to_string(),
            status,
            exit_code,
            duration_secs,
            report_path,
            message,
        }
    }
}

/// JSONL logger for run history
///
/// Provides append-only logging to `history.jsonl`.
/// Each line is a JSON object representing a single run.
pub struct HistoryLogger {
    log_path: PathBuf,
}

impl HistoryLogger {
    /// Create a new history logger
    ///
    /// # Arguments
    /// * `log_dir` - Directory where history.jsonl will be stored
    ///
    /// # Errors
    /// Returns an error if the log directory cannot be created
    pub fn new<P: AsRef<Path>>(log_dir: P) -> Result<Self> {
        let log_dir = log_dir.as_ref();

        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

        Ok(Self {
            log_path: log_dir.join("history.jsonl"),
        })
    }

    /// Append a run record to the history
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, the record cannot be
    /// serialized, or the write fails
    pub fn append(&self, record: &RunRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open log file: {}", self.log_path.display()))?;

        let json = serde_json::to_string(record).context("Failed to serialize run record to JSON")?;

        writeln!(file, "{json}").context("Failed to write to log file")?;

        Ok(())
    }

    /// Read all run records, oldest first
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a line is not valid JSON
    pub fn read_all(&self) -> Result<Vec<RunRecord>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.log_path)
            .with_context(|| format!("Failed to read log file: {}", self.log_path.display()))?;

        let mut records = Vec::new();

        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let record: RunRecord = serde_json::from_str(line)
                .with_context(|| format!("Failed to parse line {} as JSON", line_num + 1))?;

            records.push(record);
        }

        Ok(records)
    }

    /// Get the path to the history file
    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::make_test_record;
    use tempfile::TempDir;

    #[test]
    fn test_new_logger_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join(".robomigrate");

        let logger = HistoryLogger::new(&log_dir).unwrap();

        assert!(log_dir.exists());
        assert_eq!(logger.log_path(), log_dir.join("history.jsonl"));
    }

    #[test]
    fn test_append_multiple_records() {
        let temp_dir = TempDir::new().unwrap();
        let logger = HistoryLogger::new(temp_dir.path()).unwrap();

        logger
            .append(&make_test_record(RunStatus::Completed, Some(1)))
            .unwrap();
        logger
            .append(&make_test_record(RunStatus::Failed, Some(8)))
            .unwrap();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_read_all_empty_log() {
        let temp_dir = TempDir::new().unwrap();
        let logger = HistoryLogger::new(temp_dir.path()).unwrap();

        assert!(logger.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_read_all_returns_records_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let logger = HistoryLogger::new(temp_dir.path()).unwrap();

        logger
            .append(&make_test_record(RunStatus::Cancelled, None))
            .unwrap();
        logger
            .append(&make_test_record(RunStatus::Completed, Some(3)))
            .unwrap();

        let records = logger.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, RunStatus::Cancelled);
        assert_eq!(records[1].status, RunStatus::Completed);
        assert_eq!(records[1].exit_code, Some(3));
    }

    #[test]
    fn test_read_all_reports_bad_line() {
        let temp_dir = TempDir::new().unwrap();
        let logger = HistoryLogger::new(temp_dir.path()).unwrap();
        fs::write(logger.log_path(), "{not json}\n").unwrap();

        let err = logger.read_all().unwrap_err().to_string();
        assert!(err.contains("line 1"), "error: {err}");
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&RunStatus::ReportFailed).unwrap(),
            "\"report_failed\""
        );
        assert_eq!(
            serde_json::to_string(&RunStatus::LaunchFailed).unwrap(),
            "\"launch_failed\""
        );
    }

    #[test]
    fn test_optional_fields_omitted_when_none() {
        let record = make_test_record(RunStatus::Cancelled, None);
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("exit_code"));
        assert!(!json.contains("report_path"));
        assert!(!json.contains("message"));
    }

    #[test]
    fn test_from_completion_completed() {
        let completion = Completion::Completed {
            exit_code: 1,
            report: PathBuf::from("/dst/SSFCU_Migration_Log_20250101_000000.txt"),
        };
        let record =
            RunRecord::from_completion(Path::new("/src"), Path::new("/dst"), &completion, 12);

        assert_eq!(record.status, RunStatus::Completed);
        assert_eq!(record.exit_code, Some(1));
        assert_eq!(
            record.report_path.as_deref(),
            Some("/dst/SSFCU_Migration_Log_20250101_000000.txt")
        );
        assert_eq!(record.duration_secs, 12);
        assert_eq!(record.source, "/src");
    }

    #[test]
    fn test_from_completion_failed_keeps_reason() {
        let completion = Completion::Failed {
            exit_code: Some(8),
            reason: "copy errors".to_string(),
            log: "ERROR\n".to_string(),
            report: None,
        };
        let record =
            RunRecord::from_completion(Path::new("/src"), Path::new("/dst"), &completion, 3);

        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(record.exit_code, Some(8));
        assert_eq!(record.message.as_deref(), Some("copy errors"));
        assert!(record.report_path.is_none());
    }
}
