//! Shared test utilities
//!
//! Common helpers used across test modules. Only compiled in test builds.

use std::path::Path;

use chrono::Utc;

use crate::log::jsonl::{RunRecord, RunStatus};
use crate::run::request::CopyRequest;

/// Create `<root>/src` and return a request copying it to `<root>/dst`.
///
/// The destination directory is created too, so report writes succeed.
#[must_use]
pub fn make_test_request(root: &Path) -> CopyRequest {
    let source = root.join("src");
    let destination = root.join("dst");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::create_dir_all(&destination).unwrap();
    CopyRequest::validate(source.to_str().unwrap(), destination.to_str().unwrap()).unwrap()
}

/// Create a minimal `RunRecord` for testing with sensible defaults.
#[must_use]
pub fn make_test_record(status: RunStatus, exit_code: Option<i32>) -> RunRecord {
    RunRecord {
        timestamp: Utc::now(),
        source: "/data/src".to_string(),
        destination: "/data/dst".to_string(),
        status,
        exit_code,
        duration_secs: 60,
        report_path: None,
        message: None,
    }
}
