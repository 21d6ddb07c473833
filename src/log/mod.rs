//! Logging and observability
//!
//! This module captures tool output, writes the per-run report, and keeps
//! the JSONL history of finished runs.

pub mod accumulator;
pub mod jsonl;
pub mod report;

pub use accumulator::{LogAccumulator, SharedLog};
pub use jsonl::{HistoryLogger, RunRecord, RunStatus};
pub use report::{ReportWriter, RunReport};
