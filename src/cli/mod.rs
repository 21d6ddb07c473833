//! CLI output formatting
//!
//! Provides human-readable terminal display for migration runs and a
//! helper to open the saved report.

pub mod display;
pub mod viewer;

pub use display::{progress_bar, render_completion, MigrationDisplay};
pub use viewer::open_report;
