//! Robocopy integration
//!
//! This module handles command building, progress-line parsing,
//! and exit-code interpretation for the wrapped copy tool.

pub mod cli;
pub mod outcome;
pub mod progress;
