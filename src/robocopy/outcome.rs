//! Robocopy exit-code classification
//!
//! Robocopy's exit code is a bit field. Values below 8 mean some combination
//! of "copied", "extra" and "mismatched" files and are not failures; 8 and
//! above mean at least one copy failed or a fatal error stopped the run.

use std::fmt;

/// Lowest exit code that robocopy uses to signal a failed copy.
pub const FAILURE_THRESHOLD: i32 = 8;

/// Outcome of a single robocopy run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Exit code 0–7: the copy finished, possibly with nothing to do
    Succeeded {
        /// Process exit code
        exit_code: i32,
    },
    /// Exit code 8 or above, or no exit code at all
    Failed {
        /// Process exit code (None if the process was killed by a signal)
        exit_code: Option<i32>,
        /// Human-readable failure reason
        reason: String,
    },
    /// The run was cancelled by the operator
    Cancelled,
}

impl RunOutcome {
    /// Returns true for `Succeeded`
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded { exit_code } => write!(f, "succeeded (exit code {exit_code})"),
            Self::Failed {
                exit_code: Some(code),
                reason,
            } => write!(f, "failed (exit code {code}): {reason}"),
            Self::Failed {
                exit_code: None,
                reason,
            } => write!(f, "failed: {reason}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Classify a robocopy exit code.
///
/// Total and pure: `>= 8` is a failure, everything else is a success.
#[must_use]
pub fn classify(exit_code: i32) -> RunOutcome {
    if exit_code >= FAILURE_THRESHOLD {
        RunOutcome::Failed {
            exit_code: Some(exit_code),
            reason: format!("Robocopy finished with errors: {}", describe_exit_code(exit_code)),
        }
    } else {
        RunOutcome::Succeeded { exit_code }
    }
}

/// Classify a process exit that may not carry a code.
#[must_use]
pub fn classify_status(exit_code: Option<i32>) -> RunOutcome {
    exit_code.map_or_else(
        || RunOutcome::Failed {
            exit_code: None,
            reason: "Robocopy terminated without an exit code".to_string(),
        },
        classify,
    )
}

/// Describe a robocopy exit code using its documented bit meanings.
#[must_use]
pub fn describe_exit_code(exit_code: i32) -> String {
    if exit_code == 0 {
        return "no files were copied; source and destination are in sync".to_string();
    }
    if exit_code < 0 {
        return format!("unexpected exit code {exit_code}");
    }

    let mut parts = Vec::new();
    if exit_code & 16 != 0 {
        parts.push("fatal error, no files were copied");
    }
    if exit_code & 8 != 0 {
        parts.push("some files or directories could not be copied");
    }
    if exit_code & 4 != 0 {
        parts.push("mismatched files or directories were detected");
    }
    if exit_code & 2 != 0 {
        parts.push("extra files or directories were detected");
    }
    if exit_code & 1 != 0 {
        parts.push("files were copied successfully");
    }
    if exit_code > 31 {
        parts.push("unrecognised status bits set");
    }

    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_zero_succeeds() {
        assert_eq!(classify(0), RunOutcome::Succeeded { exit_code: 0 });
    }

    #[test]
    fn test_classify_seven_succeeds() {
        assert_eq!(classify(7), RunOutcome::Succeeded { exit_code: 7 });
    }

    #[test]
    fn test_classify_eight_fails() {
        match classify(8) {
            RunOutcome::Failed { exit_code, reason } => {
                assert_eq!(exit_code, Some(8));
                assert!(reason.contains("could not be copied"), "reason: {reason}");
            }
            other => panic!("Expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_255_fails() {
        assert!(matches!(
            classify(255),
            RunOutcome::Failed {
                exit_code: Some(255),
                ..
            }
        ));
    }

    #[test]
    fn test_classify_is_total_over_small_codes() {
        for code in 0..8 {
            assert!(classify(code).is_success(), "code {code}");
        }
        for code in 8..=64 {
            assert!(!classify(code).is_success(), "code {code}");
        }
    }

    #[test]
    fn test_classify_status_without_code_fails() {
        assert!(matches!(
            classify_status(None),
            RunOutcome::Failed {
                exit_code: None,
                ..
            }
        ));
        assert_eq!(
            classify_status(Some(1)),
            RunOutcome::Succeeded { exit_code: 1 }
        );
    }

    #[test]
    fn test_describe_combined_bits() {
        let text = describe_exit_code(3);
        assert!(text.contains("extra files"));
        assert!(text.contains("copied successfully"));
    }

    #[test]
    fn test_describe_fatal() {
        assert!(describe_exit_code(16).starts_with("fatal error"));
    }

    #[test]
    fn test_describe_zero() {
        assert!(describe_exit_code(0).contains("in sync"));
    }

    #[test]
    fn test_display_outcomes() {
        assert_eq!(
            RunOutcome::Succeeded { exit_code: 1 }.to_string(),
            "succeeded (exit code 1)"
        );
        assert_eq!(RunOutcome::Cancelled.to_string(), "cancelled");
        let failed = RunOutcome::Failed {
            exit_code: None,
            reason: "killed".to_string(),
        };
        assert_eq!(failed.to_string(), "failed: killed");
    }
}
