//! Progress-line parser for robocopy's `/ETA` output
//!
//! Scans single lines of tool output for a completion percentage and an
//! estimated time remaining, and tracks the last known values across lines.

use std::sync::LazyLock;

use regex::Regex;

/// 1–3 digits, an optional fraction, then a single `%`.
/// The leading group keeps `12.5%` from matching as `5%` and rejects digits
/// glued to a word. The trailing group rejects `100%%` and `%` glued to a word.
static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^.\w])(\d{1,3})(?:\.\d+)?%(?:[^%\w]|$)")
        .expect("percent pattern is a valid regex")
});

static ETA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ETA\s+(\d{1,2}:\d{2}:\d{2})").expect("ETA pattern is a valid regex")
});

/// Progress information extracted from one output line.
///
/// Either field may be absent; absence means "no new information", not zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSample {
    /// Completion percentage, clamped to 0–100
    pub percent: Option<u8>,
    /// Estimated time remaining, verbatim (`H:MM:SS` or `HH:MM:SS`)
    pub eta: Option<String>,
}

impl ProgressSample {
    /// Returns true if the line carried neither a percentage nor an ETA
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.percent.is_none() && self.eta.is_none()
    }
}

/// Parse a single line of tool output into a `ProgressSample`.
///
/// Never fails: lines without either pattern yield an empty sample.
#[must_use]
pub fn parse_line(line: &str) -> ProgressSample {
    let percent = PERCENT_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u16>().ok())
        .map(|value| u8::try_from(value.min(100)).unwrap_or(100));

    let eta = ETA_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    ProgressSample { percent, eta }
}

/// Sticky progress state: each field keeps its last known value until a
/// later sample replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressTracker {
    /// Last known percentage
    pub percent: Option<u8>,
    /// Last known ETA
    pub eta: Option<String>,
}

impl ProgressTracker {
    /// Create an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a sample into the tracker.
    ///
    /// Returns true if the sample carried any new information.
    pub fn observe(&mut self, sample: &ProgressSample) -> bool {
        if sample.is_empty() {
            return false;
        }
        if let Some(percent) = sample.percent {
            self.percent = Some(percent);
        }
        if let Some(eta) = &sample.eta {
            self.eta = Some(eta.clone());
        }
        true
    }

    /// Human-readable status line, e.g. `Copying… 45%  ETA 0:02:13`
    #[must_use]
    pub fn status_text(&self) -> String {
        let mut text = match self.percent {
            Some(percent) => format!("Copying… {percent}%"),
            None => "Copying…".to_string(),
        };
        if let Some(eta) = &self.eta {
            text.push_str("  ETA ");
            text.push_str(eta);
        }
        text
    }
}
