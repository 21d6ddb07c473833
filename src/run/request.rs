//! Copy request validation
//!
//! A `CopyRequest` can only be built through `CopyRequest::validate`, so
//! holding one means both paths passed the submission checks.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Reasons a submission is rejected before any process starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// Source path was empty or whitespace
    #[error("Please provide a source folder")]
    BlankSource,
    /// Destination path was empty or whitespace
    #[error("Please provide a destination folder")]
    BlankDestination,
    /// Source does not exist or is not a directory
    #[error("Source folder does not exist: {}", .0.display())]
    SourceMissing(PathBuf),
    /// Path contains a character the command line cannot carry
    #[error("Unsupported character '\"' in path: {0}")]
    UnsupportedPath(String),
    /// Another run is still active
    #[error("A copy is already running")]
    Busy,
}

/// Validated source/destination pair for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    source: PathBuf,
    destination: PathBuf,
}

impl CopyRequest {
    /// Validate raw operator input.
    ///
    /// Both paths are trimmed and must be non-empty. Trailing separators are
    /// dropped except on a bare root, so a quoted `C:\My Files\` never ends in
    /// `\"` on the robocopy command line. The source must be an
    /// existing directory. The destination may not exist yet.
    pub fn validate(source: &str, destination: &str) -> Result<Self, SubmitError> {
        let source = trim_trailing_separators(source.trim());
        let destination = trim_trailing_separators(destination.trim());

        if source.is_empty() {
            return Err(SubmitError::BlankSource);
        }
        if destination.is_empty() {
            return Err(SubmitError::BlankDestination);
        }

        for path in [source, destination] {
            if path.contains('"') {
                return Err(SubmitError::UnsupportedPath(path.to_string()));
            }
        }

        let source = PathBuf::from(source);
        if !source.is_dir() {
            return Err(SubmitError::SourceMissing(source));
        }

        Ok(Self {
            source,
            destination: PathBuf::from(destination),
        })
    }

    /// Source directory
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Destination directory
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

/// Drop trailing `\` and `/`, keeping roots such as `C:\` and `/` intact.
fn trim_trailing_separators(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['\\', '/']);
    if trimmed.is_empty() || trimmed.ends_with(':') {
        path
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_accepts_existing_source() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().to_str().unwrap();
        let dest = tmp.path().join("out");

        let request = CopyRequest::validate(source, dest.to_str().unwrap()).unwrap();

        assert_eq!(request.source(), tmp.path());
        assert_eq!(request.destination(), dest.as_path());
    }

    #[test]
    fn test_validate_trims_whitespace() {
        let tmp = TempDir::new().unwrap();
        let padded = format!("  {}  ", tmp.path().display());

        let request = CopyRequest::validate(&padded, " /tmp/x ").unwrap();

        assert_eq!(request.source(), tmp.path());
        assert_eq!(request.destination(), Path::new("/tmp/x"));
    }

    #[test]
    fn test_validate_rejects_blank_source() {
        assert_eq!(
            CopyRequest::validate("   ", "/tmp/x"),
            Err(SubmitError::BlankSource)
        );
        assert_eq!(
            CopyRequest::validate("", "/tmp/x"),
            Err(SubmitError::BlankSource)
        );
    }

    #[test]
    fn test_validate_drops_trailing_separators() {
        let tmp = TempDir::new().unwrap();
        let with_slash = format!("{}/", tmp.path().display());

        let request = CopyRequest::validate(&with_slash, "D:\\My Files\\").unwrap();

        assert_eq!(request.source(), tmp.path());
        assert_eq!(request.destination(), Path::new("D:\\My Files"));
    }

    #[test]
    fn test_trim_trailing_separators_keeps_roots() {
        assert_eq!(trim_trailing_separators("C:\\"), "C:\\");
        assert_eq!(trim_trailing_separators("/"), "/");
        assert_eq!(trim_trailing_separators("\\\\srv\\share\\"), "\\\\srv\\share");
        assert_eq!(trim_trailing_separators("/data//"), "/data");
    }

    #[test]
    fn test_validate_rejects_blank_destination() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(
            CopyRequest::validate(tmp.path().to_str().unwrap(), "\t"),
            Err(SubmitError::BlankDestination)
        );
    }

    #[test]
    fn test_validate_rejects_missing_source() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");

        let result = CopyRequest::validate(missing.to_str().unwrap(), "/tmp/x");

        assert_eq!(result, Err(SubmitError::SourceMissing(missing)));
    }

    #[test]
    fn test_validate_rejects_file_as_source() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.txt");
        std::fs::write(&file, "x").unwrap();

        let result = CopyRequest::validate(file.to_str().unwrap(), "/tmp/x");

        assert!(matches!(result, Err(SubmitError::SourceMissing(_))));
    }

    #[test]
    fn test_validate_rejects_double_quote() {
        let tmp = TempDir::new().unwrap();
        let result = CopyRequest::validate(tmp.path().to_str().unwrap(), "/tmp/\"x");
        assert!(matches!(result, Err(SubmitError::UnsupportedPath(_))));
    }

    #[test]
    fn test_error_messages_are_operator_friendly() {
        assert_eq!(
            SubmitError::BlankSource.to_string(),
            "Please provide a source folder"
        );
        assert_eq!(SubmitError::Busy.to_string(), "A copy is already running");
    }
}
