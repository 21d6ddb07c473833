//! Open a saved report in the platform's default viewer

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

/// Program used to open files on this platform
#[must_use]
pub const fn viewer_program() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    }
}

/// Build the command that opens `path`
#[must_use]
pub fn viewer_command(path: &Path) -> Command {
    let mut cmd = Command::new(viewer_program());
    cmd.arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

/// Launch the viewer without waiting for it to close
///
/// # Errors
/// Returns an error if the viewer program cannot be started
pub fn open_report(path: &Path) -> Result<()> {
    viewer_command(path)
        .spawn()
        .with_context(|| format!("Failed to launch '{}'", viewer_program()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_command_passes_path() {
        let cmd = viewer_command(Path::new("/dst/report file.txt"));
        assert_eq!(cmd.get_program(), viewer_program());
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec!["/dst/report file.txt"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_viewer_program_linux() {
        assert_eq!(viewer_program(), "xdg-open");
    }
}
