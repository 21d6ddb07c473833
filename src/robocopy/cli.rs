//! Robocopy command builder
//!
//! Constructs `std::process::Command` for invoking robocopy with the
//! source and destination directories and the fixed migration flags.

use std::borrow::Cow;
use std::path::Path;
use std::process::Command;

/// Default executable name, resolved through `PATH`.
pub const DEFAULT_EXECUTABLE: &str = "robocopy";

/// Intra-file copy concurrency passed as `/MT`.
pub const THREADS: u32 = 16;

/// Fixed flags: recurse including empty dirs, one retry, one second between
/// retries, progress with ETA, multi-threaded copy.
pub const FIXED_FLAGS: [&str; 5] = ["/E", "/R:1", "/W:1", "/ETA", "/MT:16"];

/// Options for building a robocopy command beyond the two directories.
#[derive(Debug, Clone)]
pub struct CommandOptions {
    /// Program to run (default: `robocopy`)
    pub executable: String,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            executable: DEFAULT_EXECUTABLE.to_string(),
        }
    }
}

/// Wrap a path in double quotes if it contains a space.
///
/// This is a narrow quoting rule, not general shell escaping. It is only
/// sound because request validation rejects paths containing `"`. Trailing
/// backslashes are doubled inside the quotes, since `\"` would otherwise
/// read as an escaped quote; validation already strips them from non-root paths.
#[must_use]
pub fn quote_path(path: &str) -> Cow<'_, str> {
    if path.contains(' ') {
        let trailing = path.len() - path.trim_end_matches('\\').len();
        Cow::Owned(format!("\"{path}{}\"", "\\".repeat(trailing)))
    } else {
        Cow::Borrowed(path)
    }
}

/// Build a `Command` that copies `source` into `destination` with the default executable.
#[must_use]
pub fn build_command(source: &Path, destination: &Path) -> Command {
    build_command_with_options(source, destination, &CommandOptions::default())
}

/// Build a `Command` that copies `source` into `destination`.
///
/// On Windows the quoted paths are passed verbatim so robocopy sees exactly
/// the command line it expects. Elsewhere each path is a single argv entry
/// and needs no quoting.
#[must_use]
pub fn build_command_with_options(
    source: &Path,
    destination: &Path,
    options: &CommandOptions,
) -> Command {
    let mut cmd = Command::new(&options.executable);

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;

        cmd.raw_arg(&*quote_path(&source.to_string_lossy()));
        cmd.raw_arg(&*quote_path(&destination.to_string_lossy()));
    }
    #[cfg(not(windows))]
    {
        cmd.arg(source);
        cmd.arg(destination);
    }

    cmd.args(FIXED_FLAGS);
    cmd
}

/// Render the command line as robocopy would receive it on Windows.
///
/// Used for status display and diagnostics only.
#[must_use]
pub fn command_line(source: &Path, destination: &Path, options: &CommandOptions) -> String {
    let source = source.to_string_lossy();
    let destination = destination.to_string_lossy();
    let mut parts = vec![
        options.executable.clone(),
        quote_path(&source).into_owned(),
        quote_path(&destination).into_owned(),
    ];
    parts.extend(FIXED_FLAGS.iter().map(ToString::to_string));
    parts.join(" ")
}
