//! Copy process supervisor
//!
//! Spawns the copy tool, reads stdout and stderr concurrently as lines
//! arrive, feeds every line into the run log, turns stdout lines into
//! progress updates, and kills the whole process tree on request.

use std::io;
use std::process::Stdio;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::log::accumulator::SharedLog;
use crate::robocopy::progress::{parse_line, ProgressTracker};

/// Errors raised while launching, watching or killing the copy process.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The program could not be started (not found, permission denied, ...)
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        /// Program that failed to start
        program: String,
        /// Underlying spawn error
        source: io::Error,
    },
    /// A standard stream was not captured
    #[error("Failed to capture {0} of the copy process")]
    Pipe(&'static str),
    /// The process id was not available after spawning
    #[error("Copy process exited before its id could be read")]
    NoPid,
    /// Waiting for the process failed
    #[error("Failed waiting for the copy process: {0}")]
    Wait(#[source] io::Error),
    /// A watcher or reader task panicked or was aborted
    #[error("Supervisor task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    /// The process tree could not be terminated
    #[error("Failed to terminate copy process {pid}: {message}")]
    Kill {
        /// Process id the kill was aimed at
        pid: u32,
        /// Platform error text
        message: String,
    },
}

/// Latest known progress, sent whenever a stdout line carries new information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Last known percentage
    pub percent: Option<u8>,
    /// Last known ETA
    pub eta: Option<String>,
    /// Display text, e.g. `Copying… 45%  ETA 0:02:13`
    pub status_text: String,
}

/// Result of a cancellation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The process tree was sent a kill
    Killed,
    /// A previous request already killed it
    AlreadyRequested,
    /// The process had already exited; nothing to do
    AlreadyFinished,
}

/// How the process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunExit {
    /// Exit code (None if terminated by a signal)
    pub code: Option<i32>,
    /// Whether the exit followed a successful cancellation
    pub cancelled: bool,
}

#[derive(Debug)]
struct RunState {
    running: bool,
    cancel_requested: bool,
}

/// What a kill attempt found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KillResult {
    /// The process tree was signalled
    Signalled,
    /// The process had already exited on its own
    AlreadyExited,
}

/// Kills the process tree rooted at a pid. Blocking.
pub(crate) type KillFn = fn(u32) -> Result<KillResult, String>;

#[derive(Debug)]
struct Shared {
    pid: u32,
    kill: KillFn,
    state: Mutex<RunState>,
}

/// Cancellation side of a run. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RunControl {
    shared: Arc<Shared>,
}

impl RunControl {
    /// Process id of the copy tool
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.shared.pid
    }

    /// Whether the process has not been reaped yet
    pub async fn is_running(&self) -> bool {
        self.shared.state.lock().await.running
    }

    /// Kill the process and its descendants if it is still running.
    ///
    /// Calling this after the process exited is a no-op, including when it
    /// exited but has not been reaped yet. A failed kill is returned to the
    /// caller and leaves the run untouched; the exit watcher keeps waiting for
    /// the process either way.
    pub async fn cancel(&self) -> Result<CancelOutcome, SupervisorError> {
        let mut state = self.shared.state.lock().await;
        if !state.running {
            return Ok(CancelOutcome::AlreadyFinished);
        }
        if state.cancel_requested {
            return Ok(CancelOutcome::AlreadyRequested);
        }

        let pid = self.shared.pid;
        let kill = self.shared.kill;
        match tokio::task::spawn_blocking(move || kill(pid)).await? {
            Ok(KillResult::Signalled) => {
                state.cancel_requested = true;
                info!(pid, "copy process tree killed");
                Ok(CancelOutcome::Killed)
            }
            Ok(KillResult::AlreadyExited) => {
                debug!(pid, "copy process exited before the kill");
                Ok(CancelOutcome::AlreadyFinished)
            }
            Err(message) => {
                warn!(pid, error = %message, "failed to kill copy process tree");
                Err(SupervisorError::Kill { pid, message })
            }
        }
    }
}

/// A live run: the process watcher plus both stream readers.
#[derive(Debug)]
pub struct RunHandle {
    control: RunControl,
    log: SharedLog,
    waiter: JoinHandle<io::Result<std::process::ExitStatus>>,
    stdout_reader: JoinHandle<()>,
    stderr_reader: JoinHandle<()>,
}

impl RunHandle {
    /// Cancellation handle for this run
    #[must_use]
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    /// Log the readers are appending to
    #[must_use]
    pub const fn log(&self) -> &SharedLog {
        &self.log
    }

    /// See [`RunControl::cancel`].
    pub async fn cancel(&self) -> Result<CancelOutcome, SupervisorError> {
        self.control.cancel().await
    }

    /// Wait until the process has exited and both streams reached end-of-stream.
    pub async fn wait(self) -> Result<RunExit, SupervisorError> {
        let status = self.waiter.await?.map_err(SupervisorError::Wait)?;
        self.stdout_reader.await?;
        self.stderr_reader.await?;

        // A natural exit that raced the kill keeps its exit code.
        let cancelled = self.control.shared.state.lock().await.cancel_requested
            && ended_by_kill(&status);
        debug!(code = ?status.code(), cancelled, "copy process finished");

        Ok(RunExit {
            code: status.code(),
            cancelled,
        })
    }
}

/// Spawn `cmd` and start supervising it.
///
/// Every stdout/stderr line is appended to the returned handle's log. When
/// `progress` is given, each stdout line carrying a percentage or ETA sends
/// the sticky latest values on it. Must be called inside a Tokio runtime.
pub fn start(
    mut cmd: std::process::Command,
    progress: Option<mpsc::UnboundedSender<ProgressUpdate>>,
) -> Result<RunHandle, SupervisorError> {
    let program = cmd.get_program().to_string_lossy().into_owned();

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;

        // Own process group, so cancel can take down every descendant.
        cmd.process_group(0);
    }

    let mut tokio_cmd = TokioCommand::from(cmd);
    tokio_cmd.stdin(Stdio::null());
    tokio_cmd.stdout(Stdio::piped());
    tokio_cmd.stderr(Stdio::piped());
    tokio_cmd.kill_on_drop(true);

    let mut child = tokio_cmd
        .spawn()
        .map_err(|source| SupervisorError::Launch {
            program: program.clone(),
            source,
        })?;

    let pid = child.id().ok_or(SupervisorError::NoPid)?;
    debug!(pid, program = %program, "spawned copy process");

    let child_stdout = child.stdout.take().ok_or(SupervisorError::Pipe("stdout"))?;
    let child_stderr = child.stderr.take().ok_or(SupervisorError::Pipe("stderr"))?;

    let log = SharedLog::new();
    let shared = Arc::new(Shared {
        pid,
        kill: kill_tree,
        state: Mutex::new(RunState {
            running: true,
            cancel_requested: false,
        }),
    });

    let stdout_log = log.clone();
    let stdout_reader = tokio::spawn(async move {
        let mut tracker = ProgressTracker::new();
        read_lines(child_stdout, "stdout", &stdout_log, |line| {
            if tracker.observe(&parse_line(line)) {
                if let Some(tx) = &progress {
                    let _ = tx.send(ProgressUpdate {
                        percent: tracker.percent,
                        eta: tracker.eta.clone(),
                        status_text: tracker.status_text(),
                    });
                }
            }
        })
        .await;
    });

    let stderr_log = log.clone();
    let stderr_reader = tokio::spawn(async move {
        read_lines(child_stderr, "stderr", &stderr_log, |_| {}).await;
    });

    let waiter_shared = Arc::clone(&shared);
    let waiter = tokio::spawn(async move {
        let status = child.wait().await;
        waiter_shared.state.lock().await.running = false;
        status
    });

    Ok(RunHandle {
        control: RunControl { shared },
        log,
        waiter,
        stdout_reader,
        stderr_reader,
    })
}

/// Read a stream to end-of-stream, appending each line to `log`.
///
/// Bytes are decoded lossily so a stray non-UTF-8 file name never stops the
/// reader. `\r`, `\n` and `\r\n` all end a line.
async fn read_lines<R, F>(stream: R, name: &'static str, log: &SharedLog, mut on_line: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                for line in split_segments(&text) {
                    log.push_line(line);
                    on_line(line);
                }
            }
            Err(err) => {
                warn!(stream = name, error = %err, "stopped reading copy output");
                break;
            }
        }
    }
}

/// Split one `\n`-terminated chunk into lines, treating lone `\r` as a break.
fn split_segments(chunk: &str) -> impl Iterator<Item = &str> {
    let chunk = chunk.strip_suffix('\n').unwrap_or(chunk);
    let chunk = chunk.strip_suffix('\r').unwrap_or(chunk);
    chunk.split('\r')
}

/// Whether the exit status is the one our kill produces.
#[cfg(unix)]
fn ended_by_kill(status: &std::process::ExitStatus) -> bool {
    use nix::sys::signal::Signal;
    use std::os::unix::process::ExitStatusExt;

    status.signal() == Some(Signal::SIGKILL as i32)
}

/// `taskkill /F` leaves an ordinary exit code, so the request alone decides.
#[cfg(windows)]
const fn ended_by_kill(_status: &std::process::ExitStatus) -> bool {
    true
}

/// Peek at the child without reaping it: true once it has exited.
#[cfg(target_os = "linux")]
fn has_exited(pid: nix::unistd::Pid) -> bool {
    use nix::sys::wait::{waitid, Id, WaitPidFlag, WaitStatus};

    let flags = WaitPidFlag::WEXITED | WaitPidFlag::WNOHANG | WaitPidFlag::WNOWAIT;
    // ECHILD: already reaped by the watcher.
    !matches!(waitid(Id::Pid(pid), flags), Ok(WaitStatus::StillAlive))
}

#[cfg(all(unix, not(target_os = "linux")))]
const fn has_exited(_pid: nix::unistd::Pid) -> bool {
    false
}

#[cfg(unix)]
fn kill_tree(pid: u32) -> Result<KillResult, String> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(i32::try_from(pid).map_err(|e| e.to_string())?);
    // A zombie still accepts signals; check first so a finished run is left alone.
    if has_exited(pid) {
        return Ok(KillResult::AlreadyExited);
    }
    match killpg(pid, Signal::SIGKILL) {
        Ok(()) => Ok(KillResult::Signalled),
        Err(Errno::ESRCH) => Ok(KillResult::AlreadyExited),
        Err(errno) => Err(errno.to_string()),
    }
}

#[cfg(windows)]
fn kill_tree(pid: u32) -> Result<KillResult, String> {
    /// taskkill's exit code when no such process exists
    const NOT_FOUND: i32 = 128;

    let output = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| e.to_string())?;

    match output.status.code() {
        Some(0) => Ok(KillResult::Signalled),
        Some(NOT_FOUND) => Ok(KillResult::AlreadyExited),
        _ => Err(String::from_utf8_lossy(&output.stderr).trim().to_string()),
    }
}

#[cfg(test)]
impl RunControl {
    /// A control for a live run at `pid` that kills through `kill`.
    pub(crate) fn with_kill(pid: u32, kill: KillFn) -> Self {
        Self {
            shared: Arc::new(Shared {
                pid,
                kill,
                state: Mutex::new(RunState {
                    running: true,
                    cancel_requested: false,
                }),
            }),
        }
    }
}
