//! Migration orchestrator
//!
//! The single entry point a front end talks to. Validates the request,
//! prepares the destination, supervises the copy, classifies the exit code,
//! writes the report, and reports every step on an event channel.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::log::report::ReportWriter;
use crate::robocopy::cli::{build_command_with_options, command_line};
use crate::robocopy::outcome::{classify_status, describe_exit_code, RunOutcome};
use crate::run::config::MigrationConfig;
use crate::run::request::{CopyRequest, SubmitError};
use crate::run::supervisor::{self, CancelOutcome, RunControl, SupervisorError};

/// Where the orchestrator is in its run lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// No run in progress
    Idle,
    /// Checking the submitted paths
    Validating,
    /// The copy tool is running
    Running,
    /// A kill was sent; waiting for the process to go away
    Cancelling,
    /// The process exited; classifying and writing the report
    Completing,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Running => "running",
            Self::Cancelling => "cancelling",
            Self::Completing => "completing",
        };
        f.write_str(name)
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Copy succeeded and the report was saved
    Completed {
        /// Robocopy exit code (0–7)
        exit_code: i32,
        /// Where the report was written
        report: PathBuf,
    },
    /// Copy succeeded but the report could not be saved
    ReportFailed {
        /// Robocopy exit code (0–7)
        exit_code: i32,
        /// Why the report write failed
        error: String,
    },
    /// Copy failed (exit code 8 or above, or no exit code)
    Failed {
        /// Robocopy exit code, if any
        exit_code: Option<i32>,
        /// Failure reason
        reason: String,
        /// Everything the tool printed
        log: String,
        /// Diagnostic report, if one was written
        report: Option<PathBuf>,
    },
    /// The copy tool could not be started
    LaunchFailed {
        /// Why the launch failed
        error: String,
    },
    /// The operator cancelled the run
    Cancelled,
}

impl Completion {
    /// Outcome in exit-code terms; None when the tool never ran.
    #[must_use]
    pub fn outcome(&self) -> Option<RunOutcome> {
        match self {
            Self::Completed { exit_code, .. } | Self::ReportFailed { exit_code, .. } => {
                Some(RunOutcome::Succeeded {
                    exit_code: *exit_code,
                })
            }
            Self::Failed {
                exit_code, reason, ..
            } => Some(RunOutcome::Failed {
                exit_code: *exit_code,
                reason: reason.clone(),
            }),
            Self::Cancelled => Some(RunOutcome::Cancelled),
            Self::LaunchFailed { .. } => None,
        }
    }

    /// Final status line shown to the operator
    #[must_use]
    pub fn status_text(&self) -> String {
        match self {
            Self::Completed { report, .. } => format!(
                "Copy completed successfully. Log saved at: {}",
                report.display()
            ),
            Self::ReportFailed { error, .. } => {
                format!("Copy completed, but the report could not be saved: {error}")
            }
            Self::Failed { reason, .. } => format!("Copy failed: {reason}"),
            Self::LaunchFailed { error } => format!("Copy failed to start: {error}"),
            Self::Cancelled => "Copy cancelled by user.".to_string(),
        }
    }
}

/// Everything the orchestrator tells the front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationEvent {
    /// Phase change or status message
    Status {
        /// Phase after the change
        phase: RunPhase,
        /// Operator-facing text
        text: String,
    },
    /// Progress during `Running`
    Progress {
        /// Last known percentage
        percent: Option<u8>,
        /// Last known ETA
        eta: Option<String>,
        /// Display text
        status_text: String,
    },
    /// The run reached a terminal state
    Finished(Completion),
}

/// Runs one copy at a time and reports on an event channel.
///
/// The receiving side owns any thread marshaling its UI needs.
#[derive(Debug)]
pub struct Migrator {
    config: MigrationConfig,
    events: mpsc::UnboundedSender<MigrationEvent>,
    busy: AtomicBool,
    phase: Mutex<RunPhase>,
    active: Mutex<Option<RunControl>>,
}

impl Migrator {
    /// Create an orchestrator that sends its events on `events`
    #[must_use]
    pub fn new(config: MigrationConfig, events: mpsc::UnboundedSender<MigrationEvent>) -> Self {
        Self {
            config,
            events,
            busy: AtomicBool::new(false),
            phase: Mutex::new(RunPhase::Idle),
            active: Mutex::new(None),
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        *self.phase.lock()
    }

    /// Validate the request now and run the copy in the background.
    ///
    /// Validation failures and `Busy` are returned before anything starts.
    pub fn submit(
        self: &Arc<Self>,
        source: &str,
        destination: &str,
    ) -> Result<JoinHandle<Completion>, SubmitError> {
        let request = self.begin(source, destination)?;
        let this = Arc::clone(self);
        Ok(tokio::spawn(async move { this.execute(request).await }))
    }

    /// Validate the request and run the copy to completion.
    pub async fn run(&self, source: &str, destination: &str) -> Result<Completion, SubmitError> {
        let request = self.begin(source, destination)?;
        Ok(self.execute(request).await)
    }

    /// Cancel the active run, if any.
    ///
    /// Without an active run this is a no-op returning `AlreadyFinished`.
    /// A failed kill is reported as a status event and returned; the run
    /// itself keeps going.
    pub async fn cancel(&self) -> Result<CancelOutcome, SupervisorError> {
        let control = self.active.lock().clone();
        let Some(control) = control else {
            return Ok(CancelOutcome::AlreadyFinished);
        };

        match control.cancel().await {
            Ok(CancelOutcome::Killed) => {
                self.transition(RunPhase::Running, RunPhase::Cancelling, "Cancelling copy…");
                Ok(CancelOutcome::Killed)
            }
            Ok(other) => Ok(other),
            Err(err) => {
                self.emit_status(format!("Failed to cancel process: {err}"));
                Err(err)
            }
        }
    }

    /// Claim the run slot and validate the request.
    fn begin(&self, source: &str, destination: &str) -> Result<CopyRequest, SubmitError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SubmitError::Busy);
        }

        self.set_phase(RunPhase::Validating, "Validating folders…");
        match CopyRequest::validate(source, destination) {
            Ok(request) => Ok(request),
            Err(err) => {
                self.set_phase(RunPhase::Idle, &err.to_string());
                self.busy.store(false, Ordering::Release);
                Err(err)
            }
        }
    }

    async fn execute(&self, request: CopyRequest) -> Completion {
        self.prepare_destination(&request);

        let options = self.config.tool.command_options();
        let cmd = build_command_with_options(request.source(), request.destination(), &options);
        info!(
            command = %command_line(request.source(), request.destination(), &options),
            "starting copy"
        );

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        self.set_phase(RunPhase::Running, "Starting robocopy…");

        let handle = match supervisor::start(cmd, Some(progress_tx)) {
            Ok(handle) => handle,
            Err(err) => {
                return self.finish(Completion::LaunchFailed {
                    error: err.to_string(),
                });
            }
        };
        *self.active.lock() = Some(handle.control());

        let events = self.events.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(update) = progress_rx.recv().await {
                let _ = events.send(MigrationEvent::Progress {
                    percent: update.percent,
                    eta: update.eta,
                    status_text: update.status_text,
                });
            }
        });

        let log = handle.log().clone();
        let waited = handle.wait().await;
        *self.active.lock() = None;
        let _ = forwarder.await;

        let exit = match waited {
            Ok(exit) => exit,
            Err(err) => {
                return self.finish(Completion::Failed {
                    exit_code: None,
                    reason: err.to_string(),
                    log: log.snapshot(),
                    report: None,
                });
            }
        };

        if exit.cancelled {
            return self.finish(Completion::Cancelled);
        }

        self.set_phase(RunPhase::Completing, "Finishing…");
        let full_log = log.snapshot();
        let writer = ReportWriter::new(self.config.report.clone());

        let completion = match classify_status(exit.code) {
            RunOutcome::Succeeded { exit_code } => {
                let result = writer.write(&request, exit_code, &full_log);
                self.emit(MigrationEvent::Progress {
                    percent: Some(100),
                    eta: None,
                    status_text: "Copy completed. 100%".to_string(),
                });
                match result {
                    Ok(report) => Completion::Completed { exit_code, report },
                    Err(err) => {
                        warn!(error = %format!("{err:#}"), "failed to save run report");
                        Completion::ReportFailed {
                            exit_code,
                            error: format!("{err:#}"),
                        }
                    }
                }
            }
            RunOutcome::Failed { exit_code, reason } => {
                let report = if self.config.report.persist_failures {
                    writer
                        .write_failure(&request, exit_code, &reason, &full_log)
                        .inspect_err(|err| {
                            warn!(error = %format!("{err:#}"), "failed to save failure report");
                        })
                        .ok()
                } else {
                    None
                };
                Completion::Failed {
                    exit_code,
                    reason,
                    log: full_log,
                    report,
                }
            }
            RunOutcome::Cancelled => Completion::Cancelled,
        };

        if let Completion::Completed { exit_code, .. } = &completion {
            info!(exit_code, meaning = %describe_exit_code(*exit_code), "copy completed");
        }

        self.finish(completion)
    }

    /// Create the destination if needed. Failure is recorded, not fatal:
    /// robocopy reports an unusable destination itself.
    fn prepare_destination(&self, request: &CopyRequest) {
        let destination = request.destination();
        if destination.is_dir() {
            return;
        }
        if let Err(err) = std::fs::create_dir_all(destination) {
            warn!(
                path = %destination.display(),
                error = %err,
                "could not create destination folder"
            );
            self.emit_status(format!(
                "Could not create destination folder {}: {err}",
                destination.display()
            ));
        }
    }

    fn finish(&self, completion: Completion) -> Completion {
        self.set_phase(RunPhase::Idle, &completion.status_text());
        self.emit(MigrationEvent::Finished(completion.clone()));
        self.busy.store(false, Ordering::Release);
        completion
    }

    fn set_phase(&self, phase: RunPhase, text: &str) {
        *self.phase.lock() = phase;
        self.emit(MigrationEvent::Status {
            phase,
            text: text.to_string(),
        });
    }

    /// Move `from -> to` only if the phase is still `from`.
    fn transition(&self, from: RunPhase, to: RunPhase, text: &str) {
        let mut phase = self.phase.lock();
        if *phase == from {
            *phase = to;
            self.emit(MigrationEvent::Status {
                phase: to,
                text: text.to_string(),
            });
        }
    }

    fn emit_status(&self, text: String) {
        let phase = self.phase();
        self.emit(MigrationEvent::Status { phase, text });
    }

    fn emit(&self, event: MigrationEvent) {
        // A front end that stopped listening does not stop the run.
        let _ = self.events.send(event);
    }
}
