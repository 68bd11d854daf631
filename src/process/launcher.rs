//! Agent process launching and control.
//!
//! [`launch`] turns a [`CommandSpec`] into a running [`Process`]; the
//! process then records its lifecycle through a [`ProcessStateMachine`].

use std::io;
use std::path::PathBuf;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStderr, ChildStdout};

use crate::backend::{CommandSpec, PromptTransport};

use super::{ExitStatus, ProcessState, ProcessStateMachine};

/// Error type for process launching.
#[derive(thiserror::Error, Debug)]
pub enum LaunchError {
    /// The program could not be found.
    #[error("Executable not found: {program}")]
    ExecutableNotFound { program: String },

    /// The program exists but may not be executed.
    #[error("Permission denied launching {program}")]
    PermissionDenied { program: String },

    /// The working directory is missing or not a directory.
    #[error("Working directory invalid: {path}: {reason}")]
    WorkingDirectoryInvalid { path: PathBuf, reason: String },

    /// Other I/O error.
    #[error("Failed to launch {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    /// Create a `LaunchError` from an I/O error, classifying common cases.
    fn from_io(err: io::Error, program: &str) -> Self {
        let program = program.to_string();
        match err.kind() {
            io::ErrorKind::NotFound => Self::ExecutableNotFound { program },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { program },
            _ => Self::Io {
                program,
                source: err,
            },
        }
    }
}

/// Check that `spec`'s working directory exists and is a directory.
///
/// # Errors
///
/// Returns `LaunchError::WorkingDirectoryInvalid` otherwise.
pub fn check_working_dir(spec: &CommandSpec) -> Result<(), LaunchError> {
    let invalid = |reason: String| LaunchError::WorkingDirectoryInvalid {
        path: spec.cwd().to_path_buf(),
        reason,
    };
    match std::fs::metadata(spec.cwd()) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(invalid("not a directory".to_string())),
        Err(e) => Err(invalid(e.to_string())),
    }
}

/// Start the process described by `spec`.
///
/// Stdout and stderr are piped. Stdin is detached unless the prompt travels
/// over it, in which case it is written and closed by a background task. On
/// unix the child leads its own process group so termination reaches any
/// subprocesses. Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns `LaunchError` if the working directory is invalid or the OS
/// refuses to create the process. Nothing is retried.
pub fn launch(spec: &CommandSpec) -> Result<Process, LaunchError> {
    let mut state = ProcessStateMachine::new();

    if let Err(e) = check_working_dir(spec) {
        record(&mut state, ProcessState::LaunchFailed);
        return Err(e);
    }

    let mut cmd = spec.to_tokio_command();
    cmd.kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            record(&mut state, ProcessState::LaunchFailed);
            let err = LaunchError::from_io(e, spec.program());
            tracing::warn!(program = spec.program(), error = %err, "Failed to launch agent process");
            return Err(err);
        }
    };

    let pid = child.id();
    record(&mut state, ProcessState::Running { pid });
    tracing::info!(
        program = spec.program(),
        pid = ?pid,
        cwd = %spec.cwd().display(),
        "Launched agent process"
    );

    if let PromptTransport::Stdin(text) = spec.prompt_transport() {
        if let Some(mut stdin) = child.stdin.take() {
            let text = text.clone();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(text.as_bytes()).await {
                    tracing::warn!(error = %e, "Failed to write prompt to stdin");
                }
                // Dropping stdin closes the pipe.
            });
        }
    }

    Ok(Process {
        child,
        pid,
        program: spec.program().to_string(),
        state,
    })
}

fn record(machine: &mut ProcessStateMachine, next: ProcessState) {
    if let Err(e) = machine.transition(next) {
        tracing::error!(error = %e, "Rejected process state transition");
    }
}

/// A running agent process.
#[derive(Debug)]
pub struct Process {
    child: Child,
    pid: Option<u32>,
    program: String,
    state: ProcessStateMachine,
}

impl Process {
    /// The process ID assigned at launch.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn state(&self) -> &ProcessState {
        self.state.state()
    }

    /// Take ownership of the stdout handle.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Take ownership of the stderr handle.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Wait for the process to reach a terminal state.
    ///
    /// The terminal state is recorded once; later calls return it directly.
    /// Cancel safe.
    pub async fn wait(&mut self) -> ProcessState {
        if self.state().is_terminal() {
            return self.state().clone();
        }

        let next = match self.child.wait().await {
            Ok(status) => ProcessState::from(ExitStatus::from(status)),
            Err(e) => {
                tracing::error!(pid = ?self.pid, error = %e, "Failed to wait for agent process");
                ProcessState::Lost {
                    reason: e.to_string(),
                }
            }
        };
        record(&mut self.state, next);
        self.state().clone()
    }

    /// Ask the process (group) to terminate.
    ///
    /// On unix this sends SIGTERM; elsewhere it kills immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal cannot be delivered.
    pub fn signal_terminate(&mut self) -> io::Result<()> {
        #[cfg(unix)]
        {
            self.signal_group(nix::sys::signal::Signal::SIGTERM)
        }

        #[cfg(not(unix))]
        {
            self.child.start_kill()
        }
    }

    /// Forcefully kill the process (group) without waiting.
    ///
    /// # Errors
    ///
    /// Returns an error if the kill signal cannot be sent.
    pub fn start_kill(&mut self) -> io::Result<()> {
        #[cfg(unix)]
        {
            // The direct child is killed below even if the group is gone.
            if let Err(e) = self.signal_group(nix::sys::signal::Signal::SIGKILL) {
                tracing::debug!(pid = ?self.pid, error = %e, "Group kill not delivered");
            }
        }
        match self.child.start_kill() {
            // Already reaped: nothing left to kill.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }

    #[cfg(unix)]
    fn signal_group(&self, signal: nix::sys::signal::Signal) -> io::Result<()> {
        use nix::sys::signal::killpg;
        use nix::unistd::Pid;

        // No pid means the child has been reaped already.
        let Some(pid) = self.child.id() else {
            return Ok(());
        };
        let nix_pid = Pid::from_raw(i32::try_from(pid).unwrap_or(i32::MAX));
        killpg(nix_pid, signal).map_err(io::Error::from)
    }
}
