//! Process lifecycle state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExitStatus {
    /// The process exited on its own with this code.
    Exited { code: i32 },
    /// The process was terminated by a signal.
    Signaled { signal: Option<i32> },
}

impl ExitStatus {
    /// The numeric exit code, if the process exited normally.
    #[must_use]
    pub fn code(self) -> Option<i32> {
        match self {
            Self::Exited { code } => Some(code),
            Self::Signaled { .. } => None,
        }
    }

    /// `true` for a zero exit code.
    #[must_use]
    pub fn success(self) -> bool {
        self.code() == Some(0)
    }

    /// The exit code, or `-1` when the process was signaled.
    #[must_use]
    pub fn code_or_negative(self) -> i32 {
        self.code().unwrap_or(-1)
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Exited { code };
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            Self::Signaled {
                signal: status.signal(),
            }
        }

        #[cfg(not(unix))]
        {
            Self::Signaled { signal: None }
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited { code } => write!(f, "exited with code {code}"),
            Self::Signaled { signal: Some(sig) } => write!(f, "terminated by signal {sig}"),
            Self::Signaled { signal: None } => f.write_str("terminated by signal"),
        }
    }
}

/// Lifecycle of one OS process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    #[default]
    NotStarted,
    Running {
        pid: Option<u32>,
    },
    Exited {
        code: i32,
    },
    Signaled {
        signal: Option<i32>,
    },
    /// The OS could not create the process.
    LaunchFailed,
    /// The OS wait for a running process failed; its fate is unknown.
    Lost {
        reason: String,
    },
}

impl ProcessState {
    /// Terminal states admit no further transition.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Exited { .. } | Self::Signaled { .. } | Self::LaunchFailed | Self::Lost { .. }
        )
    }

    /// The exit status, for states that carry one.
    #[must_use]
    pub fn exit_status(&self) -> Option<ExitStatus> {
        match self {
            Self::Exited { code } => Some(ExitStatus::Exited { code: *code }),
            Self::Signaled { signal } => Some(ExitStatus::Signaled { signal: *signal }),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running { .. } => "running",
            Self::Exited { .. } => "exited",
            Self::Signaled { .. } => "signaled",
            Self::LaunchFailed => "launch_failed",
            Self::Lost { .. } => "lost",
        }
    }
}

impl From<ExitStatus> for ProcessState {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Exited { code } => Self::Exited { code },
            ExitStatus::Signaled { signal } => Self::Signaled { signal },
        }
    }
}

/// Rejected lifecycle transition.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid process state transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: &'static str,
    pub to: &'static str,
}

/// State machine enforcing monotonic lifecycle transitions.
///
/// `NotStarted -> Running -> {Exited | Signaled | Lost}` or
/// `NotStarted -> LaunchFailed`.
#[derive(Debug, Clone, Default)]
pub struct ProcessStateMachine {
    state: ProcessState,
}

impl ProcessStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &ProcessState {
        &self.state
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` if `next` is not reachable from the current
    /// state; the state is left unchanged.
    pub fn transition(&mut self, next: ProcessState) -> Result<(), TransitionError> {
        let allowed = match (&self.state, &next) {
            (ProcessState::NotStarted, ProcessState::Running { .. } | ProcessState::LaunchFailed)
            | (
                ProcessState::Running { .. },
                ProcessState::Exited { .. } | ProcessState::Signaled { .. } | ProcessState::Lost { .. },
            ) => true,
            _ => false,
        };

        if !allowed {
            return Err(TransitionError {
                from: self.state.name(),
                to: next.name(),
            });
        }

        tracing::debug!(from = self.state.name(), to = next.name(), "State transition");
        self.state = next;
        Ok(())
    }
}
