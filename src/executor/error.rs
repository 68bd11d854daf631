//! Errors surfaced by the executor facade.

use crate::config::ConfigError;
use crate::process::LaunchError;
use crate::stream::StreamReadError;

/// Failures after a process has started.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A pipe failed mid-stream. Reported to observers; the exit status is
    /// still recorded.
    #[error(transparent)]
    StreamRead(#[from] StreamReadError),

    /// The OS wait for the process failed.
    #[error("Failed to wait for agent process: {reason}")]
    WaitFailed { reason: String },

    /// The supervising task ended without recording a terminal state.
    #[error("Agent supervisor task ended unexpectedly")]
    SupervisorLost,
}

/// Error type for executor operations.
#[derive(thiserror::Error, Debug)]
pub enum ExecutorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl ExecutorError {
    /// `true` when the failure happened before any process was created.
    #[must_use]
    pub fn is_pre_launch(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Launch(_))
    }
}
