//! Caller-facing handle for one spawned agent.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_core::Stream;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{BackendKind, ExecutorSettings};
use crate::process::{ExitStatus, Process, ProcessState};
use crate::stream::{
    DrainSummary, Multiplexer, Observer, ObserverId, ObserverRegistry, OutputLine,
};

use super::{ExecutorError, RuntimeError};

/// What the supervising task publishes.
#[derive(Debug, Clone, Default)]
struct Lifecycle {
    state: ProcessState,
    output_closed: bool,
}

impl Lifecycle {
    fn is_complete(&self) -> bool {
        self.state.is_terminal() && self.output_closed
    }
}

/// One in-flight (or finished) agent process.
///
/// Output starts draining as soon as the handle exists. Observers added with
/// [`ChildHandle::stream_output`] see lines emitted after they register.
/// Dropping the handle while the process runs terminates it. Output held
/// open by descendants after the process exits is abandoned once the
/// terminate timeout elapses.
#[derive(Debug)]
pub struct ChildHandle {
    id: Uuid,
    pid: Option<u32>,
    backend: BackendKind,
    registry: ObserverRegistry,
    lifecycle: watch::Receiver<Lifecycle>,
    cancel: CancellationToken,
}

impl ChildHandle {
    /// Take ownership of `process` and start supervising it.
    ///
    /// `observers` are registered before the first read, so they see every line.
    pub(crate) fn start<I>(
        process: Process,
        backend: BackendKind,
        settings: &ExecutorSettings,
        observers: I,
    ) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Observer>>,
    {
        let id = Uuid::new_v4();
        let pid = process.id();
        let registry = ObserverRegistry::new();
        for observer in observers {
            registry.register(observer);
        }
        let (tx, lifecycle) = watch::channel(Lifecycle {
            state: process.state().clone(),
            output_closed: false,
        });
        let cancel = CancellationToken::new();

        let supervisor = Supervisor {
            process,
            multiplexer: Multiplexer::new(
                registry.clone(),
                settings.read_chunk_size(),
                settings.max_line_bytes(),
            ),
            lifecycle: tx,
            cancel: cancel.clone(),
            grace: settings.terminate_timeout(),
        };
        let span = tracing::info_span!("agent", id = %id, backend = %backend, pid = ?pid);
        tokio::spawn(supervisor.run().instrument(span));

        Self {
            id,
            pid,
            backend,
            registry,
            lifecycle,
            cancel,
        }
    }

    /// Unique id of this spawn.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    #[must_use]
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ProcessState {
        self.lifecycle.borrow().state.clone()
    }

    /// Register an observer for subsequent output lines. Never blocks.
    pub fn stream_output(&self, observer: Arc<dyn Observer>) -> ObserverId {
        self.registry.register(observer)
    }

    /// Subsequent output as an async stream, ending when output closes.
    pub fn lines(&self) -> impl Stream<Item = OutputLine> + Send + 'static {
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry.register(Arc::new(ChannelObserver {
            tx: Mutex::new(Some(tx)),
        }));
        UnboundedReceiverStream::new(rx)
    }

    /// Wait until the process has ended and its output is flushed.
    ///
    /// Repeated and concurrent calls all resolve to the same value.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::WaitFailed` if the OS wait failed and
    /// `RuntimeError::SupervisorLost` if the supervising task died.
    pub async fn wait(&self) -> Result<ExitStatus, ExecutorError> {
        let mut lifecycle = self.lifecycle.clone();
        let state = lifecycle
            .wait_for(Lifecycle::is_complete)
            .await
            .map_err(|_| RuntimeError::SupervisorLost)?
            .state
            .clone();
        Ok(status_of(&state)?)
    }

    /// The exit status, if the process has finished and output is flushed.
    #[must_use]
    pub fn try_status(&self) -> Option<ExitStatus> {
        let lifecycle = self.lifecycle.borrow();
        if lifecycle.is_complete() {
            lifecycle.state.exit_status()
        } else {
            None
        }
    }

    /// Terminate the process and wait for it.
    ///
    /// Sends a graceful terminate first and force-kills after the configured
    /// timeout. Unblocks every pending [`ChildHandle::wait`]. A no-op for a
    /// process that already ended.
    ///
    /// # Errors
    ///
    /// Same as [`ChildHandle::wait`].
    pub async fn kill(&self) -> Result<ExitStatus, ExecutorError> {
        self.start_kill();
        self.wait().await
    }

    /// Request termination without waiting.
    pub fn start_kill(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!(id = %self.id, "Kill requested");
            self.cancel.cancel();
        }
    }
}

impl Drop for ChildHandle {
    fn drop(&mut self) {
        if !self.lifecycle.borrow().is_complete() {
            self.start_kill();
        }
    }
}

fn status_of(state: &ProcessState) -> Result<ExitStatus, RuntimeError> {
    match state {
        ProcessState::Lost { reason } => Err(RuntimeError::WaitFailed {
            reason: reason.clone(),
        }),
        other => other.exit_status().ok_or(RuntimeError::SupervisorLost),
    }
}

struct ChannelObserver {
    tx: Mutex<Option<mpsc::UnboundedSender<OutputLine>>>,
}

impl Observer for ChannelObserver {
    fn on_line(&self, line: &OutputLine) {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = guard.as_ref() {
            // The receiver may be gone; the line is simply not wanted.
            let _ = tx.send(line.clone());
        }
    }

    fn on_closed(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

enum Phase {
    Running,
    Terminating { kill_at: Instant },
    Killed,
}

struct Supervisor {
    process: Process,
    multiplexer: Multiplexer,
    lifecycle: watch::Sender<Lifecycle>,
    cancel: CancellationToken,
    grace: Duration,
}

impl Supervisor {
    async fn run(mut self) {
        let stdout = self.process.take_stdout();
        let stderr = self.process.take_stderr();
        let multiplexer = self.multiplexer.clone();
        let drain = multiplexer.drain(stdout, stderr);
        tokio::pin!(drain);

        let mut summary: Option<DrainSummary> = None;
        let mut phase = Phase::Running;

        let state = loop {
            let kill_at = match phase {
                Phase::Terminating { kill_at } => kill_at,
                Phase::Running | Phase::Killed => Instant::now(),
            };

            tokio::select! {
                drained = &mut drain, if summary.is_none() => {
                    summary = Some(drained);
                }
                state = self.process.wait() => break state,
                () = self.cancel.cancelled(), if matches!(phase, Phase::Running) => {
                    tracing::info!("Terminating agent process");
                    if let Err(e) = self.process.signal_terminate() {
                        tracing::debug!(error = %e, "Terminate signal not delivered");
                    }
                    phase = Phase::Terminating { kill_at: Instant::now() + self.grace };
                }
                () = tokio::time::sleep_until(kill_at), if matches!(phase, Phase::Terminating { .. }) => {
                    tracing::warn!(grace = ?self.grace, "Agent ignored terminate, killing");
                    if let Err(e) = self.process.start_kill() {
                        tracing::warn!(error = %e, "Failed to kill agent process");
                    }
                    phase = Phase::Killed;
                }
            }
        };

        match &state {
            ProcessState::Lost { reason } => {
                tracing::error!(reason = %reason, "Lost track of agent process");
            }
            other => tracing::info!(state = ?other, "Agent process finished"),
        }
        self.lifecycle.send_modify(|l| l.state = state);

        if summary.is_none() {
            // A descendant that inherited the pipes can keep them open after
            // the agent exits. Output is only awaited for the grace period.
            match tokio::time::timeout(self.grace, &mut drain).await {
                Ok(drained) => summary = Some(drained),
                Err(_) => {
                    tracing::warn!(grace = ?self.grace, "Output still open after exit, abandoning it");
                    self.multiplexer.registry().deliver_closed();
                }
            }
        }

        if let Some(summary) = &summary {
            for error in &summary.errors {
                tracing::warn!(error = %error, "Output stream ended with an error");
            }
        }
        self.lifecycle.send_modify(|l| l.output_closed = true);
    }
}
