//! Output observers and their registry.

use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{OutputLine, StreamSource};

/// A read failure on one of the child's output pipes.
///
/// Terminal for that pipe: no further lines arrive from it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to read child {stream}: {message}")]
pub struct StreamReadError {
    pub stream: StreamSource,
    pub kind: io::ErrorKind,
    pub message: String,
}

impl StreamReadError {
    #[must_use]
    pub fn new(stream: StreamSource, err: &io::Error) -> Self {
        Self {
            stream,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// A consumer of child output.
///
/// Callbacks run synchronously inside the drain loop and must return
/// quickly; a blocked observer stalls the child's pipes.
pub trait Observer: Send + Sync {
    /// Called once per line, in emission order.
    fn on_line(&self, line: &OutputLine);

    /// Called when a pipe fails. No more lines arrive from `error.stream`.
    fn on_stream_error(&self, error: &StreamReadError) {
        let _ = error;
    }

    /// Called once after both pipes have closed.
    fn on_closed(&self) {}
}

impl<F> Observer for F
where
    F: Fn(&OutputLine) + Send + Sync,
{
    fn on_line(&self, line: &OutputLine) {
        self(line);
    }
}

/// Position of an observer in its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(usize);

/// Counts from delivering one event to a snapshot of observers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub panicked: usize,
}

type Snapshot = Arc<Vec<Arc<dyn Observer>>>;

#[derive(Default)]
struct Inner {
    observers: Snapshot,
    closed: bool,
}

/// Append-only, shareable list of observers.
///
/// Registration swaps in a new list (copy-on-write), so delivery iterates a
/// consistent snapshot and never holds the lock while calling observers. An
/// observer registered during a delivery first sees the next line; one
/// registered after close gets `on_closed` straight away.
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}

impl ObserverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. It receives only events emitted after this call.
    pub fn register(&self, observer: Arc<dyn Observer>) -> ObserverId {
        let (id, closed) = {
            let mut inner = self.lock();
            let mut next: Vec<Arc<dyn Observer>> = inner.observers.as_ref().clone();
            next.push(Arc::clone(&observer));
            inner.observers = Arc::new(next);
            (ObserverId(inner.observers.len() - 1), inner.closed)
        };
        tracing::debug!(observer = id.0, closed, "Registered output observer");

        if closed && catch_unwind(AssertUnwindSafe(|| observer.on_closed())).is_err() {
            tracing::warn!(observer = id.0, "Output observer panicked");
        }
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` once output has ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.lock().observers)
    }

    /// Deliver a line to every observer registered right now.
    pub fn deliver_line(&self, line: &OutputLine) -> Delivery {
        self.deliver(|observer| observer.on_line(line))
    }

    /// Report a pipe failure to every observer registered right now.
    pub fn deliver_error(&self, error: &StreamReadError) -> Delivery {
        self.deliver(|observer| observer.on_stream_error(error))
    }

    /// Mark output as ended and tell every registered observer, once.
    pub fn deliver_closed(&self) -> Delivery {
        let snapshot = {
            let mut inner = self.lock();
            if inner.closed {
                return Delivery::default();
            }
            inner.closed = true;
            Arc::clone(&inner.observers)
        };
        Self::deliver_to(&snapshot, |observer| observer.on_closed())
    }

    fn deliver(&self, call: impl Fn(&dyn Observer)) -> Delivery {
        Self::deliver_to(&self.snapshot(), call)
    }

    fn deliver_to(snapshot: &Snapshot, call: impl Fn(&dyn Observer)) -> Delivery {
        let mut report = Delivery::default();

        for (index, observer) in snapshot.iter().enumerate() {
            // A panicking observer must not starve the others.
            match catch_unwind(AssertUnwindSafe(|| call(observer.as_ref()))) {
                Ok(()) => report.delivered += 1,
                Err(_) => {
                    report.panicked += 1;
                    tracing::warn!(observer = index, "Output observer panicked");
                }
            }
        }

        report
    }
}
