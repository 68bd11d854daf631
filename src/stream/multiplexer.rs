//! Drain loop over a child's stdout and stderr.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use super::{LineSplitter, ObserverRegistry, OutputLine, SplitLine, StreamReadError, StreamSource};

/// What one drain produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub stdout_lines: u64,
    pub stderr_lines: u64,
    /// Observer callbacks that panicked, summed over all deliveries.
    pub observer_panics: usize,
    /// Lines cut short by the line length cap.
    pub truncated_lines: u64,
    pub errors: Vec<StreamReadError>,
}

impl DrainSummary {
    #[must_use]
    pub fn total_lines(&self) -> u64 {
        self.stdout_lines + self.stderr_lines
    }
}

struct Pipe<R> {
    source: StreamSource,
    reader: Option<R>,
    splitter: LineSplitter,
    buf: Vec<u8>,
}

impl<R> Pipe<R> {
    fn new(
        source: StreamSource,
        reader: Option<R>,
        chunk_size: usize,
        max_line_bytes: Option<usize>,
    ) -> Self {
        Self {
            source,
            reader,
            splitter: LineSplitter::new(max_line_bytes),
            buf: vec![0; chunk_size.max(1)],
        }
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }
}

async fn read_chunk<R: AsyncRead + Unpin>(reader: &mut Option<R>, buf: &mut [u8]) -> io::Result<usize> {
    match reader {
        Some(reader) => reader.read(buf).await,
        None => Ok(0),
    }
}

/// Splits child output into lines and fans them out to a registry.
///
/// Both pipes are read from a single loop, so observers of one child are
/// never invoked concurrently and every line gets a sequence number that is
/// global across the two pipes.
#[derive(Debug, Clone)]
pub struct Multiplexer {
    registry: ObserverRegistry,
    chunk_size: usize,
    max_line_bytes: Option<usize>,
}

impl Multiplexer {
    #[must_use]
    pub fn new(registry: ObserverRegistry, chunk_size: usize, max_line_bytes: Option<usize>) -> Self {
        Self {
            registry,
            chunk_size,
            max_line_bytes,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ObserverRegistry {
        &self.registry
    }

    /// Read both pipes to end of stream, delivering each line as it completes.
    ///
    /// A read error ends that pipe only: it is reported to observers and the
    /// other pipe keeps draining. Observers get `on_closed` once both pipes
    /// are done. Dropping the future stops reading without notifying them.
    pub async fn drain<O, E>(&self, stdout: Option<O>, stderr: Option<E>) -> DrainSummary
    where
        O: AsyncRead + Unpin,
        E: AsyncRead + Unpin,
    {
        let mut out = Pipe::new(StreamSource::Stdout, stdout, self.chunk_size, self.max_line_bytes);
        let mut err = Pipe::new(StreamSource::Stderr, stderr, self.chunk_size, self.max_line_bytes);
        let mut summary = DrainSummary::default();

        loop {
            tokio::select! {
                result = read_chunk(&mut out.reader, &mut out.buf), if out.is_open() => {
                    self.consume(&mut out, result, &mut summary);
                }
                result = read_chunk(&mut err.reader, &mut err.buf), if err.is_open() => {
                    self.consume(&mut err, result, &mut summary);
                }
                else => break,
            }
        }

        summary.observer_panics += self.registry.deliver_closed().panicked;
        tracing::debug!(
            stdout_lines = summary.stdout_lines,
            stderr_lines = summary.stderr_lines,
            truncated = summary.truncated_lines,
            errors = summary.errors.len(),
            "Output drained"
        );
        summary
    }

    fn consume<R>(&self, pipe: &mut Pipe<R>, result: io::Result<usize>, summary: &mut DrainSummary) {
        match result {
            Ok(0) => {
                self.flush(pipe, summary);
                pipe.reader = None;
                tracing::trace!(source = %pipe.source, "Pipe closed");
            }
            Ok(n) => {
                for line in pipe.splitter.push(&pipe.buf[..n]) {
                    self.emit(pipe.source, line, summary);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                self.flush(pipe, summary);
                pipe.reader = None;
                let error = StreamReadError::new(pipe.source, &e);
                tracing::warn!(source = %pipe.source, error = %e, "Failed to read agent output");
                summary.observer_panics += self.registry.deliver_error(&error).panicked;
                summary.errors.push(error);
            }
        }
    }

    fn flush<R>(&self, pipe: &mut Pipe<R>, summary: &mut DrainSummary) {
        if let Some(line) = pipe.splitter.finish() {
            self.emit(pipe.source, line, summary);
        }
    }

    fn emit(&self, source: StreamSource, split: SplitLine, summary: &mut DrainSummary) {
        let line = OutputLine::new(source, summary.total_lines(), split.bytes);
        if split.dropped > 0 {
            summary.truncated_lines += 1;
            tracing::warn!(
                source = %source,
                sequence = line.sequence(),
                dropped = split.dropped,
                "Output line exceeded the length cap; excess bytes discarded"
            );
        }
        match source {
            StreamSource::Stdout => summary.stdout_lines += 1,
            StreamSource::Stderr => summary.stderr_lines += 1,
        }
        summary.observer_panics += self.registry.deliver_line(&line).panicked;
    }
}
