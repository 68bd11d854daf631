//! Output lines and the byte-level line splitter.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSource {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// One line of child output, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    source: StreamSource,
    sequence: u64,
    bytes: Vec<u8>,
    received_at: DateTime<Utc>,
}

impl OutputLine {
    #[must_use]
    pub fn new(source: StreamSource, sequence: u64, bytes: Vec<u8>) -> Self {
        Self {
            source,
            sequence,
            bytes,
            received_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn source(&self) -> StreamSource {
        self.source
    }

    /// Position of this line among all lines of the same child, from zero.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The raw bytes exactly as emitted.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The line as text; invalid UTF-8 is replaced.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    #[must_use]
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

impl fmt::Display for OutputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// A line produced by [`LineSplitter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitLine {
    pub bytes: Vec<u8>,
    /// Bytes past the configured cap that were discarded from this line.
    pub dropped: usize,
}

/// Splits a byte stream into lines.
///
/// Lines end at `\n`; a `\r` right before it is dropped. Bytes after the last
/// terminator are held until more input arrives or [`LineSplitter::finish`]
/// flushes them. Lines are unbounded unless a cap is given, in which case
/// bytes past the cap are discarded and counted in [`SplitLine::dropped`].
/// Each terminator yields exactly one line either way.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
    max_line_bytes: Option<usize>,
    dropped: usize,
    ends_with_cr: bool,
}

impl LineSplitter {
    #[must_use]
    pub fn new(max_line_bytes: Option<usize>) -> Self {
        Self {
            max_line_bytes: max_line_bytes.map(|max| max.max(1)),
            ..Self::default()
        }
    }

    /// Feed a chunk, returning every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SplitLine> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.append(&rest[..pos]);
            lines.push(self.take_line());
            rest = &rest[pos + 1..];
        }
        self.append(rest);

        lines
    }

    /// Flush a trailing partial line at end of stream.
    pub fn finish(&mut self) -> Option<SplitLine> {
        if self.pending.is_empty() && self.dropped == 0 {
            None
        } else {
            Some(self.take_line())
        }
    }

    /// Bytes held back waiting for a terminator.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn append(&mut self, bytes: &[u8]) {
        let Some(&last) = bytes.last() else {
            return;
        };
        self.ends_with_cr = last == b'\r';

        let room = self
            .max_line_bytes
            .map_or(usize::MAX, |max| max.saturating_sub(self.pending.len()));
        let keep = bytes.len().min(room);
        self.pending.extend_from_slice(&bytes[..keep]);
        self.dropped += bytes.len() - keep;
    }

    fn take_line(&mut self) -> SplitLine {
        let mut bytes = std::mem::take(&mut self.pending);
        // When bytes were dropped the trailing `\r` went with them.
        if self.ends_with_cr && self.dropped == 0 {
            bytes.pop();
        }
        self.ends_with_cr = false;
        SplitLine {
            bytes,
            dropped: std::mem::take(&mut self.dropped),
        }
    }
}
