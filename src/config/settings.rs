//! Runtime settings for spawned processes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables applied to every process an executor launches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Grace period between SIGTERM and SIGKILL when killing a child.
    pub terminate_timeout_ms: u64,
    /// Bytes requested per read from the child's output pipes.
    pub read_chunk_size: usize,
    /// Optional cap on delivered line length. Bytes past it are discarded
    /// and the line is still delivered once. Unbounded when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_line_bytes: Option<usize>,
}

fn default_terminate_timeout_ms() -> u64 {
    5000
}

fn default_read_chunk_size() -> usize {
    8192
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            terminate_timeout_ms: default_terminate_timeout_ms(),
            read_chunk_size: default_read_chunk_size(),
            max_line_bytes: None,
        }
    }
}

impl ExecutorSettings {
    #[must_use]
    pub fn terminate_timeout(&self) -> Duration {
        Duration::from_millis(self.terminate_timeout_ms)
    }

    /// Read chunk size, never zero.
    #[must_use]
    pub fn read_chunk_size(&self) -> usize {
        self.read_chunk_size.max(1)
    }

    /// Line length cap, never zero.
    #[must_use]
    pub fn max_line_bytes(&self) -> Option<usize> {
        self.max_line_bytes.map(|max| max.max(1))
    }
}
