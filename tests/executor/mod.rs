//! Executor tests: real processes driven through shell scripts.

mod env_test;
mod spawn_test;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use vibe_executor::config::ExecutorSettings;
use vibe_executor::stream::{Observer, OutputLine, StreamSource};
use vibe_executor::Executor;

/// Upper bound for any single wait in these tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Write `body` as `agent.sh` into `dir` and return its path.
pub fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("agent.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write script");
    path
}

/// An executor whose GEMINI backend runs `sh <script>` instead of the real CLI.
///
/// The script receives the backend's usual arguments, ending in
/// `--prompt <prompt>`.
pub fn script_executor(dir: &Path, body: &str) -> Executor {
    script_executor_with(dir, body, json!({}))
}

/// Like [`script_executor`], merging `extra` into the GEMINI options.
pub fn script_executor_with(dir: &Path, body: &str, extra: serde_json::Value) -> Executor {
    let script = write_script(dir, body);
    let mut options = json!({ "base_command_override": format!("sh {}", script.display()) });
    if let (Some(target), Some(source)) = (options.as_object_mut(), extra.as_object()) {
        for (key, value) in source {
            target.insert(key.clone(), value.clone());
        }
    }
    Executor::from_value(&json!({ "GEMINI": options }))
        .expect("Failed to build executor")
        .with_settings(ExecutorSettings {
            terminate_timeout_ms: 500,
            ..ExecutorSettings::default()
        })
}

/// Observer that records every line it sees.
#[derive(Default)]
pub struct Recorder {
    lines: Mutex<Vec<(StreamSource, String)>>,
}

impl Recorder {
    pub fn texts(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn from_source(&self, source: StreamSource) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == source)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

impl Observer for Recorder {
    fn on_line(&self, line: &OutputLine) {
        self.lines
            .lock()
            .unwrap()
            .push((line.source(), line.text().into_owned()));
    }
}

/// Observer forwarding line text to a channel, for step-by-step tests.
pub fn channel_observer() -> (Arc<dyn Observer>, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let observer: Arc<dyn Observer> = Arc::new(move |line: &OutputLine| {
        let _ = tx.send(line.text().into_owned());
    });
    (observer, rx)
}

/// Receive the next line or fail after [`TEST_TIMEOUT`].
pub async fn next_line(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(TEST_TIMEOUT, rx.recv())
        .await
        .expect("Timed out waiting for output")
        .expect("Output channel closed")
}
