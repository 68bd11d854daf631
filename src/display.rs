//! Colored terminal output for the demo binary.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;

use crate::config::BackendKind;
use crate::process::ExitStatus;
use crate::stream::{OutputLine, StreamSource};

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Tag shown before each output line.
#[must_use]
pub fn source_tag(source: StreamSource) -> &'static str {
    match source {
        StreamSource::Stdout => "[OUT]",
        StreamSource::Stderr => "[ERR]",
    }
}

/// Print the command about to be launched.
pub fn print_spawn(backend: BackendKind, command: &str) {
    println!(
        "{} {} {} {}",
        timestamp(Utc::now()).dimmed(),
        "[SPAWN]".blue().bold(),
        backend.cyan(),
        command.dimmed()
    );
    let _ = io::stdout().flush();
}

/// Print one line of agent output. `raw` prints the bare text.
pub fn print_line(line: &OutputLine, raw: bool) {
    if raw {
        println!("{line}");
    } else {
        let tag = source_tag(line.source());
        let tag = match line.source() {
            StreamSource::Stdout => tag.green().bold().to_string(),
            StreamSource::Stderr => tag.yellow().bold().to_string(),
        };
        println!(
            "{} {} {}",
            timestamp(line.received_at()).dimmed(),
            tag,
            line.text()
        );
    }
    let _ = io::stdout().flush();
}

/// Print how the agent ended.
pub fn print_exit(status: ExitStatus) {
    let label = if status.success() {
        "[EXIT]".green().bold().to_string()
    } else {
        "[EXIT]".red().bold().to_string()
    };
    println!("{} {} {}", timestamp(Utc::now()).dimmed(), label, status);
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}
