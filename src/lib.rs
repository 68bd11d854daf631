//! Vibe Executor - spawn coding-agent CLIs and stream their output.
//!
//! A [`config::Configuration`] selects exactly one backend. An
//! [`executor::Executor`] built from it spawns the backend's CLI per prompt
//! and returns an [`executor::ChildHandle`] for streaming output lines and
//! awaiting the exit status.

pub mod backend;
pub mod config;
pub mod display;
pub mod executor;
pub mod process;
pub mod stream;

pub use executor::{ChildHandle, Executor, ExecutorError};
