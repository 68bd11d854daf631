//! Backend registry: per-agent command construction.

mod amp;
mod claude;
mod codex;
mod command;
mod env;
mod gemini;
mod opencode;
mod registry;

pub use command::*;
pub use env::*;
pub use registry::*;
