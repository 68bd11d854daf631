//! Executor facade: configuration in, supervised agent processes out.

mod error;
mod handle;
mod runner;

pub use error::*;
pub use handle::*;
pub use runner::*;
