//! Child output: line splitting, observers and the drain loop.

mod line;
mod multiplexer;
mod observer;

pub use line::*;
pub use multiplexer::*;
pub use observer::*;
