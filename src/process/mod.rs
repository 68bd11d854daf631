//! Process launching and lifecycle tracking.

mod launcher;
mod state;

pub use launcher::*;
pub use state::*;
