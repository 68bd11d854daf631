//! Configuration module.

mod error;
mod loader;
mod options;
mod settings;
mod types;

pub use error::*;
pub use loader::*;
pub use options::*;
pub use settings::*;
pub use types::*;
