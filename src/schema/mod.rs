//! Schema module - Configuration, topology and genome types.

mod config;
mod genome;
mod progress;
mod topology;

pub use config::*;
pub use genome::*;
pub use progress::*;
pub use topology::*;
