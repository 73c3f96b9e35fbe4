//! Compute module - Network evaluation and genetic evolution.

mod network;

pub mod evolution;

pub use network::*;
