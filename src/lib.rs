//! NeuroNet GA - Genetic training of feed-forward network weights.
//!
//! This crate evolves the weights and biases of a fixed-topology
//! feed-forward network. Callers evaluate genomes however they like,
//! report fitness scores from any number of threads, and trigger
//! evolution cycles that rank, breed and mutate the next generation.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration, topology, genome and progress types
//! - `compute`: Feed-forward network and the evolution engine
//!
//! # Example
//!
//! ```rust,no_run
//! use neuronet_ga::{
//!     compute::{Activation, FeedForwardNet},
//!     compute::evolution::EvolutionEngine,
//!     schema::EngineConfig,
//! };
//!
//! let mut net = FeedForwardNet::new(Activation::Sigmoid, &[2, 3, 1]).unwrap();
//! let engine = EvolutionEngine::new(EngineConfig::default(), &net).unwrap();
//!
//! for _ in 0..10 {
//!     for genome in engine.genomes() {
//!         net.apply_genome(&genome).unwrap();
//!         let out = net.evaluate(&[1.0, 0.0]).unwrap();
//!         engine.report_fitness(f64::from(out[0]), &genome);
//!     }
//!     engine.begin_evolution_cycle().unwrap();
//! }
//!
//! println!("Best retained: {:?}", engine.best_retired().map(|(_, f)| f));
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{EngineError, EvolutionEngine, ReportOutcome};
pub use compute::{Activation, FeedForwardNet};
pub use schema::{EngineConfig, Topology, WeightMap};
