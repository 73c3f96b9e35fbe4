//! Genetic evolution of network weights.
//!
//! # Overview
//!
//! The evolution system consists of:
//!
//! - **Genome Operations** (`genome`): Random variation, crossover, and mutation
//! - **Generations** (`generation`): Genomes with their fitness accumulators
//! - **Selection** (`selection`): Ranking by average reported fitness
//! - **History** (`history`): Bounded buffer of retired generations
//! - **Engine** (`engine`): Thread-safe reporting and evolution cycles
//!
//! # Example
//!
//! ```rust,no_run
//! use neuronet_ga::schema::{EngineConfig, Topology};
//! use neuronet_ga::compute::evolution::EvolutionEngine;
//!
//! let topology = Topology::feed_forward(&[2, 3, 1]).unwrap();
//! let engine = EvolutionEngine::new(EngineConfig::default(), &topology).unwrap();
//!
//! for genome in engine.genomes() {
//!     let score = genome.weight_count() as f64; // evaluate externally
//!     engine.report_fitness(score, &genome);
//! }
//!
//! let summary = engine.begin_evolution_cycle().unwrap();
//! println!("Generation {}: best = {:?}", summary.generation, summary.best_fitness);
//! ```
//!
//! # Crossover Strategies
//!
//! - `LayerAlternation`: Whole layers from either parent
//! - `HalfSplit`: Lower half of each layer from A, upper half from B
//! - `NeuronAlternation`: Alternating neurons across the whole genome
//!
//! # Mutation Styles
//!
//! - `PointMutation`: Scale a single weight or bias
//! - `LayerSwap`: Exchange two layers
//! - `IntraLayerSwap`: Exchange neurons within one layer
//! - `GlobalSwap`: Exchange neurons anywhere in the genome

mod engine;
mod generation;
mod genome;
mod history;
mod selection;

pub use engine::{
    CompletionCallback, EngineError, EvolutionEngine, EvolutionTicket, GenerationObserver,
};
pub use generation::{Generation, GenomeSlot, ReportOutcome, SlotState};
pub use genome::{CrossoverStrategy, GenomeRng, MutationReport, MutationStyle};
pub use history::{GenerationBuffer, RetiredGeneration};
pub use selection::rank_generation;
