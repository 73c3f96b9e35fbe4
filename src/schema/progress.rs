//! Progress and result types reported by the evolution engine.

use serde::{Deserialize, Serialize};

/// Current phase of the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EnginePhase {
    /// Accepting fitness reports for the current generation.
    #[default]
    Open,
    /// Ranking, breeding and swapping in the next generation.
    Evolving,
}

/// Summary of one completed evolution cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleSummary {
    /// Generation number now installed (1 after the first cycle).
    pub generation: u64,
    /// Highest average fitness in the retired generation.
    pub best_fitness: Option<f64>,
    /// Mean of the average fitnesses of reported genomes.
    pub mean_fitness: Option<f64>,
    /// Genomes that received at least one report.
    pub reported: usize,
    /// Genomes that received no report.
    pub unreported: usize,
    /// Children produced by crossover.
    pub bred: usize,
    /// Genomes produced by mutation.
    pub mutated: usize,
    /// Elementary mutation operations performed.
    pub mutation_operations: usize,
    /// Generation number evicted from the history buffer, if any.
    pub evicted: Option<u64>,
}
