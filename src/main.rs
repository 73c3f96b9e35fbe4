//! NeuroNet GA CLI - Evolve an XOR network from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use neuronet_ga::{
    compute::evolution::EvolutionEngine,
    compute::{Activation, FeedForwardNet},
    schema::{EngineConfig, WeightMap},
};

/// XOR truth table.
const XOR_CASES: [([f32; 2], f32); 4] = [
    ([0.0, 0.0], 0.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 0.0], 1.0),
    ([1.0, 1.0], 0.0),
];

/// Run configuration read from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RunConfig {
    #[serde(default)]
    engine: EngineConfig,
    /// Neurons per layer, input layer first. Must start with 2 and end with 1.
    #[serde(default = "default_layers")]
    layers: Vec<usize>,
    #[serde(default)]
    activation: Activation,
    /// Number of evaluator threads.
    #[serde(default = "default_evaluators")]
    evaluators: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            layers: default_layers(),
            activation: Activation::default(),
            evaluators: default_evaluators(),
        }
    }
}

fn default_layers() -> Vec<usize> {
    vec![2, 3, 1]
}
fn default_evaluators() -> usize {
    4
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [generations]", args[0]);
        eprintln!();
        eprintln!("Evolve a feed-forward network that computes XOR.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to run configuration file");
        eprintln!("  generations  Number of evolution cycles (default: 100)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let generations: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);

    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: RunConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if config.layers.first() != Some(&2) || config.layers.last() != Some(&1) {
        eprintln!("XOR needs 2 inputs and 1 output, got layers {:?}", config.layers);
        std::process::exit(1);
    }

    let net = FeedForwardNet::new(config.activation, &config.layers).unwrap_or_else(|e| {
        eprintln!("Error building network: {}", e);
        std::process::exit(1);
    });

    let engine = EvolutionEngine::new(config.engine.clone(), &net).unwrap_or_else(|e| {
        eprintln!("Error creating engine: {}", e);
        std::process::exit(1);
    });

    println!("NeuroNet GA - XOR");
    println!("=================");
    println!("Layers: {:?} ({:?})", config.layers, config.activation);
    println!(
        "Generation size: {} (buffering {} x {})",
        config.engine.generation_size,
        config.engine.buffer_count,
        config.engine.buffered_generation_size
    );
    println!("Evaluators: {}", config.evaluators.max(1));
    println!("Generations: {}", generations);
    println!();

    let start = Instant::now();

    for i in 0..generations {
        evaluate_generation(&engine, &net, config.evaluators.max(1));

        let summary = engine
            .begin_evolution_cycle_async(|_| {})
            .and_then(|ticket| ticket.wait())
            .unwrap_or_else(|e| {
                eprintln!("Evolution failed: {}", e);
                std::process::exit(1);
            });

        // Print progress every 10%
        if (i + 1) % (generations / 10).max(1) == 0 {
            let elapsed = start.elapsed().as_secs_f32();
            println!(
                "  Generation {}/{}: best={:.6}, mean={:.6}, {:.1} gen/s",
                summary.generation,
                generations,
                summary.best_fitness.unwrap_or(f64::NAN),
                summary.mean_fitness.unwrap_or(f64::NAN),
                (i + 1) as f32 / elapsed
            );
        }
    }

    let elapsed = start.elapsed();
    println!();

    match engine.best_retired() {
        Some((genome, fitness)) => {
            println!("Best retained genome: fitness {:.6}", fitness);
            let mut net = net.clone();
            if net.apply_genome(&genome).is_ok() {
                for (inputs, expected) in XOR_CASES {
                    let out = net.evaluate(&inputs).map(|o| o[0]).unwrap_or(f32::NAN);
                    println!("  {:?} -> {:.4} (expected {})", inputs, out, expected);
                }
            }
        }
        None => println!("No genomes retained."),
    }

    println!();
    println!(
        "Time: {:.2}s ({:.1} gen/s)",
        elapsed.as_secs_f32(),
        generations as f32 / elapsed.as_secs_f32()
    );
}

/// Score every genome of the current generation on a pool of threads.
fn evaluate_generation(engine: &EvolutionEngine, net: &FeedForwardNet, evaluators: usize) {
    let genomes: Vec<Arc<WeightMap>> = engine.genomes();
    let next = AtomicUsize::new(0);

    thread::scope(|scope| {
        for _ in 0..evaluators {
            let mut net = net.clone();
            let genomes = &genomes;
            let next = &next;
            scope.spawn(move || {
                loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(genome) = genomes.get(index) else {
                        break;
                    };
                    if let Some(score) = xor_fitness(&mut net, genome) {
                        engine.report_fitness(score, genome);
                    }
                }
            });
        }
    });
}

/// Negative squared error over the XOR truth table.
fn xor_fitness(net: &mut FeedForwardNet, genome: &WeightMap) -> Option<f64> {
    net.apply_genome(genome).ok()?;
    let mut error = 0.0f64;
    for (inputs, expected) in XOR_CASES {
        let out = net.evaluate(&inputs).ok()?;
        let diff = f64::from(out[0] - expected);
        error += diff * diff;
    }
    Some(-error)
}

fn print_example_config() {
    let config = RunConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
