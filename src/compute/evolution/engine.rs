//! Evolution engine: owns the current generation and runs evolution cycles.
//!
//! Evaluators pull genomes with [`EvolutionEngine::genome`], score them
//! externally and call [`EvolutionEngine::report_fitness`] from any thread.
//! A cycle ranks the current generation, breeds and mutates a replacement,
//! retires the fittest genomes into the history buffer and notifies the
//! observer.
//!
//! One mutex guards the generation, the counter and the history. It is held
//! only to record reports, to rank, and to swap in the next generation;
//! breeding and mutation run without it.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, SendError, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use log::{debug, info, trace, warn};
use rayon::prelude::*;

use crate::schema::{
    ConfigError, CycleSummary, EngineConfig, EnginePhase, GenomeError, Topology, TopologySource,
    WeightMap,
};

use super::generation::{Generation, ReportOutcome};
use super::genome::{CrossoverStrategy, GenomeRng, MutationReport};
use super::history::{GenerationBuffer, RetiredGeneration};
use super::selection::rank_generation;

/// Observer notified once per completed cycle, after the new generation is visible.
pub type GenerationObserver = Box<dyn Fn(&CycleSummary) + Send + Sync>;

/// Callback attached to a single asynchronous cycle request.
pub type CompletionCallback = Box<dyn FnOnce(&CycleSummary) + Send>;

/// Evolution cycle errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Evolution cycle failed: {0}")]
    Genome(#[from] GenomeError),
    #[error("Ranking covered {found} of {expected} genomes")]
    IncompleteRanking { expected: usize, found: usize },
    #[error("Failed to start evolution worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
    #[error("Evolution worker stopped before completing the cycle")]
    WorkerStopped,
}

struct EngineState {
    current: Generation,
    history: GenerationBuffer,
    generation: u64,
    phase: EnginePhase,
}

struct Shared {
    config: EngineConfig,
    topology: Topology,
    state: Mutex<EngineState>,
    cycle_gate: Mutex<()>,
    rng: Mutex<GenomeRng>,
    observer: RwLock<Option<GenerationObserver>>,
}

/// A genome captured by a ranking pass.
struct RankedGenome {
    genome: Arc<WeightMap>,
    average: Option<f64>,
}

enum Offspring {
    Bred {
        genome: WeightMap,
        strategy: CrossoverStrategy,
    },
    Mutated {
        genome: WeightMap,
        report: MutationReport,
    },
}

/// Genetic trainer for a fixed network topology.
pub struct EvolutionEngine {
    shared: Arc<Shared>,
    worker: Mutex<Option<EvolutionWorker>>,
}

impl EvolutionEngine {
    /// Create an engine whose generation zero is a random variation of the
    /// default-weighted scaffold of `template`.
    pub fn new<T: TopologySource + ?Sized>(
        config: EngineConfig,
        template: &T,
    ) -> Result<Self, ConfigError> {
        let topology = Topology::of(template)?;
        let genome = WeightMap::from_topology(&topology);
        Self::build(config, topology, genome)
    }

    /// Create an engine whose generation zero varies the weights of an
    /// existing genome, e.g. one extracted from a trained network.
    pub fn from_genome(config: EngineConfig, template: WeightMap) -> Result<Self, ConfigError> {
        let topology = Topology::of(&template)?;
        template
            .check_shape(&topology)
            .map_err(|e| ConfigError::InvalidTopology(e.to_string()))?;
        Self::build(config, topology, template)
    }

    fn build(
        config: EngineConfig,
        topology: Topology,
        template: WeightMap,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut rng = config
            .random_seed
            .map_or_else(GenomeRng::random, GenomeRng::new);
        let genomes = (0..config.generation_size)
            .map(|_| rng.random_variation(&template, &config.mutation))
            .collect();

        info!(
            "Evolution engine ready: {} genomes of {} layers ({} neurons), buffering {} x {}",
            config.generation_size,
            topology.layer_count(),
            topology.neuron_count(),
            config.buffer_count,
            config.buffered_generation_size
        );

        let state = EngineState {
            current: Generation::new(genomes),
            history: GenerationBuffer::new(config.buffer_count),
            generation: 0,
            phase: EnginePhase::Open,
        };

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                topology,
                state: Mutex::new(state),
                cycle_gate: Mutex::new(()),
                rng: Mutex::new(rng),
                observer: RwLock::new(None),
            }),
            worker: Mutex::new(None),
        })
    }

    /// Set the observer notified after every cycle.
    pub fn with_observer<F>(self, observer: F) -> Self
    where
        F: Fn(&CycleSummary) + Send + Sync + 'static,
    {
        self.set_observer(observer);
        self
    }

    /// Replace the observer notified after every cycle.
    ///
    /// The observer runs while the cycle still holds the engine's cycle gate.
    /// It may queue another cycle with
    /// [`begin_evolution_cycle_async`](Self::begin_evolution_cycle_async) but
    /// must not call the blocking [`begin_evolution_cycle`](Self::begin_evolution_cycle).
    pub fn set_observer<F>(&self, observer: F)
    where
        F: Fn(&CycleSummary) + Send + Sync + 'static,
    {
        let mut slot = self
            .shared
            .observer
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Box::new(observer));
    }

    /// Record a fitness score for a genome of the current generation.
    ///
    /// Never fails: reports for genomes that are unknown, already ranked or
    /// carry a non-finite score are dropped and described by the outcome.
    pub fn report_fitness(&self, score: f64, genome: &Arc<WeightMap>) -> ReportOutcome {
        let outcome = self.shared.lock_state().current.record_fitness(score, genome);
        if outcome == ReportOutcome::NonFinite {
            warn!("Dropped non-finite fitness score {score}");
        }
        outcome
    }

    /// Run one evolution cycle on the calling thread.
    ///
    /// Waits for any cycle already in progress to finish first.
    pub fn begin_evolution_cycle(&self) -> Result<CycleSummary, EngineError> {
        self.shared.run_cycle()
    }

    /// Queue one evolution cycle on the engine's worker thread.
    ///
    /// `on_complete` runs on the worker after a successful cycle, once the
    /// ticket has been resolved. A worker that has died is replaced.
    pub fn begin_evolution_cycle_async<F>(
        &self,
        on_complete: F,
    ) -> Result<EvolutionTicket, EngineError>
    where
        F: FnOnce(&CycleSummary) + Send + 'static,
    {
        let (reply, receiver) = mpsc::channel();
        let mut request = EvolutionRequest {
            on_complete: Box::new(on_complete),
            reply,
        };

        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = worker.as_ref() {
            match current.sender.send(request) {
                Ok(()) => return Ok(EvolutionTicket { receiver }),
                Err(SendError(returned)) => request = returned,
            }
        }

        if let Some(dead) = worker.take() {
            warn!("Evolution worker stopped; starting a new one");
            if dead.handle.join().is_err() {
                warn!("Evolution worker panicked");
            }
        }

        let fresh = EvolutionWorker::spawn(Arc::clone(&self.shared))?;
        fresh
            .sender
            .send(request)
            .map_err(|_| EngineError::WorkerStopped)?;
        *worker = Some(fresh);

        Ok(EvolutionTicket { receiver })
    }

    /// Number of completed cycles.
    pub fn generation_count(&self) -> u64 {
        self.shared.lock_state().generation
    }

    /// Number of genomes in the current generation.
    pub fn current_genome_count(&self) -> usize {
        self.shared.lock_state().current.len()
    }

    /// Shared handle to a genome of the current generation.
    pub fn genome(&self, index: usize) -> Option<Arc<WeightMap>> {
        self.shared.lock_state().current.genome(index).cloned()
    }

    /// Handles to every genome of the current generation.
    pub fn genomes(&self) -> Vec<Arc<WeightMap>> {
        self.shared
            .lock_state()
            .current
            .slots()
            .iter()
            .map(|slot| Arc::clone(slot.genome()))
            .collect()
    }

    /// Cumulative fitness and report count of a current slot.
    pub fn slot_fitness(&self, index: usize) -> Option<(f64, u32)> {
        self.shared
            .lock_state()
            .current
            .slot(index)
            .map(|slot| (slot.fitness_sum(), slot.reports()))
    }

    /// Snapshot of the retired generations, oldest first.
    pub fn history(&self) -> Vec<RetiredGeneration> {
        self.shared.lock_state().history.iter().cloned().collect()
    }

    /// Fittest genome ever retained in the history buffer.
    pub fn best_retired(&self) -> Option<(Arc<WeightMap>, f64)> {
        self.shared
            .lock_state()
            .history
            .best_genome()
            .map(|(genome, fitness)| (Arc::clone(genome), fitness))
    }

    /// Current phase.
    pub fn phase(&self) -> EnginePhase {
        self.shared.lock_state().phase
    }

    /// Topology every genome conforms to.
    pub fn topology(&self) -> &Topology {
        &self.shared.topology
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }
}

impl Drop for EvolutionEngine {
    fn drop(&mut self) {
        let worker = self
            .worker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(EvolutionWorker { sender, handle }) = worker {
            // Closing the channel lets the worker drain queued cycles and exit.
            drop(sender);
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                warn!("Evolution worker panicked");
            }
        }
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_cycle(&self) -> Result<CycleSummary, EngineError> {
        let _gate = self
            .cycle_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let (generation, ranked) = self.rank_current();
        let result = self.breed_next(&ranked);

        let offspring = match result {
            Ok(offspring) => offspring,
            Err(e) => {
                let mut state = self.lock_state();
                state.current.reopen();
                state.phase = EnginePhase::Open;
                return Err(e);
            }
        };

        let summary = self.install(generation, &ranked, offspring);

        info!(
            "Generation {} ready: best={:?} mean={:?} reported={}/{}",
            summary.generation,
            summary.best_fitness,
            summary.mean_fitness,
            summary.reported,
            summary.reported + summary.unreported
        );

        self.lock_state().phase = EnginePhase::Open;

        let observer = self.observer.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(observer) = observer.as_ref()
            && let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| observer(&summary)))
        {
            warn!("Generation observer panicked: {}", panic_message(&*payload));
        }

        Ok(summary)
    }

    /// Rank the current generation under the state lock.
    fn rank_current(&self) -> (u64, Vec<RankedGenome>) {
        let mut state = self.lock_state();
        state.phase = EnginePhase::Evolving;

        let order = rank_generation(&mut state.current);
        let ranked = order
            .iter()
            .filter_map(|&i| state.current.slot(i))
            .map(|slot| RankedGenome {
                genome: Arc::clone(slot.genome()),
                average: slot.average_fitness(),
            })
            .collect();

        debug!("Ranked generation {}: {:?}", state.generation, order);
        (state.generation, ranked)
    }

    /// Build the next generation from a ranking, without holding the state lock.
    ///
    /// The first half of the slots are children of adjacent pairs from the top
    /// of the ranking; the remaining slots are mutated copies of the genomes at
    /// the same rank.
    fn breed_next(&self, ranked: &[RankedGenome]) -> Result<Vec<Offspring>, EngineError> {
        let size = self.config.generation_size;
        if ranked.len() != size {
            return Err(EngineError::IncompleteRanking {
                expected: size,
                found: ranked.len(),
            });
        }

        let seeds: Vec<u64> = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            (0..size).map(|_| rng.next_seed()).collect()
        };
        let bred = size / 2;
        let pairs = parent_pairs(size);

        let offspring = seeds
            .into_par_iter()
            .enumerate()
            .map(|(slot, seed)| {
                let mut rng = GenomeRng::new(seed);
                if slot < bred {
                    let (a, b) = pairs[slot % pairs.len()];
                    let (genome, strategy) =
                        rng.crossover(&ranked[a].genome, &ranked[b].genome, &self.topology)?;
                    Ok(Offspring::Bred { genome, strategy })
                } else {
                    let mut genome = ranked[slot].genome.as_ref().clone();
                    let report = rng.mutate(&mut genome, &self.config.mutation)?;
                    Ok(Offspring::Mutated { genome, report })
                }
            })
            .collect::<Result<Vec<_>, GenomeError>>()?;

        Ok(offspring)
    }

    /// Retire the ranked generation and install the offspring.
    fn install(
        &self,
        generation: u64,
        ranked: &[RankedGenome],
        offspring: Vec<Offspring>,
    ) -> CycleSummary {
        let kept = &ranked[..self.config.buffered_generation_size.min(ranked.len())];
        let retired = RetiredGeneration {
            generation,
            genomes: kept.iter().map(|r| Arc::clone(&r.genome)).collect(),
            average_fitness: kept.iter().map(|r| r.average).collect(),
        };

        let averages: Vec<f64> = ranked.iter().filter_map(|r| r.average).collect();
        let mean_fitness =
            (!averages.is_empty()).then(|| averages.iter().sum::<f64>() / averages.len() as f64);

        let mut bred = 0;
        let mut mutated = 0;
        let mut mutation_operations = 0;
        let genomes = offspring
            .into_iter()
            .map(|child| match child {
                Offspring::Bred { genome, strategy } => {
                    bred += 1;
                    trace!("Bred child with {:?}", strategy);
                    genome
                }
                Offspring::Mutated { genome, report } => {
                    mutated += 1;
                    mutation_operations += report.operations;
                    genome
                }
            })
            .collect();

        let mut state = self.lock_state();
        let evicted = state.history.push(retired).map(|e| e.generation);
        if let Some(old) = evicted {
            debug!("Evicted generation {} from history", old);
        }
        state.current = Generation::new(genomes);
        state.generation += 1;

        CycleSummary {
            generation: state.generation,
            best_fitness: ranked.first().and_then(|r| r.average),
            mean_fitness,
            reported: averages.len(),
            unreported: ranked.len() - averages.len(),
            bred,
            mutated,
            mutation_operations,
            evicted,
        }
    }
}

/// Adjacent parent pairs `(0, 1), (2, 3), ...` from the top half of a ranking.
///
/// An odd-sized top half pairs its last genome with the next rank down; a
/// ranking of one pairs the genome with itself.
fn parent_pairs(len: usize) -> Vec<(usize, usize)> {
    let top = (len / 2).max(1);
    (0..top)
        .step_by(2)
        .map(|i| (i, (i + 1).min(len.saturating_sub(1))))
        .collect()
}

struct EvolutionRequest {
    on_complete: CompletionCallback,
    reply: mpsc::Sender<Result<CycleSummary, EngineError>>,
}

/// Dedicated thread that runs queued cycles one after another.
struct EvolutionWorker {
    sender: mpsc::Sender<EvolutionRequest>,
    handle: JoinHandle<()>,
}

impl EvolutionWorker {
    fn spawn(shared: Arc<Shared>) -> Result<Self, EngineError> {
        let (sender, receiver) = mpsc::channel::<EvolutionRequest>();
        let handle = thread::Builder::new()
            .name("evolution-worker".to_string())
            .spawn(move || {
                for request in receiver {
                    let EvolutionRequest { on_complete, reply } = request;
                    let result = shared.run_cycle();
                    let summary = result.as_ref().ok().cloned();
                    // The caller may have dropped its ticket.
                    let _ = reply.send(result);

                    if let Some(summary) = summary {
                        let outcome =
                            panic::catch_unwind(AssertUnwindSafe(|| on_complete(&summary)));
                        if let Err(payload) = outcome {
                            warn!(
                                "Cycle completion callback panicked: {}",
                                panic_message(&*payload)
                            );
                        }
                    }
                }
                debug!("Evolution worker exiting");
            })
            .map_err(EngineError::WorkerSpawn)?;

        Ok(Self { sender, handle })
    }
}

/// Text of a caught panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Handle to a queued evolution cycle.
pub struct EvolutionTicket {
    receiver: mpsc::Receiver<Result<CycleSummary, EngineError>>,
}

impl EvolutionTicket {
    /// Block until the cycle finishes.
    pub fn wait(self) -> Result<CycleSummary, EngineError> {
        self.receiver
            .recv()
            .map_err(|_| EngineError::WorkerStopped)?
    }

    /// Outcome if the cycle has finished.
    pub fn try_wait(&self) -> Option<Result<CycleSummary, EngineError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(EngineError::WorkerStopped)),
        }
    }
}
