//! Genome manipulation utilities for evolutionary search.
//!
//! Provides random variation, crossover, and mutation operations over
//! [`WeightMap`]s. None of these operations ever change a genome's shape.

use log::trace;
use rand::prelude::*;

use crate::schema::{
    GenomeError, MAX_MUTATION_RATE, MutationConfig, NeuronGenes, Topology, WeightMap,
};

/// Crossover strategy used to breed two parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverStrategy {
    /// Each layer copied whole from parent A or B with probability 0.5.
    LayerAlternation,
    /// In every layer, the first `floor(n / 2)` neurons from A, the rest from B.
    HalfSplit,
    /// Neurons taken alternately from A and B, scanning layers then neurons.
    NeuronAlternation,
}

impl CrossoverStrategy {
    /// Every strategy, in declaration order.
    pub const ALL: [Self; 3] = [
        Self::LayerAlternation,
        Self::HalfSplit,
        Self::NeuronAlternation,
    ];
}

/// Mutation style applied to a genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStyle {
    /// Multiply random genes by a random factor.
    PointMutation,
    /// Swap the contents of random layer pairs.
    LayerSwap,
    /// Swap random neuron pairs within one layer.
    IntraLayerSwap,
    /// Swap random neuron pairs anywhere in the genome.
    GlobalSwap,
}

impl MutationStyle {
    /// Every style, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::PointMutation,
        Self::LayerSwap,
        Self::IntraLayerSwap,
        Self::GlobalSwap,
    ];

    /// Rate constant for this style, clamped to `[0, MAX_MUTATION_RATE]`.
    pub fn rate(self, config: &MutationConfig) -> f32 {
        let rate = match self {
            Self::PointMutation => config.point_rate,
            Self::LayerSwap => config.layer_swap_rate,
            Self::IntraLayerSwap => config.intra_layer_swap_rate,
            Self::GlobalSwap => config.global_swap_rate,
        };
        rate.clamp(0.0, MAX_MUTATION_RATE)
    }

    /// Upper bound on the operations one call may perform on `genome`.
    pub fn max_operations(self, config: &MutationConfig, genome: &WeightMap) -> usize {
        (self.rate(config) * genome.neuron_count() as f32).ceil() as usize
    }
}

/// What a mutation call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationReport {
    /// Style that was applied.
    pub style: MutationStyle,
    /// Number of elementary operations performed.
    pub operations: usize,
}

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Generate a randomly varied copy of `template` for generation zero.
    ///
    /// Every weight is multiplied by a factor drawn from the multiplier bounds
    /// and every bias is shifted by a uniform offset in `[-1, 1)`.
    pub fn random_variation(&mut self, template: &WeightMap, config: &MutationConfig) -> WeightMap {
        let mut map = template.clone();
        for genes in map.genes_mut() {
            for w in &mut genes.weights {
                *w *= self.multiplier(config);
            }
            genes.bias += self.rng.gen_range(-1.0f32..1.0);
        }
        map
    }

    /// Pick a crossover strategy uniformly.
    pub fn choose_strategy(&mut self) -> CrossoverStrategy {
        CrossoverStrategy::ALL[self.rng.gen_range(0..CrossoverStrategy::ALL.len())]
    }

    /// Pick a mutation style uniformly.
    pub fn choose_style(&mut self) -> MutationStyle {
        MutationStyle::ALL[self.rng.gen_range(0..MutationStyle::ALL.len())]
    }

    /// Breed two parents with a randomly chosen strategy.
    pub fn crossover(
        &mut self,
        parent_a: &WeightMap,
        parent_b: &WeightMap,
        topology: &Topology,
    ) -> Result<(WeightMap, CrossoverStrategy), GenomeError> {
        let strategy = self.choose_strategy();
        let child = self.crossover_with(strategy, parent_a, parent_b, topology)?;
        Ok((child, strategy))
    }

    /// Breed two parents with a given strategy.
    ///
    /// The child starts as a scaffold of `topology` and every neuron slot is
    /// then overwritten from exactly one parent.
    pub fn crossover_with(
        &mut self,
        strategy: CrossoverStrategy,
        parent_a: &WeightMap,
        parent_b: &WeightMap,
        topology: &Topology,
    ) -> Result<WeightMap, GenomeError> {
        parent_a.check_shape(topology)?;
        parent_b.check_shape(topology)?;

        let mut child = WeightMap::from_topology(topology);
        trace!("Crossover with {:?}", strategy);

        match strategy {
            CrossoverStrategy::LayerAlternation => {
                for l in 0..child.layer_count() {
                    let source = if self.rng.gen_bool(0.5) {
                        parent_a
                    } else {
                        parent_b
                    };
                    child.set_layer(l, source.layer(l)?.to_vec())?;
                }
            }
            CrossoverStrategy::HalfSplit => {
                for l in 0..child.layer_count() {
                    let neurons = child.neurons_in(l)?;
                    let split = neurons / 2;
                    for n in 0..neurons {
                        let source = if n < split { parent_a } else { parent_b };
                        child.set_neuron(l, n, source.neuron(l, n)?.clone())?;
                    }
                }
            }
            CrossoverStrategy::NeuronAlternation => {
                let mut from_a = true;
                for l in 0..child.layer_count() {
                    for n in 0..child.neurons_in(l)? {
                        let source = if from_a { parent_a } else { parent_b };
                        child.set_neuron(l, n, source.neuron(l, n)?.clone())?;
                        from_a = !from_a;
                    }
                }
            }
        }

        Ok(child)
    }

    /// Mutate a genome in place with a randomly chosen style.
    pub fn mutate(
        &mut self,
        genome: &mut WeightMap,
        config: &MutationConfig,
    ) -> Result<MutationReport, GenomeError> {
        let style = self.choose_style();
        self.mutate_with(style, genome, config)
    }

    /// Mutate a genome in place with a given style.
    pub fn mutate_with(
        &mut self,
        style: MutationStyle,
        genome: &mut WeightMap,
        config: &MutationConfig,
    ) -> Result<MutationReport, GenomeError> {
        if genome.neuron_count() == 0 {
            return Err(GenomeError::ShapeMismatch(
                "cannot mutate a genome without neurons".to_string(),
            ));
        }

        let scaled = style.rate(config) * genome.neuron_count() as f32;
        let operations = (scaled * self.rng.r#gen::<f32>()).floor() as usize;
        let operations = operations.min(style.max_operations(config, genome));

        match style {
            MutationStyle::PointMutation => {
                for _ in 0..operations {
                    let (layer, neuron) = self.random_neuron(genome)?;
                    let factor = self.multiplier(config);
                    let genes = genome.neuron_mut(layer, neuron)?;
                    // Index `weights.len()` addresses the bias.
                    let gene = self.rng.gen_range(0..=genes.weights.len());
                    match genes.weights.get_mut(gene) {
                        Some(w) => *w *= factor,
                        None => genes.bias *= factor,
                    }
                }
            }
            MutationStyle::LayerSwap => {
                for _ in 0..operations {
                    let src = self.rng.gen_range(0..genome.layer_count());
                    let dst = self.rng.gen_range(0..genome.layer_count());
                    swap_layers(genome, src, dst)?;
                }
            }
            MutationStyle::IntraLayerSwap => {
                let layer = self.rng.gen_range(0..genome.layer_count());
                let neurons = genome.neurons_in(layer)?;
                if neurons == 0 {
                    return Err(GenomeError::ShapeMismatch(format!(
                        "layer {layer} has no neurons"
                    )));
                }
                for _ in 0..operations {
                    let src = self.rng.gen_range(0..neurons);
                    let dst = self.rng.gen_range(0..neurons);
                    swap_neurons(genome, (layer, src), (layer, dst))?;
                }
            }
            MutationStyle::GlobalSwap => {
                for _ in 0..operations {
                    let src = self.random_neuron(genome)?;
                    let dst = self.random_neuron(genome)?;
                    swap_neurons(genome, src, dst)?;
                }
            }
        }

        trace!("Mutation {:?}: {} operations", style, operations);
        Ok(MutationReport { style, operations })
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }

    /// Uniform multiplier in the configured bounds.
    fn multiplier(&mut self, config: &MutationConfig) -> f32 {
        let (lo, hi) = config.multiplier_bounds;
        self.rng.gen_range(lo..hi)
    }

    fn random_neuron(&mut self, genome: &WeightMap) -> Result<(usize, usize), GenomeError> {
        let layer = self.rng.gen_range(0..genome.layer_count());
        let neurons = genome.neurons_in(layer)?;
        if neurons == 0 {
            return Err(GenomeError::ShapeMismatch(format!(
                "layer {layer} has no neurons"
            )));
        }
        Ok((layer, self.rng.gen_range(0..neurons)))
    }
}

/// Swap the overlapping contents of two layers.
///
/// Layers of identical shape are swapped completely. When shapes differ only
/// the common block (neurons and weights present in both) is exchanged, so
/// neither layer changes shape.
fn swap_layers(genome: &mut WeightMap, src: usize, dst: usize) -> Result<(), GenomeError> {
    if src == dst {
        return Ok(());
    }
    let shared = genome.neurons_in(src)?.min(genome.neurons_in(dst)?);
    for n in 0..shared {
        swap_neurons(genome, (src, n), (dst, n))?;
    }
    Ok(())
}

/// Swap two neurons' genes, limited to the weights both neurons carry.
fn swap_neurons(
    genome: &mut WeightMap,
    src: (usize, usize),
    dst: (usize, usize),
) -> Result<(), GenomeError> {
    if src == dst {
        return Ok(());
    }
    let a = genome.neuron(src.0, src.1)?.clone();
    let b = genome.neuron(dst.0, dst.1)?.clone();
    genome.set_neuron(src.0, src.1, blend_into(&a, &b))?;
    genome.set_neuron(dst.0, dst.1, blend_into(&b, &a))?;
    Ok(())
}

/// `target` with its overlapping weights and bias taken from `donor`.
fn blend_into(target: &NeuronGenes, donor: &NeuronGenes) -> NeuronGenes {
    let mut genes = target.clone();
    let shared = genes.weights.len().min(donor.weights.len());
    genes.weights[..shared].copy_from_slice(&donor.weights[..shared]);
    genes.bias = donor.bias;
    genes
}
