//! Property-based tests for ranking, reporting and genome operations.

use std::sync::Arc;

use neuronet_ga::compute::evolution::{
    CrossoverStrategy, Generation, GenomeRng, MutationStyle, ReportOutcome, rank_generation,
};
use neuronet_ga::schema::{MutationConfig, Topology, WeightMap};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Layer sizes for small random topologies.
fn layers_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..6, 1..5)
}

fn handles(generation: &Generation) -> Vec<Arc<WeightMap>> {
    generation
        .slots()
        .iter()
        .map(|slot| Arc::clone(slot.genome()))
        .collect()
}

fn sorted_genes(genome: &WeightMap) -> Vec<f32> {
    let mut values: Vec<f32> = genome
        .layers()
        .iter()
        .flatten()
        .flat_map(|n| n.weights.iter().copied().chain([n.bias]))
        .collect();
    values.sort_by(f32::total_cmp);
    values
}

proptest! {
    #[test]
    fn test_ranking_is_ordered_permutation(
        scores in prop::collection::vec(prop::option::of(-1000i32..1000), 1..12)
    ) {
        let template = WeightMap::from_topology(&Topology::feed_forward(&[1, 1]).unwrap());
        let mut generation = Generation::new(vec![template; scores.len()]);
        for (handle, score) in handles(&generation).iter().zip(&scores) {
            if let Some(score) = score {
                generation.record_fitness(f64::from(*score), handle);
            }
        }

        let ranking = rank_generation(&mut generation);

        let mut sorted = ranking.clone();
        sorted.sort_unstable();
        prop_assert_eq!(sorted, (0..scores.len()).collect::<Vec<_>>());

        let ranked: Vec<Option<i32>> = ranking.iter().map(|&i| scores[i]).collect();
        let reported = ranked.iter().take_while(|s| s.is_some()).count();
        prop_assert!(ranked[reported..].iter().all(Option::is_none));
        prop_assert!(ranked[..reported].windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_report_aggregation_is_order_independent(
        scores in prop::collection::vec(-1000i32..1000, 0..30),
        seed in any::<u64>()
    ) {
        let template = WeightMap::from_topology(&Topology::feed_forward(&[2, 1]).unwrap());
        let mut forward = Generation::new(vec![template.clone()]);
        let mut shuffled = Generation::new(vec![template]);

        let mut reordered = scores.clone();
        reordered.shuffle(&mut StdRng::seed_from_u64(seed));

        let a = handles(&forward)[0].clone();
        let b = handles(&shuffled)[0].clone();
        for score in &scores {
            prop_assert_eq!(forward.record_fitness(f64::from(*score), &a), ReportOutcome::Recorded);
        }
        for score in &reordered {
            shuffled.record_fitness(f64::from(*score), &b);
        }

        let (x, y) = (forward.slot(0).unwrap(), shuffled.slot(0).unwrap());
        prop_assert_eq!(x.fitness_sum(), y.fitness_sum());
        prop_assert_eq!(x.reports(), scores.len() as u32);
        prop_assert_eq!(x.average_fitness(), y.average_fitness());
    }

    #[test]
    fn test_mutation_preserves_shape(
        layers in layers_strategy(),
        seed in any::<u64>(),
        style in 0usize..4
    ) {
        let topology = Topology::feed_forward(&layers).unwrap();
        let config = MutationConfig::default();
        let mut rng = GenomeRng::new(seed);
        let mut genome = rng.random_variation(&WeightMap::from_topology(&topology), &config);
        let before = genome.clone();

        let style = MutationStyle::ALL[style];
        let report = rng.mutate_with(style, &mut genome, &config).unwrap();

        prop_assert!(genome.conforms_to(&topology));
        prop_assert!(report.operations <= style.max_operations(&config, &genome));
        if style != MutationStyle::PointMutation {
            // Swaps only move values around.
            prop_assert_eq!(sorted_genes(&genome), sorted_genes(&before));
        }
    }

    #[test]
    fn test_crossover_preserves_shape(
        layers in layers_strategy(),
        seed in any::<u64>(),
        strategy in 0usize..3
    ) {
        let topology = Topology::feed_forward(&layers).unwrap();
        let config = MutationConfig::default();
        let mut rng = GenomeRng::new(seed);
        let template = WeightMap::from_topology(&topology);
        let a = rng.random_variation(&template, &config);
        let b = rng.random_variation(&template, &config);

        let strategy = CrossoverStrategy::ALL[strategy];
        let child = rng.crossover_with(strategy, &a, &b, &topology).unwrap();

        prop_assert!(child.conforms_to(&topology));
        for (l, layer) in child.layers().iter().enumerate() {
            for (n, genes) in layer.iter().enumerate() {
                prop_assert!(
                    genes == a.neuron(l, n).unwrap() || genes == b.neuron(l, n).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_identical_parents_give_identical_child(
        layers in layers_strategy(),
        seed in any::<u64>()
    ) {
        let topology = Topology::feed_forward(&layers).unwrap();
        let mut rng = GenomeRng::new(seed);
        let template = WeightMap::from_topology(&topology);
        let parent = rng.random_variation(&template, &MutationConfig::default());

        let (child, _) = rng.crossover(&parent, &parent.clone(), &topology).unwrap();
        prop_assert_eq!(child, parent);
    }
}
