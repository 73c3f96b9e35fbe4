//! Fitness ranking of a generation.

use super::generation::{Generation, SlotState};

/// Rank every unselected slot from fittest to least fit.
///
/// Repeatedly scans for the unselected slot with the greatest average
/// fitness and marks it [`SlotState::Selected`]. The first slot in scan order
/// wins ties. Slots without reports never beat a reported slot, so they end
/// up after all of them in scan order. Returns slot indices.
pub fn rank_generation(generation: &mut Generation) -> Vec<usize> {
    let averages: Vec<Option<f64>> = generation
        .slots()
        .iter()
        .map(|slot| slot.average_fitness())
        .collect();

    let mut ranking = Vec::with_capacity(generation.len());
    for _ in 0..generation.len() {
        let mut best: Option<usize> = None;
        for (j, slot) in generation.slots().iter().enumerate() {
            if slot.state() == SlotState::Selected {
                continue;
            }
            best = match best {
                Some(b) if !outranks(averages[j], averages[b]) => Some(b),
                _ => Some(j),
            };
        }

        let Some(best) = best else {
            break;
        };
        generation.slots_mut()[best].mark_selected();
        ranking.push(best);
    }

    ranking
}

/// Whether `candidate` strictly beats `incumbent`.
fn outranks(candidate: Option<f64>, incumbent: Option<f64>) -> bool {
    match (candidate, incumbent) {
        (Some(c), Some(i)) => c > i,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::schema::{Topology, WeightMap};

    fn scored(scores: &[Option<f64>]) -> Generation {
        let template = WeightMap::from_topology(&Topology::feed_forward(&[1, 1]).unwrap());
        let mut generation = Generation::new(vec![template; scores.len()]);
        let handles: Vec<Arc<WeightMap>> = generation
            .slots()
            .iter()
            .map(|s| s.genome().clone())
            .collect();
        for (handle, score) in handles.iter().zip(scores) {
            if let Some(score) = score {
                generation.record_fitness(*score, handle);
            }
        }
        generation
    }

    #[test]
    fn test_rank_descending() {
        let mut generation = scored(&[Some(10.0), Some(20.0), Some(5.0), Some(30.0)]);
        assert_eq!(rank_generation(&mut generation), vec![3, 1, 0, 2]);
        assert!(
            generation
                .slots()
                .iter()
                .all(|s| s.state() == SlotState::Selected)
        );
    }

    #[test]
    fn test_ties_keep_scan_order() {
        let mut generation = scored(&[Some(1.0), Some(2.0), Some(2.0), Some(1.0)]);
        assert_eq!(rank_generation(&mut generation), vec![1, 2, 0, 3]);
    }

    #[test]
    fn test_unreported_rank_last() {
        let mut generation = scored(&[None, Some(-50.0), None, Some(-100.0)]);
        assert_eq!(rank_generation(&mut generation), vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_nothing_reported() {
        let mut generation = scored(&[None, None, None]);
        assert_eq!(rank_generation(&mut generation), vec![0, 1, 2]);
    }

    #[test]
    fn test_averages_not_sums() {
        let template = WeightMap::from_topology(&Topology::feed_forward(&[1, 1]).unwrap());
        let mut generation = Generation::new(vec![template; 2]);
        let a = generation.genome(0).unwrap().clone();
        let b = generation.genome(1).unwrap().clone();
        // Sum 9 over 3 reports vs a single 5.
        for _ in 0..3 {
            generation.record_fitness(3.0, &a);
        }
        generation.record_fitness(5.0, &b);
        assert_eq!(rank_generation(&mut generation), vec![1, 0]);
    }

    #[test]
    fn test_second_pass_is_empty() {
        let mut generation = scored(&[Some(1.0), Some(2.0)]);
        rank_generation(&mut generation);
        assert!(rank_generation(&mut generation).is_empty());
    }
}
