//! Bounded history of retired generations.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::schema::WeightMap;

/// The fittest genomes of a generation that has been replaced.
#[derive(Debug, Clone)]
pub struct RetiredGeneration {
    /// Generation number this cohort belonged to.
    pub generation: u64,
    /// Genomes ordered fittest first.
    pub genomes: Vec<Arc<WeightMap>>,
    /// Average fitness per genome, aligned with `genomes`.
    pub average_fitness: Vec<Option<f64>>,
}

impl RetiredGeneration {
    /// Number of kept genomes.
    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    /// Check if nothing was kept.
    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    /// Fittest genome with its average fitness.
    pub fn best(&self) -> Option<(&Arc<WeightMap>, Option<f64>)> {
        self.genomes
            .first()
            .map(|g| (g, self.average_fitness.first().copied().flatten()))
    }
}

/// FIFO of retired generations holding at most `capacity` entries.
#[derive(Debug, Default)]
pub struct GenerationBuffer {
    entries: VecDeque<RetiredGeneration>,
    capacity: usize,
}

impl GenerationBuffer {
    /// Create an empty buffer.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a retired generation, evicting the oldest when full.
    ///
    /// Returns the evicted entry. With zero capacity the pushed entry itself
    /// is returned.
    pub fn push(&mut self, entry: RetiredGeneration) -> Option<RetiredGeneration> {
        if self.capacity == 0 {
            return Some(entry);
        }
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get buffer size.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &RetiredGeneration> {
        self.entries.iter()
    }

    /// Most recently retired generation.
    pub fn latest(&self) -> Option<&RetiredGeneration> {
        self.entries.back()
    }

    /// Oldest retained generation.
    pub fn oldest(&self) -> Option<&RetiredGeneration> {
        self.entries.front()
    }

    /// Fittest genome across all retained generations.
    pub fn best_genome(&self) -> Option<(&Arc<WeightMap>, f64)> {
        self.entries
            .iter()
            .flat_map(|e| e.genomes.iter().zip(&e.average_fitness))
            .filter_map(|(g, f)| f.map(|f| (g, f)))
            .fold(None, |best, (g, f)| match best {
                Some((_, bf)) if bf >= f => best,
                _ => Some((g, f)),
            })
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Topology;

    fn retired(generation: u64, fitness: &[Option<f64>]) -> RetiredGeneration {
        let template = WeightMap::from_topology(&Topology::feed_forward(&[1, 1]).unwrap());
        RetiredGeneration {
            generation,
            genomes: fitness.iter().map(|_| Arc::new(template.clone())).collect(),
            average_fitness: fitness.to_vec(),
        }
    }

    #[test]
    fn test_buffer_push() {
        let mut buffer = GenerationBuffer::new(3);
        assert!(buffer.push(retired(0, &[Some(1.0)])).is_none());
        assert!(buffer.push(retired(1, &[Some(2.0)])).is_none());
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.latest().unwrap().generation, 1);
        assert_eq!(buffer.oldest().unwrap().generation, 0);
    }

    #[test]
    fn test_buffer_capacity() {
        let mut buffer = GenerationBuffer::new(2);
        assert_eq!(buffer.capacity(), 2);
        buffer.push(retired(0, &[]));
        buffer.push(retired(1, &[]));

        // Adding a third evicts the oldest
        let evicted = buffer.push(retired(2, &[])).unwrap();
        assert_eq!(evicted.generation, 0);
        assert_eq!(buffer.len(), buffer.capacity());
        let kept: Vec<u64> = buffer.iter().map(|e| e.generation).collect();
        assert_eq!(kept, vec![1, 2]);
    }

    #[test]
    fn test_zero_capacity() {
        let mut buffer = GenerationBuffer::new(0);
        let bounced = buffer.push(retired(4, &[Some(1.0)])).unwrap();
        assert_eq!(bounced.generation, 4);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_best_genome() {
        let mut buffer = GenerationBuffer::new(3);
        buffer.push(retired(0, &[Some(3.0), None]));
        buffer.push(retired(1, &[Some(7.0), Some(2.0)]));
        buffer.push(retired(2, &[None]));

        let (genome, fitness) = buffer.best_genome().unwrap();
        assert_eq!(fitness, 7.0);
        assert!(Arc::ptr_eq(genome, &buffer.iter().nth(1).unwrap().genomes[0]));

        buffer.clear();
        assert!(buffer.best_genome().is_none());
    }

    #[test]
    fn test_retired_best() {
        let entry = retired(0, &[Some(9.0), Some(1.0)]);
        assert_eq!(entry.best().unwrap().1, Some(9.0));
        assert!(retired(0, &[]).best().is_none());
    }
}
