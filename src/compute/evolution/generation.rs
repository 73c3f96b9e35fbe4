//! A generation: genomes paired with their fitness accumulators.

use std::sync::Arc;

use crate::schema::WeightMap;

/// Selection state of a generation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    /// Still competing; accepts fitness reports.
    #[default]
    Unselected,
    /// Already placed in a ranking; closed to further reports.
    Selected,
}

/// Result of a fitness report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The score was added to the genome's accumulator.
    Recorded,
    /// The genome has already been ranked; the score was dropped.
    Retired,
    /// The genome is not part of the current generation.
    Unmatched,
    /// The score was NaN or infinite and was dropped.
    NonFinite,
}

/// One genome and its fitness bookkeeping.
#[derive(Debug, Clone)]
pub struct GenomeSlot {
    genome: Arc<WeightMap>,
    fitness_sum: f64,
    reports: u32,
    state: SlotState,
}

impl GenomeSlot {
    fn new(genome: WeightMap) -> Self {
        Self {
            genome: Arc::new(genome),
            fitness_sum: 0.0,
            reports: 0,
            state: SlotState::Unselected,
        }
    }

    /// Shared handle to the genome.
    pub fn genome(&self) -> &Arc<WeightMap> {
        &self.genome
    }

    /// Sum of all reported scores.
    pub fn fitness_sum(&self) -> f64 {
        self.fitness_sum
    }

    /// Number of accepted reports.
    pub fn reports(&self) -> u32 {
        self.reports
    }

    /// Selection state.
    pub fn state(&self) -> SlotState {
        self.state
    }

    /// Average fitness; `None` when nothing was reported.
    pub fn average_fitness(&self) -> Option<f64> {
        (self.reports > 0).then(|| self.fitness_sum / f64::from(self.reports))
    }

    pub(crate) fn mark_selected(&mut self) {
        self.state = SlotState::Selected;
    }
}

/// Fixed-size cohort of genomes under evaluation.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    slots: Vec<GenomeSlot>,
}

impl Generation {
    /// Wrap freshly built genomes; all accumulators start at zero.
    pub fn new(genomes: Vec<WeightMap>) -> Self {
        Self {
            slots: genomes.into_iter().map(GenomeSlot::new).collect(),
        }
    }

    /// Number of genomes.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the generation is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All slots.
    pub fn slots(&self) -> &[GenomeSlot] {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [GenomeSlot] {
        &mut self.slots
    }

    /// Return every slot to [`SlotState::Unselected`], keeping accumulators.
    pub(crate) fn reopen(&mut self) {
        for slot in &mut self.slots {
            slot.state = SlotState::Unselected;
        }
    }

    /// Get a slot by index.
    pub fn slot(&self, index: usize) -> Option<&GenomeSlot> {
        self.slots.get(index)
    }

    /// Get a genome handle by index.
    pub fn genome(&self, index: usize) -> Option<&Arc<WeightMap>> {
        self.slots.get(index).map(GenomeSlot::genome)
    }

    /// Index of the slot holding exactly this genome handle.
    pub fn position_of(&self, genome: &Arc<WeightMap>) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| Arc::ptr_eq(&slot.genome, genome))
    }

    /// Add a score to the slot holding `genome`.
    ///
    /// Matching is by handle identity, never by value: two genomes with equal
    /// weights are still different candidates.
    pub fn record_fitness(&mut self, score: f64, genome: &Arc<WeightMap>) -> ReportOutcome {
        if !score.is_finite() {
            return ReportOutcome::NonFinite;
        }
        let Some(index) = self.position_of(genome) else {
            return ReportOutcome::Unmatched;
        };
        let slot = &mut self.slots[index];
        if slot.state == SlotState::Selected {
            return ReportOutcome::Retired;
        }
        slot.fitness_sum += score;
        slot.reports += 1;
        ReportOutcome::Recorded
    }
}
