//! Configuration types for the genetic evolution engine.

use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of genomes in every generation.
    #[serde(default = "default_generation_size")]
    pub generation_size: usize,
    /// Number of fittest genomes kept when a generation is retired.
    #[serde(default = "default_buffered_generation_size")]
    pub buffered_generation_size: usize,
    /// Maximum number of retired generations held in the history buffer.
    #[serde(default = "default_buffer_count")]
    pub buffer_count: usize,
    /// Mutation intensity settings.
    #[serde(default)]
    pub mutation: MutationConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            generation_size: default_generation_size(),
            buffered_generation_size: default_buffered_generation_size(),
            buffer_count: default_buffer_count(),
            mutation: MutationConfig::default(),
            random_seed: None,
        }
    }
}

fn default_generation_size() -> usize {
    20
}
fn default_buffered_generation_size() -> usize {
    5
}
fn default_buffer_count() -> usize {
    3
}

/// Mutation intensity constants.
///
/// Each style performs `floor(rate * neuron_count * u)` elementary operations,
/// with `u` drawn uniformly from `[0, 1)`, so larger networks receive
/// proportionally more perturbation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Rate for single-gene multiplicative mutations.
    #[serde(default = "default_point_rate")]
    pub point_rate: f32,
    /// Rate for whole-layer swaps.
    #[serde(default = "default_layer_swap_rate")]
    pub layer_swap_rate: f32,
    /// Rate for neuron swaps inside one layer.
    #[serde(default = "default_intra_layer_swap_rate")]
    pub intra_layer_swap_rate: f32,
    /// Rate for neuron swaps across the whole genome.
    #[serde(default = "default_global_swap_rate")]
    pub global_swap_rate: f32,
    /// Range of the multiplier applied by point mutations (and genesis).
    #[serde(default = "default_multiplier_bounds")]
    pub multiplier_bounds: (f32, f32),
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            point_rate: default_point_rate(),
            layer_swap_rate: default_layer_swap_rate(),
            intra_layer_swap_rate: default_intra_layer_swap_rate(),
            global_swap_rate: default_global_swap_rate(),
            multiplier_bounds: default_multiplier_bounds(),
        }
    }
}

fn default_point_rate() -> f32 {
    0.85
}
fn default_layer_swap_rate() -> f32 {
    0.25
}
fn default_intra_layer_swap_rate() -> f32 {
    0.5
}
fn default_global_swap_rate() -> f32 {
    0.75
}
fn default_multiplier_bounds() -> (f32, f32) {
    (-2.0, 2.0)
}

/// Largest accepted mutation rate.
pub const MAX_MUTATION_RATE: f32 = 100.0;

impl EngineConfig {
    /// Validate engine configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation_size == 0 {
            return Err(ConfigError::InvalidGenerationSize);
        }
        if self.buffered_generation_size > self.generation_size {
            return Err(ConfigError::BufferedSizeTooLarge {
                buffered: self.buffered_generation_size,
                generation: self.generation_size,
            });
        }
        self.mutation.validate()
    }
}

impl MutationConfig {
    /// Validate mutation constants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rates = [
            ("point_rate", self.point_rate),
            ("layer_swap_rate", self.layer_swap_rate),
            ("intra_layer_swap_rate", self.intra_layer_swap_rate),
            ("global_swap_rate", self.global_swap_rate),
        ];
        for (name, rate) in rates {
            if !(0.0..=MAX_MUTATION_RATE).contains(&rate) {
                return Err(ConfigError::InvalidMutationRate(format!(
                    "{name} = {rate} must be within [0, {MAX_MUTATION_RATE}]"
                )));
            }
        }

        let (lo, hi) = self.multiplier_bounds;
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(ConfigError::InvalidMultiplierBounds(lo, hi));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Generation size must be non-zero")]
    InvalidGenerationSize,
    #[error("Buffered generation size {buffered} exceeds generation size {generation}")]
    BufferedSizeTooLarge { buffered: usize, generation: usize },
    #[error("Template topology has no layers")]
    EmptyTopology,
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),
    #[error("Invalid mutation rate: {0}")]
    InvalidMutationRate(String),
    #[error("Multiplier bounds ({0}, {1}) must be finite with min < max")]
    InvalidMultiplierBounds(f32, f32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_generation_size() {
        let config = EngineConfig {
            generation_size: 0,
            buffered_generation_size: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidGenerationSize));
    }

    #[test]
    fn test_buffered_size_bound() {
        let config = EngineConfig {
            generation_size: 4,
            buffered_generation_size: 5,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::BufferedSizeTooLarge {
                buffered: 5,
                generation: 4
            })
        );

        let config = EngineConfig {
            generation_size: 4,
            buffered_generation_size: 4,
            buffer_count: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_rate_rejected() {
        let config = EngineConfig {
            mutation: MutationConfig {
                layer_swap_rate: -0.1,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMutationRate(_))
        ));
    }

    #[test]
    fn test_oversized_rate_rejected() {
        let mutation = |rate| MutationConfig {
            global_swap_rate: rate,
            ..Default::default()
        };
        assert!(mutation(MAX_MUTATION_RATE).validate().is_ok());
        assert!(matches!(
            mutation(1e30).validate(),
            Err(ConfigError::InvalidMutationRate(_))
        ));
        assert!(mutation(f32::INFINITY).validate().is_err());
        assert!(mutation(f32::NAN).validate().is_err());
    }

    #[test]
    fn test_inverted_multiplier_bounds() {
        let config = EngineConfig {
            mutation: MutationConfig {
                multiplier_bounds: (2.0, -2.0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMultiplierBounds(_, _))
        ));
    }

    #[test]
    fn test_serialization_defaults() {
        let parsed: EngineConfig = serde_json::from_str(r#"{"generation_size": 8}"#).unwrap();
        assert_eq!(parsed.generation_size, 8);
        assert_eq!(parsed.buffered_generation_size, 5);
        assert_eq!(parsed.mutation.point_rate, 0.85);
        assert!(parsed.random_seed.is_none());

        let json = serde_json::to_string(&parsed).unwrap();
        let again: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(again.generation_size, parsed.generation_size);
    }

    #[test]
    fn test_negative_buffer_count_is_a_parse_error() {
        let parsed: Result<EngineConfig, _> = serde_json::from_str(r#"{"buffer_count": -1}"#);
        assert!(parsed.is_err());
    }
}
