//! Layer topology shared by genomes and networks.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Anything that can describe a layered network shape.
///
/// The engine reads this once at construction and never queries it again.
pub trait TopologySource {
    /// Number of layers, input layer included.
    fn layer_count(&self) -> usize;

    /// Number of neurons in `layer`.
    fn neurons_in_layer(&self, layer: usize) -> usize;

    /// Number of input weights carried by every neuron of `layer`.
    ///
    /// Input-layer neurons take a single raw input each.
    fn inputs_per_neuron(&self, layer: usize) -> usize {
        if layer == 0 {
            1
        } else {
            self.neurons_in_layer(layer - 1)
        }
    }
}

/// Shape of one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerShape {
    /// Neuron count.
    pub neurons: usize,
    /// Weights per neuron.
    pub inputs: usize,
}

/// Immutable snapshot of a network shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    layers: Vec<LayerShape>,
}

impl Topology {
    /// Classic feed-forward shape: `sizes[0]` inputs, then hidden layers, then outputs.
    ///
    /// `Topology::feed_forward(&[2, 3, 1])` describes 2 input neurons with one
    /// weight each, 3 hidden neurons with 2 weights each and 1 output neuron
    /// with 3 weights.
    pub fn feed_forward(sizes: &[usize]) -> Result<Self, ConfigError> {
        let layers = sizes
            .iter()
            .enumerate()
            .map(|(i, &neurons)| LayerShape {
                neurons,
                inputs: if i == 0 { 1 } else { sizes[i - 1] },
            })
            .collect();
        Self::from_layers(layers)
    }

    /// Build from explicit layer shapes.
    pub fn from_layers(layers: Vec<LayerShape>) -> Result<Self, ConfigError> {
        let topology = Self { layers };
        topology.validate()?;
        Ok(topology)
    }

    /// Snapshot the shape of any topology provider.
    pub fn of<T: TopologySource + ?Sized>(source: &T) -> Result<Self, ConfigError> {
        let layers = (0..source.layer_count())
            .map(|layer| LayerShape {
                neurons: source.neurons_in_layer(layer),
                inputs: source.inputs_per_neuron(layer),
            })
            .collect();
        Self::from_layers(layers)
    }

    /// Check that the shape can hold at least one gene per neuron.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.layers.is_empty() {
            return Err(ConfigError::EmptyTopology);
        }
        for (i, shape) in self.layers.iter().enumerate() {
            if shape.neurons == 0 {
                return Err(ConfigError::InvalidTopology(format!(
                    "layer {i} has no neurons"
                )));
            }
            if shape.inputs == 0 {
                return Err(ConfigError::InvalidTopology(format!(
                    "layer {i} neurons have no inputs"
                )));
            }
        }
        Ok(())
    }

    /// Per-layer shapes.
    pub fn layers(&self) -> &[LayerShape] {
        &self.layers
    }

    /// Total number of neurons.
    pub fn neuron_count(&self) -> usize {
        self.layers.iter().map(|l| l.neurons).sum()
    }

    /// Total number of weights (biases excluded).
    pub fn weight_count(&self) -> usize {
        self.layers.iter().map(|l| l.neurons * l.inputs).sum()
    }
}

impl TopologySource for Topology {
    fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn neurons_in_layer(&self, layer: usize) -> usize {
        self.layers.get(layer).map_or(0, |l| l.neurons)
    }

    fn inputs_per_neuron(&self, layer: usize) -> usize {
        self.layers.get(layer).map_or(0, |l| l.inputs)
    }
}
