//! Genome representation: a jagged map of weights and biases.
//!
//! A [`WeightMap`] mirrors a layered network: one entry per layer, one
//! [`NeuronGenes`] per neuron. Its shape is fixed when it is created; every
//! setter refuses values that would change it.

use serde::{Deserialize, Serialize};

use super::TopologySource;

/// Weights and bias of a single neuron.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuronGenes {
    /// One weight per input.
    pub weights: Vec<f32>,
    /// Bias added to the weighted sum.
    pub bias: f32,
}

impl NeuronGenes {
    /// Neuron with `inputs` unit weights and zero bias.
    pub fn unit(inputs: usize) -> Self {
        Self {
            weights: vec![1.0; inputs],
            bias: 0.0,
        }
    }
}

/// Genome for one candidate network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightMap {
    layers: Vec<Vec<NeuronGenes>>,
}

/// Genome access and shape errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenomeError {
    #[error("Layer index {index} out of range ({len} layers)")]
    LayerIndex { index: usize, len: usize },
    #[error("Neuron index {index} out of range in layer {layer} ({len} neurons)")]
    NeuronIndex {
        layer: usize,
        index: usize,
        len: usize,
    },
    #[error("Weight index {index} out of range for neuron {neuron} in layer {layer} ({len} weights)")]
    WeightIndex {
        layer: usize,
        neuron: usize,
        index: usize,
        len: usize,
    },
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
}

impl WeightMap {
    /// Scaffold a genome with the default values of a freshly built network.
    pub fn from_topology<T: TopologySource + ?Sized>(topology: &T) -> Self {
        let layers = (0..topology.layer_count())
            .map(|layer| {
                let inputs = topology.inputs_per_neuron(layer);
                (0..topology.neurons_in_layer(layer))
                    .map(|_| NeuronGenes::unit(inputs))
                    .collect()
            })
            .collect();
        Self { layers }
    }

    /// Build directly from layer data.
    pub fn from_layers(layers: Vec<Vec<NeuronGenes>>) -> Self {
        Self { layers }
    }

    /// All layers.
    pub fn layers(&self) -> &[Vec<NeuronGenes>] {
        &self.layers
    }

    /// Number of layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Total number of neurons across all layers.
    pub fn neuron_count(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    /// Total number of weights, biases excluded.
    pub fn weight_count(&self) -> usize {
        self.layers
            .iter()
            .flatten()
            .map(|n| n.weights.len())
            .sum()
    }

    /// Get one layer.
    pub fn layer(&self, index: usize) -> Result<&[NeuronGenes], GenomeError> {
        self.layers
            .get(index)
            .map(Vec::as_slice)
            .ok_or(GenomeError::LayerIndex {
                index,
                len: self.layers.len(),
            })
    }

    /// Replace one layer. The new layer must have the same shape.
    pub fn set_layer(&mut self, index: usize, layer: Vec<NeuronGenes>) -> Result<(), GenomeError> {
        let current = self.layer(index)?;
        if current.len() != layer.len() {
            return Err(GenomeError::ShapeMismatch(format!(
                "layer {index} has {} neurons, replacement has {}",
                current.len(),
                layer.len()
            )));
        }
        for (i, (old, new)) in current.iter().zip(&layer).enumerate() {
            if old.weights.len() != new.weights.len() {
                return Err(GenomeError::ShapeMismatch(format!(
                    "neuron {i} of layer {index} has {} weights, replacement has {}",
                    old.weights.len(),
                    new.weights.len()
                )));
            }
        }
        self.layers[index] = layer;
        Ok(())
    }

    /// Neuron count of one layer.
    pub fn neurons_in(&self, layer: usize) -> Result<usize, GenomeError> {
        self.layer(layer).map(<[NeuronGenes]>::len)
    }

    /// Get one neuron.
    pub fn neuron(&self, layer: usize, index: usize) -> Result<&NeuronGenes, GenomeError> {
        let neurons = self.layer(layer)?;
        neurons.get(index).ok_or(GenomeError::NeuronIndex {
            layer,
            index,
            len: neurons.len(),
        })
    }

    pub(crate) fn neuron_mut(
        &mut self,
        layer: usize,
        index: usize,
    ) -> Result<&mut NeuronGenes, GenomeError> {
        let len = self.layers.len();
        let neurons = self
            .layers
            .get_mut(layer)
            .ok_or(GenomeError::LayerIndex { index: layer, len })?;
        let len = neurons.len();
        neurons
            .get_mut(index)
            .ok_or(GenomeError::NeuronIndex { layer, index, len })
    }

    pub(crate) fn genes_mut(&mut self) -> impl Iterator<Item = &mut NeuronGenes> {
        self.layers.iter_mut().flatten()
    }

    /// Replace one neuron's weights and bias.
    pub fn set_neuron(
        &mut self,
        layer: usize,
        index: usize,
        genes: NeuronGenes,
    ) -> Result<(), GenomeError> {
        let neuron = self.neuron_mut(layer, index)?;
        if neuron.weights.len() != genes.weights.len() {
            return Err(GenomeError::ShapeMismatch(format!(
                "neuron {index} of layer {layer} has {} weights, replacement has {}",
                neuron.weights.len(),
                genes.weights.len()
            )));
        }
        *neuron = genes;
        Ok(())
    }

    /// Weights of one neuron.
    pub fn neuron_weights(&self, layer: usize, index: usize) -> Result<&[f32], GenomeError> {
        self.neuron(layer, index).map(|n| n.weights.as_slice())
    }

    /// Overwrite the weights of one neuron. The length must not change.
    pub fn set_neuron_weights(
        &mut self,
        layer: usize,
        index: usize,
        weights: &[f32],
    ) -> Result<(), GenomeError> {
        let neuron = self.neuron_mut(layer, index)?;
        if neuron.weights.len() != weights.len() {
            return Err(GenomeError::ShapeMismatch(format!(
                "neuron {index} of layer {layer} has {} weights, got {}",
                neuron.weights.len(),
                weights.len()
            )));
        }
        neuron.weights.copy_from_slice(weights);
        Ok(())
    }

    /// Read one weight.
    pub fn weight(&self, layer: usize, neuron: usize, index: usize) -> Result<f32, GenomeError> {
        let weights = self.neuron_weights(layer, neuron)?;
        weights.get(index).copied().ok_or(GenomeError::WeightIndex {
            layer,
            neuron,
            index,
            len: weights.len(),
        })
    }

    /// Write one weight.
    pub fn set_weight(
        &mut self,
        layer: usize,
        neuron: usize,
        index: usize,
        value: f32,
    ) -> Result<(), GenomeError> {
        let genes = self.neuron_mut(layer, neuron)?;
        let len = genes.weights.len();
        let slot = genes.weights.get_mut(index).ok_or(GenomeError::WeightIndex {
            layer,
            neuron,
            index,
            len,
        })?;
        *slot = value;
        Ok(())
    }

    /// Whether this genome has exactly the shape of `topology`.
    pub fn conforms_to<T: TopologySource + ?Sized>(&self, topology: &T) -> bool {
        self.check_shape(topology).is_ok()
    }

    /// Like [`conforms_to`](Self::conforms_to), with a description of the first difference.
    pub fn check_shape<T: TopologySource + ?Sized>(&self, topology: &T) -> Result<(), GenomeError> {
        if self.layers.len() != topology.layer_count() {
            return Err(GenomeError::ShapeMismatch(format!(
                "expected {} layers, found {}",
                topology.layer_count(),
                self.layers.len()
            )));
        }
        for (l, neurons) in self.layers.iter().enumerate() {
            let expected = topology.neurons_in_layer(l);
            if neurons.len() != expected {
                return Err(GenomeError::ShapeMismatch(format!(
                    "layer {l}: expected {expected} neurons, found {}",
                    neurons.len()
                )));
            }
            let inputs = topology.inputs_per_neuron(l);
            if let Some(n) = neurons.iter().position(|n| n.weights.len() != inputs) {
                return Err(GenomeError::ShapeMismatch(format!(
                    "layer {l} neuron {n}: expected {inputs} weights, found {}",
                    neurons[n].weights.len()
                )));
            }
        }
        Ok(())
    }
}

impl TopologySource for WeightMap {
    fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn neurons_in_layer(&self, layer: usize) -> usize {
        self.layers.get(layer).map_or(0, Vec::len)
    }

    fn inputs_per_neuron(&self, layer: usize) -> usize {
        self.layers
            .get(layer)
            .and_then(|l| l.first())
            .map_or(0, |n| n.weights.len())
    }
}
