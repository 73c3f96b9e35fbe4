//! Minimal feed-forward network used to evaluate evolved genomes.
//!
//! Each neuron computes `activation(sum(inputs * weights) + bias)`. Neurons
//! of the input layer take a single raw input each.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::schema::{ConfigError, GenomeError, NeuronGenes, Topology, TopologySource, WeightMap};

/// Neuron activation function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Logistic `1 / (1 + e^-x)`.
    #[default]
    Sigmoid,
    /// Hyperbolic tangent.
    Tanh,
    /// Rectified linear unit.
    Relu,
    /// Pass-through.
    Identity,
}

impl Activation {
    /// Evaluate the activation at `x`.
    #[inline]
    pub fn evaluate(self, x: f32) -> f32 {
        match self {
            Self::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Self::Tanh => x.tanh(),
            Self::Relu => x.max(0.0),
            Self::Identity => x,
        }
    }

    /// Derivative of the activation at `x`.
    pub fn derivative(self, x: f32) -> f32 {
        match self {
            Self::Sigmoid => {
                let s = self.evaluate(x);
                s * (1.0 - s)
            }
            Self::Tanh => 1.0 - x.tanh().powi(2),
            Self::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Identity => 1.0,
        }
    }
}

/// Layered feed-forward network.
#[derive(Debug, Clone)]
pub struct FeedForwardNet {
    activation: Activation,
    genes: WeightMap,
    inputs: Vec<f32>,
    outputs: Vec<f32>,
}

impl FeedForwardNet {
    /// Create a network with `layers[i]` neurons in layer `i`.
    ///
    /// The first entry is the input count and the last the output count, so
    /// at least two layers are required. All weights start at 1.0 and all
    /// biases at 0.0.
    pub fn new(activation: Activation, layers: &[usize]) -> Result<Self, ConfigError> {
        if layers.len() < 2 {
            return Err(ConfigError::InvalidTopology(format!(
                "a network needs at least 2 layers, got {}",
                layers.len()
            )));
        }
        let topology = Topology::feed_forward(layers)?;
        let outputs = layers.last().copied().unwrap_or_default();

        Ok(Self {
            activation,
            genes: WeightMap::from_topology(&topology),
            inputs: vec![0.0; layers[0]],
            outputs: vec![0.0; outputs],
        })
    }

    /// Activation used by every neuron.
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Set one input value.
    pub fn set_input(&mut self, index: usize, value: f32) -> Result<(), GenomeError> {
        let len = self.inputs.len();
        let slot = self
            .inputs
            .get_mut(index)
            .ok_or(GenomeError::NeuronIndex {
                layer: 0,
                index,
                len,
            })?;
        *slot = value;
        Ok(())
    }

    /// Set all input values.
    pub fn set_inputs(&mut self, values: &[f32]) -> Result<(), GenomeError> {
        if values.len() != self.inputs.len() {
            return Err(GenomeError::ShapeMismatch(format!(
                "expected {} inputs, got {}",
                self.inputs.len(),
                values.len()
            )));
        }
        self.inputs.copy_from_slice(values);
        Ok(())
    }

    /// Stored input values.
    pub fn inputs(&self) -> &[f32] {
        &self.inputs
    }

    /// Run a forward pass and return the outputs.
    pub fn update(&mut self) -> &[f32] {
        let mut signal: Vec<f32> = match self.genes.layers().first() {
            Some(input_layer) => input_layer
                .iter()
                .zip(&self.inputs)
                .map(|(neuron, &x)| self.fire(neuron, &[x]))
                .collect(),
            None => Vec::new(),
        };

        for layer in self.genes.layers().iter().skip(1) {
            let next: Vec<f32> = layer
                .iter()
                .map(|neuron| self.fire(neuron, &signal))
                .collect();
            signal = next;
        }

        self.outputs = signal;
        &self.outputs
    }

    /// Set inputs, run a forward pass and return a copy of the outputs.
    pub fn evaluate(&mut self, inputs: &[f32]) -> Result<Vec<f32>, GenomeError> {
        self.set_inputs(inputs)?;
        Ok(self.update().to_vec())
    }

    /// Outputs of the last forward pass.
    pub fn outputs(&self) -> &[f32] {
        &self.outputs
    }

    /// Overwrite every weight and bias from a genome of matching shape.
    pub fn apply_genome(&mut self, genome: &WeightMap) -> Result<(), GenomeError> {
        genome.check_shape(&self.genes)?;
        self.genes = genome.clone();
        Ok(())
    }

    /// Copy the current weights and biases out as a genome.
    pub fn extract_genome(&self) -> WeightMap {
        self.genes.clone()
    }

    /// Draw every weight and bias uniformly from `[0, 1)`.
    pub fn randomize_weights<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for genes in self.genes.genes_mut() {
            genes.weights.iter_mut().for_each(|w| *w = rng.r#gen());
            genes.bias = rng.r#gen();
        }
    }

    /// Set every weight and bias to zero.
    pub fn zero_weights(&mut self) {
        for genes in self.genes.genes_mut() {
            genes.weights.iter_mut().for_each(|w| *w = 0.0);
            genes.bias = 0.0;
        }
    }

    #[inline]
    fn fire(&self, neuron: &NeuronGenes, inputs: &[f32]) -> f32 {
        let sum: f32 = neuron
            .weights
            .iter()
            .zip(inputs)
            .map(|(w, x)| w * x)
            .sum();
        self.activation.evaluate(sum + neuron.bias)
    }
}

impl TopologySource for FeedForwardNet {
    fn layer_count(&self) -> usize {
        self.genes.layer_count()
    }

    fn neurons_in_layer(&self, layer: usize) -> usize {
        self.genes.neurons_in_layer(layer)
    }

    fn inputs_per_neuron(&self, layer: usize) -> usize {
        self.genes.inputs_per_neuron(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_requires_two_layers() {
        assert!(FeedForwardNet::new(Activation::Sigmoid, &[3]).is_err());
        assert!(FeedForwardNet::new(Activation::Sigmoid, &[2, 0, 1]).is_err());
    }

    #[test]
    fn test_topology_matches_layers() {
        let net = FeedForwardNet::new(Activation::Sigmoid, &[2, 3, 1]).unwrap();
        assert_eq!(
            Topology::of(&net).unwrap(),
            Topology::feed_forward(&[2, 3, 1]).unwrap()
        );
    }

    #[test]
    fn test_identity_forward_pass() {
        let mut net = FeedForwardNet::new(Activation::Identity, &[2, 2, 1]).unwrap();
        // All weights 1, biases 0: hidden = [x0 + x1; 2], output = 2 * (x0 + x1).
        let out = net.evaluate(&[1.5, 0.5]).unwrap();
        assert_eq!(out, vec![4.0]);
        assert_eq!(net.outputs(), &[4.0]);
    }

    #[test]
    fn test_bias_and_activation() {
        let mut net = FeedForwardNet::new(Activation::Relu, &[1, 1]).unwrap();
        let mut genome = net.extract_genome();
        genome
            .set_neuron(
                1,
                0,
                NeuronGenes {
                    weights: vec![2.0],
                    bias: -3.0,
                },
            )
            .unwrap();
        net.apply_genome(&genome).unwrap();

        assert_eq!(net.evaluate(&[1.0]).unwrap(), vec![0.0]);
        assert_eq!(net.evaluate(&[4.0]).unwrap(), vec![5.0]);
    }

    #[test]
    fn test_apply_genome_shape_check() {
        let mut net = FeedForwardNet::new(Activation::Sigmoid, &[2, 3, 1]).unwrap();
        let wrong = WeightMap::from_topology(&Topology::feed_forward(&[2, 2, 1]).unwrap());
        assert!(matches!(
            net.apply_genome(&wrong),
            Err(GenomeError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_extract_apply_roundtrip() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut source = FeedForwardNet::new(Activation::Tanh, &[3, 4, 2]).unwrap();
        source.randomize_weights(&mut rng);

        let mut target = FeedForwardNet::new(Activation::Tanh, &[3, 4, 2]).unwrap();
        target.apply_genome(&source.extract_genome()).unwrap();

        let inputs = [0.2, -0.7, 1.0];
        assert_eq!(
            source.evaluate(&inputs).unwrap(),
            target.evaluate(&inputs).unwrap()
        );

        target.zero_weights();
        assert!(
            target
                .extract_genome()
                .layers()
                .iter()
                .flatten()
                .all(|n| n.bias == 0.0 && n.weights.iter().all(|&w| w == 0.0))
        );
    }

    #[test]
    fn test_set_inputs_validation() {
        let mut net = FeedForwardNet::new(Activation::Sigmoid, &[2, 1]).unwrap();
        assert!(net.set_inputs(&[1.0]).is_err());
        assert!(net.set_input(2, 1.0).is_err());
        net.set_input(1, 0.5).unwrap();
        assert_eq!(net.inputs(), &[0.0, 0.5]);
    }

    #[test]
    fn test_activation_values() {
        assert!((Activation::Sigmoid.evaluate(0.0) - 0.5).abs() < 1e-6);
        assert!((Activation::Sigmoid.derivative(0.0) - 0.25).abs() < 1e-6);
        assert_eq!(Activation::Relu.evaluate(-1.0), 0.0);
        assert_eq!(Activation::Relu.derivative(2.0), 1.0);
        assert_eq!(Activation::Identity.derivative(7.0), 1.0);
        assert!((Activation::Tanh.derivative(0.0) - 1.0).abs() < 1e-6);
    }
}
