use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::{Layer, Network, NetworkType, Neuron};
use crate::a_funcs::Activation;
use crate::error::{Error, Result};
use crate::initializer;

/// Builder for the three supported topologies.
///
/// Layer sizes count real neurons only; bias neurons are added to every
/// non-output layer automatically.
#[derive(Clone, Debug)]
pub struct NetworkBuilder {
    kind: NetworkType,
    connection_rate: f32,
    layers: Vec<usize>,
    seed: u64,
    hidden_activation: Activation,
    output_activation: Activation,
    hidden_steepness: f32,
    output_steepness: f32,
    weight_range: (f32, f32),
}

impl NetworkBuilder {
    fn new(kind: NetworkType, connection_rate: f32, layers: &[usize]) -> Self {
        Self {
            kind,
            connection_rate,
            layers: layers.to_vec(),
            seed: 0,
            hidden_activation: Activation::SigmoidStepwise,
            output_activation: Activation::SigmoidStepwise,
            hidden_steepness: 0.5,
            output_steepness: 0.5,
            weight_range: (-0.1, 0.1),
        }
    }

    /// Every neuron connects to every neuron of the next layer.
    pub fn standard(layers: &[usize]) -> Self {
        Self::new(NetworkType::Layer, 1., layers)
    }

    /// Like [`standard`](Self::standard) but every connection only exists with
    /// probability `connection_rate`.
    pub fn sparse(connection_rate: f32, layers: &[usize]) -> Self {
        Self::new(NetworkType::Layer, connection_rate, layers)
    }

    /// Every layer connects to all later layers.
    pub fn shortcut(layers: &[usize]) -> Self {
        Self::new(NetworkType::Shortcut, 1., layers)
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn hidden_activation(mut self, activation: Activation) -> Self {
        self.hidden_activation = activation;
        self
    }

    pub fn output_activation(mut self, activation: Activation) -> Self {
        self.output_activation = activation;
        self
    }

    pub fn hidden_steepness(mut self, steepness: f32) -> Self {
        self.hidden_steepness = steepness;
        self
    }

    pub fn output_steepness(mut self, steepness: f32) -> Self {
        self.output_steepness = steepness;
        self
    }

    /// Range the initial weights are drawn from.
    pub fn weight_range(mut self, min: f32, max: f32) -> Self {
        self.weight_range = (min, max);
        self
    }

    pub fn build(self) -> Result<Network> {
        if self.layers.len() < 2 {
            return Err(Error::topology(format!(
                "a network needs at least an input and an output layer, received {} layer(s)",
                self.layers.len()
            )));
        }
        if let Some(i) = self.layers.iter().position(|&s| s == 0) {
            return Err(Error::topology(format!("layer {} has no neurons", i)));
        }
        if !(self.connection_rate > 0. && self.connection_rate <= 1.) {
            return Err(Error::topology(format!(
                "connection rate must lie in (0, 1], received {}",
                self.connection_rate
            )));
        }

        let mut rng = SmallRng::seed_from_u64(self.seed);
        let count = self.layers.len();

        let mut layers = Vec::with_capacity(count);
        let mut neurons = Vec::new();
        for (i, &size) in self.layers.iter().enumerate() {
            let bias = i + 1 < count;
            let (activation, steepness) = if i == 0 {
                (Activation::Linear, 1.)
            } else if i + 1 == count {
                (self.output_activation, self.output_steepness)
            } else {
                (self.hidden_activation, self.hidden_steepness)
            };
            let first = neurons.len();
            neurons.extend((0..size).map(|_| Neuron::new(activation, steepness)));
            if bias {
                neurons.push(Neuron::new(Activation::Linear, 1.));
            }
            layers.push(Layer {
                first,
                last: neurons.len(),
                bias,
            });
        }

        // sources of every neuron, indexed by destination
        let mut sources: Vec<Vec<usize>> = vec![Vec::new(); neurons.len()];
        for l in 1..count {
            let from = match self.kind {
                NetworkType::Layer => layers[l - 1].first,
                NetworkType::Shortcut => 0,
            };
            let to = layers[l - 1].last;
            for dest in layers[l].neurons() {
                sources[dest].extend(from..to);
            }
        }
        if self.connection_rate < 1. {
            thin_connections(&mut sources, &layers, self.connection_rate, &mut rng);
        }

        let mut weights = Vec::new();
        let mut connections = Vec::new();
        for (neuron, src) in neurons.iter_mut().zip(sources) {
            neuron.first_con = connections.len();
            connections.extend(src);
            neuron.last_con = connections.len();
        }
        weights.resize(connections.len(), 0.);
        let (min, max) = self.weight_range;
        initializer::uniform(&mut rng, &mut weights, min, max);

        log::debug!(
            "Built {:?} network with layers {:?} and {} connections",
            self.kind,
            self.layers,
            connections.len()
        );

        Ok(Network::from_parts(
            self.kind,
            self.connection_rate,
            layers,
            neurons,
            weights,
            connections,
            rng.gen(),
        ))
    }
}

/// Randomly removes connections between consecutive layers. Bias connections
/// always survive, every neuron keeps at least one real input and every real
/// neuron outside the output layer keeps at least one output.
fn thin_connections(sources: &mut [Vec<usize>], layers: &[Layer], rate: f32, rng: &mut SmallRng) {
    for l in 1..layers.len() {
        let prev = layers[l - 1];
        let bias = prev.bias_index();
        let real: Vec<usize> = prev.neurons().collect();
        let dests: Vec<usize> = layers[l].neurons().collect();

        for &d in &dests {
            let mut kept: Vec<usize> = real.iter().copied().filter(|_| rng.gen::<f32>() < rate).collect();
            if kept.is_empty() {
                kept.push(real[rng.gen_range(0, real.len())]);
            }
            kept.extend(bias);
            sources[d] = kept;
        }

        for &s in &real {
            if !dests.iter().any(|&d| sources[d].contains(&s)) {
                let d = dests[rng.gen_range(0, dests.len())];
                sources[d].push(s);
            }
        }
        for &d in &dests {
            sources[d].sort_unstable();
        }
    }
}
