pub mod construction;
pub mod feed_forward;
pub mod scaling;

pub use self::construction::NetworkBuilder;
pub use self::scaling::ScalingParams;

use std::fmt;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::a_funcs::Activation;
use crate::config::{CascadeParams, TrainParams};
use crate::error::{Error, Result};
use crate::initializer;
use crate::loss_funcs::MseAccumulator;
use crate::optimizer::TrainState;
use crate::storage::TrainData;
use crate::trainer::TrainCallback;

/// How layers are wired together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkType {
    /// Each layer only connects to the next one.
    Layer,
    /// Each layer connects to all following layers.
    Shortcut,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Neuron {
    pub(crate) first_con: usize,
    pub(crate) last_con: usize,
    pub(crate) activation: Activation,
    pub(crate) steepness: f32,
    /// Steepness-scaled weighted input of the last run.
    #[serde(skip)]
    pub(crate) sum: f32,
    #[serde(skip)]
    pub(crate) value: f32,
}

impl Neuron {
    pub(crate) fn new(activation: Activation, steepness: f32) -> Self {
        Self {
            first_con: 0,
            last_con: 0,
            activation,
            steepness,
            sum: 0.,
            value: 0.,
        }
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn steepness(&self) -> f32 {
        self.steepness
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn num_connections(&self) -> usize {
        self.last_con - self.first_con
    }

    pub(crate) fn derivative(&self) -> f32 {
        self.activation.derivative(self.steepness, self.value, self.sum)
    }
}

/// A contiguous run of neurons. When `bias` is set the last neuron of the run
/// is a bias neuron with a constant output of one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub(crate) first: usize,
    pub(crate) last: usize,
    pub(crate) bias: bool,
}

impl Layer {
    /// Number of neurons excluding the bias.
    pub fn size(&self) -> usize {
        self.last - self.first - self.bias as usize
    }

    pub fn has_bias(&self) -> bool {
        self.bias
    }

    /// Indices of the non-bias neurons.
    pub fn neurons(&self) -> std::ops::Range<usize> {
        self.first..self.last - self.bias as usize
    }

    pub(crate) fn all(&self) -> std::ops::Range<usize> {
        self.first..self.last
    }

    pub(crate) fn bias_index(&self) -> Option<usize> {
        if self.bias {
            Some(self.last - 1)
        } else {
            None
        }
    }
}

/// A single weighted connection between two neurons, indexed globally.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: usize,
    pub to: usize,
    pub weight: f32,
}

/// A feedforward network together with everything needed to train it.
///
/// Saved and loaded as JSON through a validated intermediate representation.
#[derive(Serialize, Deserialize)]
#[serde(into = "feed_forward::NetworkRepr", try_from = "feed_forward::NetworkRepr")]
pub struct Network {
    pub(crate) kind: NetworkType,
    pub(crate) connection_rate: f32,
    pub(crate) layers: Vec<Layer>,
    pub(crate) neurons: Vec<Neuron>,
    pub(crate) weights: Vec<f32>,
    /// Source neuron of every weight.
    pub(crate) connections: Vec<usize>,
    pub(crate) params: TrainParams,
    pub(crate) cascade: CascadeParams,
    pub(crate) scaling: Option<ScalingParams>,
    pub(crate) mse: MseAccumulator,
    pub(crate) train: Option<TrainState>,
    pub(crate) callback: Option<TrainCallback>,
    pub(crate) rng: SmallRng,
    pub(crate) output: Vec<f32>,
}

impl Clone for Network {
    /// Clones everything except the callback, which stays with the original.
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            connection_rate: self.connection_rate,
            layers: self.layers.clone(),
            neurons: self.neurons.clone(),
            weights: self.weights.clone(),
            connections: self.connections.clone(),
            params: self.params.clone(),
            cascade: self.cascade.clone(),
            scaling: self.scaling.clone(),
            mse: self.mse.clone(),
            train: self.train.clone(),
            callback: None,
            rng: self.rng.clone(),
            output: self.output.clone(),
        }
    }
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("kind", &self.kind)
            .field("layers", &self.layer_sizes())
            .field("connections", &self.weights.len())
            .field("algorithm", &self.params.algorithm)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl Network {
    /// Fully connected network, see [`NetworkBuilder::standard`].
    pub fn standard(layers: &[usize]) -> Result<Self> {
        NetworkBuilder::standard(layers).build()
    }

    /// Partially connected network, see [`NetworkBuilder::sparse`].
    pub fn sparse(connection_rate: f32, layers: &[usize]) -> Result<Self> {
        NetworkBuilder::sparse(connection_rate, layers).build()
    }

    /// Network with connections skipping layers, see [`NetworkBuilder::shortcut`].
    pub fn shortcut(layers: &[usize]) -> Result<Self> {
        NetworkBuilder::shortcut(layers).build()
    }

    pub(crate) fn from_parts(
        kind: NetworkType,
        connection_rate: f32,
        layers: Vec<Layer>,
        neurons: Vec<Neuron>,
        weights: Vec<f32>,
        connections: Vec<usize>,
        seed: u64,
    ) -> Self {
        let num_output = layers.last().map_or(0, |l| l.size());
        let mut network = Self {
            kind,
            connection_rate,
            layers,
            neurons,
            weights,
            connections,
            params: TrainParams::default(),
            cascade: CascadeParams::default(),
            scaling: None,
            mse: MseAccumulator::default(),
            train: None,
            callback: None,
            rng: SmallRng::seed_from_u64(seed),
            output: vec![0.; num_output],
        };
        network.reset_bias_values();
        network
    }

    pub(crate) fn reset_bias_values(&mut self) {
        for layer in &self.layers {
            if let Some(b) = layer.bias_index() {
                self.neurons[b].value = 1.;
            }
        }
    }

    pub fn num_input(&self) -> usize {
        self.layers[0].size()
    }

    pub fn num_output(&self) -> usize {
        self.output_layer().size()
    }

    /// Number of neurons, bias neurons included.
    pub fn total_neurons(&self) -> usize {
        self.neurons.len()
    }

    pub fn total_connections(&self) -> usize {
        self.weights.len()
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn network_type(&self) -> NetworkType {
        self.kind
    }

    pub fn connection_rate(&self) -> f32 {
        self.connection_rate
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    /// Number of non-bias neurons in every layer.
    pub fn layer_sizes(&self) -> Vec<usize> {
        self.layers.iter().map(Layer::size).collect()
    }

    /// Number of bias neurons in every layer.
    pub fn bias_counts(&self) -> Vec<usize> {
        self.layers.iter().map(|l| l.bias as usize).collect()
    }

    /// Number of neurons in hidden layers, bias neurons excluded.
    pub fn num_hidden(&self) -> usize {
        let n = self.layers.len();
        self.layers[1..n - 1].iter().map(Layer::size).sum()
    }

    pub(crate) fn output_layer(&self) -> &Layer {
        // construction guarantees at least two layers
        &self.layers[self.layers.len() - 1]
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Overwrites all weights in connection order.
    pub fn set_weight_array(&mut self, weights: &[f32]) -> Result<()> {
        if weights.len() != self.weights.len() {
            return Err(Error::dims(self.weights.len(), weights.len()));
        }
        self.weights.copy_from_slice(weights);
        Ok(())
    }

    /// Every connection in the network, grouped by destination neuron.
    pub fn connections(&self) -> Vec<Connection> {
        let mut out = Vec::with_capacity(self.weights.len());
        for (to, neuron) in self.neurons.iter().enumerate() {
            for c in neuron.first_con..neuron.last_con {
                out.push(Connection {
                    from: self.connections[c],
                    to,
                    weight: self.weights[c],
                });
            }
        }
        out
    }

    fn find_connection(&self, from: usize, to: usize) -> Option<usize> {
        let neuron = self.neurons.get(to)?;
        (neuron.first_con..neuron.last_con).find(|&c| self.connections[c] == from)
    }

    pub fn weight(&self, from: usize, to: usize) -> Option<f32> {
        self.find_connection(from, to).map(|c| self.weights[c])
    }

    /// Sets the weight of an existing connection.
    pub fn set_weight(&mut self, from: usize, to: usize, weight: f32) -> Result<()> {
        let c = self.find_connection(from, to).ok_or_else(|| {
            Error::topology(format!("there is no connection from {} to {}", from, to))
        })?;
        self.weights[c] = weight;
        Ok(())
    }

    /// Sets the weights of several existing connections. Nothing is changed if
    /// any of them does not exist.
    pub fn set_weights(&mut self, connections: &[Connection]) -> Result<()> {
        let idx = connections
            .iter()
            .map(|c| {
                self.find_connection(c.from, c.to).ok_or_else(|| {
                    Error::topology(format!("there is no connection from {} to {}", c.from, c.to))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        for (i, c) in idx.into_iter().zip(connections) {
            self.weights[i] = c.weight;
        }
        Ok(())
    }

    fn neuron_index(&self, layer: usize, neuron: usize) -> Result<usize> {
        if layer == 0 {
            return Err(Error::topology("the input layer has no activation function"));
        }
        let l = self
            .layers
            .get(layer)
            .ok_or_else(|| Error::topology(format!("layer {} does not exist", layer)))?;
        if neuron >= l.size() {
            return Err(Error::topology(format!(
                "layer {} has no neuron {}",
                layer, neuron
            )));
        }
        Ok(l.first + neuron)
    }

    pub fn activation(&self, layer: usize, neuron: usize) -> Result<Activation> {
        Ok(self.neurons[self.neuron_index(layer, neuron)?].activation)
    }

    pub fn steepness(&self, layer: usize, neuron: usize) -> Result<f32> {
        Ok(self.neurons[self.neuron_index(layer, neuron)?].steepness)
    }

    pub fn set_activation(&mut self, activation: Activation, layer: usize, neuron: usize) -> Result<()> {
        let i = self.neuron_index(layer, neuron)?;
        self.neurons[i].activation = activation;
        Ok(())
    }

    pub fn set_steepness(&mut self, steepness: f32, layer: usize, neuron: usize) -> Result<()> {
        let i = self.neuron_index(layer, neuron)?;
        self.neurons[i].steepness = steepness;
        Ok(())
    }

    pub fn set_activation_layer(&mut self, activation: Activation, layer: usize) -> Result<()> {
        self.neuron_index(layer, 0)?;
        let range = self.layers[layer].neurons();
        self.neurons[range].iter_mut().for_each(|n| n.activation = activation);
        Ok(())
    }

    pub fn set_steepness_layer(&mut self, steepness: f32, layer: usize) -> Result<()> {
        self.neuron_index(layer, 0)?;
        let range = self.layers[layer].neurons();
        self.neurons[range].iter_mut().for_each(|n| n.steepness = steepness);
        Ok(())
    }

    /// Sets the activation function of every hidden neuron.
    pub fn set_activation_hidden(&mut self, activation: Activation) {
        for l in 1..self.layers.len() - 1 {
            let range = self.layers[l].neurons();
            self.neurons[range].iter_mut().for_each(|n| n.activation = activation);
        }
    }

    pub fn set_activation_output(&mut self, activation: Activation) {
        let range = self.output_layer().neurons();
        self.neurons[range].iter_mut().for_each(|n| n.activation = activation);
    }

    pub fn set_steepness_hidden(&mut self, steepness: f32) {
        for l in 1..self.layers.len() - 1 {
            let range = self.layers[l].neurons();
            self.neurons[range].iter_mut().for_each(|n| n.steepness = steepness);
        }
    }

    pub fn set_steepness_output(&mut self, steepness: f32) {
        let range = self.output_layer().neurons();
        self.neurons[range].iter_mut().for_each(|n| n.steepness = steepness);
    }

    pub fn params(&self) -> &TrainParams {
        &self.params
    }

    /// Mutable training parameters. Changing the algorithm discards the
    /// per-weight training state on the next epoch.
    pub fn params_mut(&mut self) -> &mut TrainParams {
        &mut self.params
    }

    pub fn set_params(&mut self, params: TrainParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn cascade_params(&self) -> &CascadeParams {
        &self.cascade
    }

    pub fn cascade_params_mut(&mut self) -> &mut CascadeParams {
        &mut self.cascade
    }

    pub fn set_cascade_params(&mut self, params: CascadeParams) -> Result<()> {
        params.validate()?;
        self.cascade = params;
        Ok(())
    }

    /// Mean square error accumulated since the last reset.
    pub fn mse(&self) -> f32 {
        self.mse.mse()
    }

    /// Number of output values whose error exceeded the bit fail limit since the last reset.
    pub fn bit_fail(&self) -> usize {
        self.mse.bit_fail
    }

    pub fn reset_mse(&mut self) {
        self.mse.reset();
    }

    /// Reseeds the generator used for weight initialization, sparse wiring,
    /// shuffling and SARPROP noise.
    pub fn seed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }

    /// Sets every weight to a uniformly random value in `[min, max]`.
    pub fn randomize_weights(&mut self, min: f32, max: f32) {
        initializer::uniform(&mut self.rng, &mut self.weights, min, max);
        self.train = None;
    }

    /// Initializes the weights from the input range of `data` so that the
    /// active region of each neuron covers the inputs.
    pub fn init_weights(&mut self, data: &TrainData) -> Result<()> {
        if data.num_input() != self.num_input() {
            return Err(Error::dims(self.num_input(), data.num_input()));
        }
        let (min, max) = data.input_range();
        let num_hidden = self.num_hidden();
        let multiplier = initializer::widrow_multiplier(num_hidden, self.num_input(), min, max);

        let Network {
            layers,
            neurons,
            weights,
            connections,
            rng,
            ..
        } = self;
        let biases: Vec<usize> = layers.iter().filter_map(Layer::bias_index).collect();
        for neuron in &neurons[layers[1].first..] {
            for c in neuron.first_con..neuron.last_con {
                weights[c] = if biases.contains(&connections[c]) {
                    initializer::sample(rng, -multiplier, multiplier)
                } else {
                    initializer::sample(rng, 0., multiplier)
                };
            }
        }
        self.train = None;
        Ok(())
    }

    /// Registers a closure called instead of the log report during training.
    /// Returning -1 from it stops training. A previously set closure is dropped.
    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&Network, &TrainData, &crate::trainer::EpochReport) -> i32 + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    pub fn clear_callback(&mut self) {
        self.callback = None;
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Inserts a new single neuron hidden layer in front of the output layer.
    /// The neuron receives input from every non-output neuron and feeds every
    /// output neuron.
    pub(crate) fn insert_hidden_neuron(
        &mut self,
        activation: Activation,
        steepness: f32,
        in_weights: &[f32],
        out_weights: &[f32],
    ) {
        let out_layer = *self.output_layer();
        let new_idx = out_layer.first;
        debug_assert_eq!(in_weights.len(), new_idx);
        debug_assert_eq!(out_weights.len(), out_layer.size());

        let mut weights = Vec::with_capacity(self.weights.len() + in_weights.len() + out_weights.len());
        let mut connections = Vec::with_capacity(weights.capacity());

        // neurons in front of the output layer keep their connections unchanged
        let first_out_con = self.neurons[new_idx].first_con;
        weights.extend_from_slice(&self.weights[..first_out_con]);
        connections.extend_from_slice(&self.connections[..first_out_con]);

        let mut neuron = Neuron::new(activation, steepness);
        neuron.first_con = weights.len();
        weights.extend_from_slice(in_weights);
        connections.extend(0..new_idx);
        neuron.last_con = weights.len();

        for (j, n) in self.neurons[new_idx..].iter_mut().enumerate() {
            let (first, last) = (n.first_con, n.last_con);
            n.first_con = weights.len();
            weights.extend_from_slice(&self.weights[first..last]);
            connections.extend_from_slice(&self.connections[first..last]);
            weights.push(out_weights[j]);
            connections.push(new_idx);
            n.last_con = weights.len();
        }

        self.neurons.insert(new_idx, neuron);
        self.weights = weights;
        self.connections = connections;

        let n = self.layers.len();
        self.layers[n - 1].first += 1;
        self.layers[n - 1].last += 1;
        self.layers.insert(
            n - 1,
            Layer {
                first: new_idx,
                last: new_idx + 1,
                bias: false,
            },
        );
        self.train = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_counts() {
        let net = Network::standard(&[2, 3, 1]).unwrap();
        assert_eq!(net.num_input(), 2);
        assert_eq!(net.num_output(), 1);
        assert_eq!(net.total_neurons(), 3 + 4 + 1);
        assert_eq!(net.total_connections(), 3 * 3 + 4);
        assert_eq!(net.layer_sizes(), vec![2, 3, 1]);
        assert_eq!(net.bias_counts(), vec![1, 1, 0]);
        assert_eq!(net.num_hidden(), 3);
    }

    #[test]
    fn set_and_get_weight() {
        let mut net = Network::standard(&[2, 1]).unwrap();
        net.set_weight(0, 3, 0.25).unwrap();
        assert_eq!(net.weight(0, 3), Some(0.25));
        assert!(net.set_weight(3, 0, 1.).is_err());

        let before = net.weights().to_vec();
        let bad = [
            Connection { from: 1, to: 3, weight: 9. },
            Connection { from: 3, to: 3, weight: 9. },
        ];
        assert!(net.set_weights(&bad).is_err());
        assert_eq!(net.weights(), &before[..]);
    }

    #[test]
    fn activation_setters() {
        let mut net = Network::standard(&[2, 3, 1]).unwrap();
        net.set_activation_hidden(Activation::Gaussian);
        net.set_activation_output(Activation::Linear);
        assert_eq!(net.activation(1, 2).unwrap(), Activation::Gaussian);
        assert_eq!(net.activation(2, 0).unwrap(), Activation::Linear);
        assert!(net.activation(0, 0).is_err());
        assert!(net.set_steepness(1., 1, 3).is_err());
    }

    #[test]
    fn insert_hidden_neuron_rewires() {
        let mut net = Network::shortcut(&[2, 1]).unwrap();
        net.set_weight_array(&[0.1, 0.2, 0.3]).unwrap();
        net.insert_hidden_neuron(Activation::Sigmoid, 0.5, &[1., 2., 3.], &[4.]);
        assert_eq!(net.layer_sizes(), vec![2, 1, 1]);
        assert_eq!(net.total_neurons(), 5);
        assert_eq!(net.weight(0, 3), Some(1.));
        assert_eq!(net.weight(2, 3), Some(3.));
        assert_eq!(net.weight(0, 4), Some(0.1));
        assert_eq!(net.weight(2, 4), Some(0.3));
        assert_eq!(net.weight(3, 4), Some(4.));
        assert_eq!(net.num_hidden(), 1);
    }

    #[test]
    fn clone_drops_callback() {
        let mut net = Network::standard(&[1, 1]).unwrap();
        net.set_callback(|_, _, _| 0);
        let copy = net.clone();
        assert!(net.has_callback());
        assert!(!copy.has_callback());
    }
}
