use std::convert::TryFrom;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Layer, Network, NetworkType, Neuron, ScalingParams};
use crate::a_funcs::MAX_SUM;
use crate::config::{CascadeParams, TrainParams};
use crate::error::{Error, Result};

impl Network {
    /// Propagates `input` through the network and returns the output layer's
    /// values. The slice stays valid until the network is run or trained again.
    pub fn run(&mut self, input: &[f32]) -> Result<&[f32]> {
        if input.len() != self.num_input() {
            return Err(Error::dims(self.num_input(), input.len()));
        }
        self.forward(input);
        Ok(&self.output)
    }

    /// Output of the last run.
    pub fn output(&self) -> &[f32] {
        &self.output
    }

    /// Forward pass without the length check. Caches every neuron's sum and value.
    pub(crate) fn forward(&mut self, input: &[f32]) {
        let Network {
            layers,
            neurons,
            weights,
            connections,
            output,
            ..
        } = self;

        for (n, v) in neurons[layers[0].neurons()].iter_mut().zip(input) {
            n.value = *v;
        }

        for layer in &layers[1..] {
            for i in layer.neurons() {
                let (first, last) = (neurons[i].first_con, neurons[i].last_con);
                let sum: f32 = weights[first..last]
                    .iter()
                    .zip(&connections[first..last])
                    .map(|(w, &src)| w * neurons[src].value)
                    .sum();

                let neuron = &mut neurons[i];
                let sum = (sum * neuron.steepness).max(-MAX_SUM).min(MAX_SUM);
                neuron.sum = sum;
                neuron.value = neuron.activation.evaluate(sum);
            }
        }

        let out = layers[layers.len() - 1].neurons();
        for (o, n) in output.iter_mut().zip(&neurons[out]) {
            *o = n.value;
        }
    }

    /// Fills the error signal of the output neurons for the last forward pass
    /// and accumulates the error statistics. Every other entry is zeroed.
    pub(crate) fn compute_errors(&mut self, desired: &[f32], errors: &mut [f32]) {
        errors.iter_mut().for_each(|e| *e = 0.);
        let out = self.output_layer().neurons();
        let (limit, error_func) = (self.params.bit_fail_limit, self.params.error_func);

        for (n, d) in out.zip(desired) {
            let neuron = &self.neurons[n];
            let diff = self.mse.update(neuron.activation, d - neuron.value, limit);
            errors[n] = error_func.eval(diff) * neuron.derivative();
        }
    }

    /// Propagates the output errors back through every connection, shortcut
    /// connections included.
    pub(crate) fn backpropagate(&self, errors: &mut [f32]) {
        for li in (2..self.layers.len()).rev() {
            for n in self.layers[li].neurons() {
                let err = errors[n];
                let neuron = &self.neurons[n];
                for c in neuron.first_con..neuron.last_con {
                    errors[self.connections[c]] += err * self.weights[c];
                }
            }
            for m in self.layers[li - 1].neurons() {
                errors[m] *= self.neurons[m].derivative();
            }
        }
    }

    /// Adds `error(dest) * value(source)` of every connection feeding the
    /// layers from `first_layer` on.
    pub(crate) fn update_slopes(&self, errors: &[f32], slopes: &mut [f32], first_layer: usize) {
        for layer in &self.layers[first_layer..] {
            for n in layer.neurons() {
                let err = errors[n];
                let neuron = &self.neurons[n];
                for c in neuron.first_con..neuron.last_con {
                    slopes[c] += err * self.neurons[self.connections[c]].value;
                }
            }
        }
    }

    /// Saves the network as JSON. Transient training state is not saved.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let network: Self = serde_json::from_str(&s)?;
        log::debug!("Loaded network with layers {:?}", network.layer_sizes());
        Ok(network)
    }
}

/// When deserializing, we first construct this object, validate that its
/// structure is correct and only then convert it to a Network.
#[derive(Serialize, Deserialize)]
pub(crate) struct NetworkRepr {
    network_type: NetworkType,
    connection_rate: f32,
    layers: Vec<Layer>,
    neurons: Vec<Neuron>,
    connections: Vec<usize>,
    weights: Vec<f32>,
    params: TrainParams,
    cascade: CascadeParams,
    scaling: Option<ScalingParams>,
}

impl From<Network> for NetworkRepr {
    fn from(net: Network) -> Self {
        NetworkRepr {
            network_type: net.kind,
            connection_rate: net.connection_rate,
            layers: net.layers,
            neurons: net.neurons,
            connections: net.connections,
            weights: net.weights,
            params: net.params,
            cascade: net.cascade,
            scaling: net.scaling,
        }
    }
}

impl TryFrom<NetworkRepr> for Network {
    type Error = Error;

    fn try_from(value: NetworkRepr) -> Result<Self> {
        validate_layers(&value.layers, value.neurons.len())?;
        if value.connections.len() != value.weights.len() {
            return Err(Error::malformed(format!(
                "{} connections but {} weights",
                value.connections.len(),
                value.weights.len()
            )));
        }
        validate_connections(&value)?;
        if value.neurons.iter().any(|n| !n.steepness.is_finite()) {
            return Err(Error::malformed("steepness must be finite"));
        }
        value.params.validate()?;
        value.cascade.validate()?;

        let num_input = value.layers[0].size();
        let num_output = value.layers[value.layers.len() - 1].size();
        if let Some(s) = &value.scaling {
            let bad = |scales: usize, width: usize| scales != 0 && scales != width;
            if bad(s.input.len(), num_input) || bad(s.output.len(), num_output) {
                return Err(Error::malformed("scaling parameters do not match the layer sizes"));
            }
        }

        let mut net = Network::from_parts(
            value.network_type,
            value.connection_rate,
            value.layers,
            value.neurons,
            value.weights,
            value.connections,
            0,
        );
        net.params = value.params;
        net.cascade = value.cascade;
        net.scaling = value.scaling;
        Ok(net)
    }
}

fn validate_layers(layers: &[Layer], num_neurons: usize) -> Result<()> {
    if layers.len() < 2 {
        return Err(Error::malformed(format!(
            "a network needs at least two layers, found {}",
            layers.len()
        )));
    }
    let mut next = 0;
    for (i, l) in layers.iter().enumerate() {
        if l.first != next || l.last <= l.first + l.bias as usize {
            return Err(Error::malformed(format!("layer {} has an invalid neuron range", i)));
        }
        next = l.last;
    }
    if layers[layers.len() - 1].bias {
        return Err(Error::malformed("the output layer cannot have a bias neuron"));
    }
    if next != num_neurons {
        return Err(Error::malformed(format!(
            "layers cover {} neurons but {} are stored",
            next, num_neurons
        )));
    }
    Ok(())
}

fn validate_connections(value: &NetworkRepr) -> Result<()> {
    let mut next = 0;
    for (li, layer) in value.layers.iter().enumerate() {
        for i in layer.all() {
            let n = &value.neurons[i];
            let feeds = li > 0 && Some(i) != layer.bias_index();
            if n.first_con != next || n.last_con < n.first_con || (!feeds && n.num_connections() > 0) {
                return Err(Error::malformed(format!("neuron {} has an invalid connection range", i)));
            }
            if let Some(src) = value.connections[n.first_con.min(value.connections.len())..]
                .iter()
                .take(n.num_connections())
                .find(|&&src| src >= layer.first)
            {
                return Err(Error::malformed(format!(
                    "connection from {} to {} does not point forward",
                    src, i
                )));
            }
            next = n.last_con;
        }
    }
    if next != value.weights.len() {
        return Err(Error::malformed(format!(
            "neurons use {} connections but {} are stored",
            next,
            value.weights.len()
        )));
    }
    Ok(())
}
