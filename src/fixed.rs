//! Export of a trained network to fixed point arithmetic.
//!
//! Every value is an `i32` holding `round(v * 2^decimal_point)`. The decimal
//! point is chosen from the largest magnitude the network can produce so that
//! the product of two fixed point numbers still fits 64 bits before shifting.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::a_funcs::{
    Activation, MAX_SUM, SIGMOID_STEPWISE_RESULTS, SIGMOID_SYMMETRIC_STEPWISE_RESULTS,
    STEPWISE_BREAKPOINTS,
};
use crate::error::{Error, Result};
use crate::network::{Layer, Network};
use crate::storage::TrainData;

/// Integer bits available for the magnitude of a value, sign and stepwise
/// subtraction excluded.
const VALUE_BITS: i32 = 32 - 2;

/// How the decimal point was chosen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedReport {
    pub decimal_point: u32,
    /// Largest magnitude found in the weights, activations and data.
    pub max_magnitude: f32,
    /// The magnitude needed a negative decimal point, which was raised to zero.
    pub precision_loss: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixedNeuron {
    first_con: usize,
    last_con: usize,
    activation: Activation,
    steepness: i32,
}

/// A network evaluated with integer arithmetic only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FixedNetwork {
    decimal_point: u32,
    multiplier: i32,
    layers: Vec<Layer>,
    neurons: Vec<FixedNeuron>,
    connections: Vec<usize>,
    weights: Vec<i32>,
    stepwise_breakpoints: [i32; 6],
    sigmoid_results: [i32; 6],
    sigmoid_symmetric_results: [i32; 6],
    #[serde(skip)]
    values: Vec<i32>,
    #[serde(skip)]
    output: Vec<i32>,
    #[serde(skip)]
    overflows: usize,
}

fn fixed_supported(a: Activation) -> bool {
    matches!(
        a,
        Activation::Linear
            | Activation::Threshold
            | Activation::ThresholdSymmetric
            | Activation::Sigmoid
            | Activation::SigmoidStepwise
            | Activation::SigmoidSymmetric
            | Activation::SigmoidSymmetricStepwise
            | Activation::LinearPiece
            | Activation::LinearPieceSymmetric
    )
}

/// Number of halvings needed to bring `max` below one.
fn bits_for(mut max: f32) -> i32 {
    let mut bits = 0;
    while max >= 1. && bits < 128 {
        max /= 2.;
        bits += 1;
    }
    bits
}

fn to_fixed(value: f32, decimal_point: u32) -> Result<i32> {
    let scaled = (value as f64 * (1u64 << decimal_point) as f64).round();
    if !(scaled >= i32::MIN as f64 && scaled <= i32::MAX as f64) {
        return Err(Error::Overflow {
            value,
            decimal_point,
        });
    }
    Ok(scaled as i32)
}

fn to_fixed_table(values: &[f32; 6], decimal_point: u32) -> Result<[i32; 6]> {
    let mut out = [0; 6];
    for (o, v) in out.iter_mut().zip(values) {
        *o = to_fixed(*v, decimal_point)?;
    }
    Ok(out)
}

impl Network {
    /// Largest magnitude the network produces, from the connection weights
    /// and, when `data` is given, from running every pattern.
    fn max_magnitude(&mut self, data: Option<&TrainData>) -> f32 {
        let mut max: f32 = 1.;
        for layer in &self.layers[1..] {
            for n in layer.neurons() {
                let neuron = &self.neurons[n];
                let total: f32 = self.weights[neuron.first_con..neuron.last_con]
                    .iter()
                    .map(|w| w.abs())
                    .sum();
                max = max.max(total * neuron.steepness.abs().max(1.));
            }
        }

        if let Some(data) = data {
            for i in 0..data.len() {
                let input = data.input(i);
                max = input.iter().fold(max, |m, v| m.max(v.abs()));
                self.forward(input);
                for n in &self.neurons {
                    max = max.max(n.sum.abs()).max(n.value.abs());
                    if n.steepness != 0. {
                        max = max.max((n.sum / n.steepness).abs());
                    }
                }
            }
        }
        max
    }

    /// Converts the network to fixed point. `data` lets the decimal point
    /// account for the values actually produced while running it.
    pub fn to_fixed(&mut self, data: Option<&TrainData>) -> Result<(FixedNetwork, FixedReport)> {
        if let Some(d) = data {
            self.check_data(d)?;
        }
        if let Some(n) = self.neurons.iter().find(|n| !fixed_supported(n.activation())) {
            return Err(Error::topology(format!(
                "{:?} has no fixed point implementation",
                n.activation()
            )));
        }

        let max_magnitude = self.max_magnitude(data);
        let calculated = (VALUE_BITS - bits_for(max_magnitude)) / 2;
        let precision_loss = calculated < 0;
        if precision_loss {
            log::warn!(
                "Values up to {} need a negative decimal point, fixed point results will lose precision",
                max_magnitude
            );
        }
        let decimal_point = calculated.max(0) as u32;
        log::debug!("Fixed point decimal point {} for magnitude {}", decimal_point, max_magnitude);

        let weights = self
            .weights
            .iter()
            .map(|w| to_fixed(*w, decimal_point))
            .collect::<Result<Vec<_>>>()?;
        let neurons = self
            .neurons
            .iter()
            .map(|n| {
                Ok(FixedNeuron {
                    first_con: n.first_con,
                    last_con: n.last_con,
                    activation: n.activation(),
                    steepness: to_fixed(n.steepness(), decimal_point)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut fixed = FixedNetwork {
            decimal_point,
            multiplier: 1 << decimal_point,
            layers: self.layers.clone(),
            neurons,
            connections: self.connections.clone(),
            weights,
            stepwise_breakpoints: to_fixed_table(&STEPWISE_BREAKPOINTS, decimal_point)?,
            sigmoid_results: to_fixed_table(&SIGMOID_STEPWISE_RESULTS, decimal_point)?,
            sigmoid_symmetric_results: to_fixed_table(&SIGMOID_SYMMETRIC_STEPWISE_RESULTS, decimal_point)?,
            values: Vec::new(),
            output: Vec::new(),
            overflows: 0,
        };
        fixed.prepare();

        Ok((
            fixed,
            FixedReport {
                decimal_point,
                max_magnitude,
                precision_loss,
            },
        ))
    }

    /// Converts the network and saves the fixed point version as JSON.
    pub fn save_fixed<P: AsRef<Path>>(&mut self, path: P, data: Option<&TrainData>) -> Result<FixedReport> {
        let (fixed, report) = self.to_fixed(data)?;
        fixed.save(path)?;
        Ok(report)
    }
}

impl FixedNetwork {
    fn prepare(&mut self) {
        self.values = vec![0; self.neurons.len()];
        for layer in &self.layers {
            if let Some(b) = layer.bias_index() {
                self.values[b] = self.multiplier;
            }
        }
        self.output = vec![0; self.num_output()];
        self.overflows = 0;
    }

    pub fn decimal_point(&self) -> u32 {
        self.decimal_point
    }

    pub fn multiplier(&self) -> i32 {
        self.multiplier
    }

    pub fn num_input(&self) -> usize {
        self.layers[0].size()
    }

    pub fn num_output(&self) -> usize {
        self.layers[self.layers.len() - 1].size()
    }

    pub fn weights(&self) -> &[i32] {
        &self.weights
    }

    /// Intermediate results clamped to the `i32` range since loading or converting.
    pub fn overflows(&self) -> usize {
        self.overflows
    }

    fn saturate(&mut self, v: i64) -> i32 {
        if v > i32::MAX as i64 {
            self.overflows += 1;
            i32::MAX
        } else if v < i32::MIN as i64 {
            self.overflows += 1;
            i32::MIN
        } else {
            v as i32
        }
    }

    fn stepwise(&self, results: &[i32; 6], min: i32, max: i32, sum: i32) -> i32 {
        let v = &self.stepwise_breakpoints;
        if sum < v[0] {
            return min;
        }
        if sum >= v[5] {
            return max;
        }
        let i = (1..6).find(|&i| sum < v[i]).unwrap_or(5);
        let (v1, v2, r1, r2) = (v[i - 1] as i64, v[i] as i64, results[i - 1] as i64, results[i] as i64);
        if v2 == v1 {
            return r2 as i32;
        }
        ((r2 - r1) * (sum as i64 - v1) / (v2 - v1) + r1) as i32
    }

    fn activate(&self, activation: Activation, sum: i32) -> i32 {
        let m = self.multiplier;
        match activation {
            Activation::Threshold => {
                if sum < 0 {
                    0
                } else {
                    m
                }
            }
            Activation::ThresholdSymmetric => {
                if sum < 0 {
                    -m
                } else {
                    m
                }
            }
            Activation::Sigmoid | Activation::SigmoidStepwise => {
                self.stepwise(&self.sigmoid_results, 0, m, sum)
            }
            Activation::SigmoidSymmetric | Activation::SigmoidSymmetricStepwise => {
                self.stepwise(&self.sigmoid_symmetric_results, -m, m, sum)
            }
            Activation::LinearPiece => sum.max(0).min(m),
            Activation::LinearPieceSymmetric => sum.max(-m).min(m),
            // anything else was rejected on conversion and load
            _ => sum,
        }
    }

    /// Runs the network on fixed point inputs.
    pub fn run(&mut self, input: &[i32]) -> Result<&[i32]> {
        if input.len() != self.num_input() {
            return Err(Error::dims(self.num_input(), input.len()));
        }
        let dp = self.decimal_point;
        let max_sum = (MAX_SUM as i64) << dp;

        self.values[self.layers[0].neurons()].copy_from_slice(input);
        for l in 1..self.layers.len() {
            for i in self.layers[l].neurons() {
                let neuron = &self.neurons[i];
                let (first, last) = (neuron.first_con, neuron.last_con);
                let (activation, steepness) = (neuron.activation, neuron.steepness as i64);

                let acc = self.weights[first..last]
                    .iter()
                    .zip(&self.connections[first..last])
                    .fold(0i64, |acc, (&w, &src)| {
                        acc.saturating_add(w as i64 * self.values[src] as i64)
                    });
                let sum = self.saturate(acc >> dp) as i64;
                let scaled = ((steepness * sum) >> dp).max(-max_sum).min(max_sum);
                let scaled = self.saturate(scaled);
                let value = self.activate(activation, scaled);
                self.values[i] = value;
            }
        }

        let out = self.layers[self.layers.len() - 1].neurons();
        self.output.copy_from_slice(&self.values[out]);
        Ok(&self.output)
    }

    /// Scales `input` by the multiplier, runs and scales the result back.
    pub fn run_float(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let dp = self.decimal_point;
        let input = input
            .iter()
            .map(|v| to_fixed(*v, dp))
            .collect::<Result<Vec<_>>>()?;
        let m = self.multiplier as f32;
        Ok(self.run(&input)?.iter().map(|v| *v as f32 / m).collect())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut network: Self = serde_json::from_str(&s)?;
        network.validate()?;
        network.prepare();
        Ok(network)
    }

    fn validate(&self) -> Result<()> {
        if self.decimal_point >= 31 || self.multiplier != 1 << self.decimal_point {
            return Err(Error::malformed(format!(
                "decimal point {} does not match multiplier {}",
                self.decimal_point, self.multiplier
            )));
        }
        if self.layers.len() < 2
            || self.layers[0].first != 0
            || self.layers.windows(2).any(|w| w[1].first != w[0].last)
            || self.layers.iter().any(|l| l.last <= l.first)
            || self.layers[self.layers.len() - 1].last != self.neurons.len()
        {
            return Err(Error::malformed("layers do not cover the neurons"));
        }
        if self.connections.len() != self.weights.len() {
            return Err(Error::malformed("connection and weight counts differ"));
        }
        let mut next = 0;
        for (l, layer) in self.layers.iter().enumerate() {
            for i in layer.all() {
                let n = &self.neurons[i];
                let fed = l > 0 && Some(i) != layer.bias_index();
                if n.first_con != next || n.last_con < n.first_con || n.last_con > self.weights.len() {
                    return Err(Error::malformed(format!("neuron {} has an invalid connection range", i)));
                }
                if !fed && n.last_con != n.first_con {
                    return Err(Error::malformed(format!("neuron {} cannot have inputs", i)));
                }
                if self.connections[n.first_con..n.last_con].iter().any(|&s| s >= layer.first) {
                    return Err(Error::malformed(format!("neuron {} has a connection that does not point back", i)));
                }
                if !fixed_supported(n.activation) {
                    return Err(Error::topology(format!(
                        "{:?} has no fixed point implementation",
                        n.activation
                    )));
                }
                next = n.last_con;
            }
        }
        if next != self.weights.len() {
            return Err(Error::malformed("neurons do not use every connection"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn net() -> Network {
        let mut net = Network::standard(&[2, 3, 1]).unwrap();
        net.set_activation_hidden(Activation::SigmoidSymmetricStepwise);
        net.set_activation_output(Activation::SigmoidSymmetricStepwise);
        net.randomize_weights(-1., 1.);
        net
    }

    fn data() -> TrainData {
        TrainData::from_slices(
            &[&[-1., -1.], &[-1., 1.], &[1., -1.], &[1., 1.]],
            &[&[-1.], &[1.], &[1.], &[-1.]],
        )
        .unwrap()
    }

    #[test]
    fn decimal_point_leaves_headroom() {
        assert_eq!(bits_for(0.5), 0);
        assert_eq!(bits_for(1.), 1);
        assert_eq!(bits_for(3.), 2);
        let mut n = net();
        let (fixed, report) = n.to_fixed(Some(&data())).unwrap();
        assert!(!report.precision_loss);
        assert_eq!(fixed.multiplier(), 1 << report.decimal_point);
        assert_eq!(report.decimal_point as i32, (VALUE_BITS - bits_for(report.max_magnitude)) / 2);
    }

    #[test]
    fn fixed_output_tracks_float() {
        let mut n = net();
        let data = data();
        let (mut fixed, _) = n.to_fixed(Some(&data)).unwrap();
        for i in 0..data.len() {
            let expected = n.run(data.input(i)).unwrap()[0];
            let got = fixed.run_float(data.input(i)).unwrap()[0];
            assert!((expected - got).abs() < 0.01, "{} vs {}", expected, got);
        }
        assert_eq!(fixed.overflows(), 0);
    }

    #[test]
    fn huge_weights_overflow() {
        let mut n = net();
        let mut w = n.weights().to_vec();
        w[0] = 1e10;
        n.set_weight_array(&w).unwrap();
        let err = n.to_fixed(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
    }

    #[test]
    fn rejects_smooth_only_activations() {
        let mut n = net();
        n.set_activation_output(Activation::Gaussian);
        assert_eq!(n.to_fixed(None).unwrap_err().kind(), ErrorKind::InvalidTopology);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixed.json");
        let mut n = net();
        let report = n.save_fixed(&path, None).unwrap();
        let mut loaded = FixedNetwork::from_file(&path).unwrap();
        assert_eq!(loaded.decimal_point(), report.decimal_point);
        let (mut direct, _) = n.to_fixed(None).unwrap();
        let input = [loaded.multiplier() / 2, -loaded.multiplier()];
        let a = direct.run(&input).unwrap().to_vec();
        assert_eq!(loaded.run(&input).unwrap(), &a[..]);
    }
}
