//! Cascade correlation: grows a shortcut network one hidden neuron at a time.
//!
//! Every round trains the output connections until they stagnate, then trains
//! a pool of candidate neurons to correlate with the remaining output error and
//! installs the best one as a new single neuron layer in front of the outputs.

use std::path::Path;

use crate::a_funcs::{Activation, MAX_SUM};
use crate::error::{Error, Result};
use crate::initializer;
use crate::network::{Network, NetworkType};
use crate::optimizer::{initial_step, EpochInfo, Optimizer, OptimizerAlg, Slopes};
use crate::storage::TrainData;
use crate::trainer::{logger, EpochReport, StopReason, ABORT};

/// What a cascade training run did.
#[derive(Clone, Debug, PartialEq)]
pub struct CascadeSummary {
    pub neurons_added: usize,
    /// Epochs of every output training phase, the final one included.
    pub output_epochs: Vec<usize>,
    /// Epochs of every candidate training phase.
    pub candidate_epochs: Vec<usize>,
    pub mse: f32,
    pub bit_fail: usize,
    pub reason: StopReason,
}

impl CascadeSummary {
    pub fn total_epochs(&self) -> usize {
        self.output_epochs.iter().chain(&self.candidate_epochs).sum()
    }
}

/// The pool of candidate neurons. Every candidate owns `num_in` input weights
/// followed by `num_out` output weights in the flat arrays.
#[derive(Debug)]
struct Candidates {
    kinds: Vec<(Activation, f32)>,
    num_in: usize,
    num_out: usize,
    weights: Vec<f32>,
    slopes: Vec<f32>,
    prev_steps: Vec<f32>,
    prev_slopes: Vec<f32>,
    scores: Vec<f32>,
    epoch: u32,
}

impl Candidates {
    fn stride(&self) -> usize {
        self.num_in + self.num_out
    }

    fn best(&self) -> (usize, f32) {
        self.scores
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, s)| if s > best.1 { (i, s) } else { best })
    }
}

/// Stagnation tracking shared by the output and candidate phases. A phase
/// stagnates when its value did not leave the band around the last goal
/// within `window` epochs.
struct Stagnation {
    target: f32,
    backslide: f32,
    deadline: usize,
    fraction: f32,
    window: usize,
}

impl Stagnation {
    fn new(fraction: f32, window: usize, max_epochs: usize) -> Self {
        Self {
            target: 0.,
            backslide: -1e20,
            deadline: max_epochs,
            fraction,
            window,
        }
    }

    /// Records the value of `epoch` and returns whether the phase stagnated.
    fn update(&mut self, epoch: usize, value: f32) -> bool {
        let moved = if self.target >= 0. {
            value > self.target || value < self.backslide
        } else {
            value < self.target || value > self.backslide
        };
        if moved {
            self.target = value * (1. + self.fraction);
            self.backslide = value * (1. - self.fraction);
            self.deadline = epoch + self.window;
        }
        epoch >= self.deadline
    }
}

impl Network {
    /// Grows hidden neurons until the stop function reaches `desired_error` or
    /// the network has `max_neurons` hidden neurons. Requires a shortcut
    /// network without hidden layers and the RPROP, Quickprop or SARPROP
    /// algorithm.
    pub fn cascade_train_on_data(
        &mut self,
        data: &TrainData,
        max_neurons: usize,
        neurons_between_reports: usize,
        desired_error: f32,
    ) -> Result<CascadeSummary> {
        if self.kind != NetworkType::Shortcut {
            return Err(Error::topology("cascade training needs a shortcut network"));
        }
        if self.num_layers() > 2 {
            return Err(Error::topology(
                "cascade training starts from a network without hidden layers",
            ));
        }
        if !self.params.algorithm.supports_cascade() {
            return Err(Error::topology(format!(
                "cascade training cannot use the {:?} algorithm",
                self.params.algorithm
            )));
        }
        self.check_data(data)?;
        self.check_trainable()?;
        self.params.validate()?;
        self.cascade.validate()?;

        if neurons_between_reports > 0 && self.callback.is_none() {
            logger::cascade_start(max_neurons, desired_error);
        }

        let mut summary = CascadeSummary {
            neurons_added: 0,
            output_epochs: Vec::new(),
            candidate_epochs: Vec::new(),
            mse: 0.,
            bit_fail: 0,
            reason: StopReason::MaxEpochs,
        };

        for round in 1.. {
            summary.output_epochs.push(self.train_outputs(data, desired_error));
            let reached = self.mse.reached(self.params.stop_func, desired_error);
            let full = self.num_hidden() >= max_neurons;

            if neurons_between_reports > 0
                && (round % neurons_between_reports == 0 || round == 1 || reached || full)
            {
                let report = EpochReport {
                    max_epochs: max_neurons,
                    epochs_between_reports: neurons_between_reports,
                    desired_error,
                    epoch: self.num_hidden(),
                    mse: self.mse(),
                    bit_fail: self.bit_fail(),
                };
                let ret = match self.callback.take() {
                    Some(mut callback) => {
                        let ret = callback(self, data, &report);
                        self.callback.get_or_insert(callback);
                        ret
                    }
                    None => {
                        logger::cascade_neuron(&report, summary.total_epochs());
                        0
                    }
                };
                if ret == ABORT {
                    summary.reason = StopReason::Aborted;
                    break;
                }
            }
            if reached {
                summary.reason = StopReason::DesiredError;
                break;
            }
            if full {
                break;
            }

            let mut candidates = self.init_candidates();
            summary.candidate_epochs.push(self.train_candidates(data, &mut candidates));
            self.install_candidate(&candidates);
            summary.neurons_added += 1;
        }

        // one last pass over the outputs without a desired error
        summary.output_epochs.push(self.train_outputs(data, 0.));
        summary.mse = self.mse();
        summary.bit_fail = self.bit_fail();

        log::info!(
            "Cascade training added {} neuron(s) in {} epochs, error {:.10}",
            summary.neurons_added,
            summary.total_epochs(),
            summary.mse
        );
        Ok(summary)
    }

    /// Loads a training data file and grows the network on it, see
    /// [`cascade_train_on_data`](Self::cascade_train_on_data).
    pub fn cascade_train_on_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        max_neurons: usize,
        neurons_between_reports: usize,
        desired_error: f32,
    ) -> Result<CascadeSummary> {
        let data = TrainData::from_file(path)?;
        self.cascade_train_on_data(&data, max_neurons, neurons_between_reports, desired_error)
    }

    /// Trains only the connections into the output layer. Returns the epochs used.
    fn train_outputs(&mut self, data: &TrainData, desired_error: f32) -> usize {
        let max_epochs = self.cascade.max_out_epochs;
        if max_epochs == 0 {
            return 0;
        }
        let out_layer = self.layers.len() - 1;
        self.train = None;

        let initial = self.epoch_from(data, out_layer);
        if self.mse.reached(self.params.stop_func, desired_error) {
            return 1;
        }

        let mut stagnation = Stagnation::new(
            self.cascade.output_change_fraction,
            self.cascade.output_stagnation_epochs,
            max_epochs,
        );
        for i in 1..max_epochs {
            let error = self.epoch_from(data, out_layer);
            if self.mse.reached(self.params.stop_func, desired_error) {
                return i + 1;
            }
            if stagnation.update(i, initial - error) && i >= self.cascade.min_out_epochs {
                return i + 1;
            }
        }
        max_epochs
    }

    fn init_candidates(&mut self) -> Candidates {
        let num_in = self.output_layer().first;
        let num_out = self.num_output();
        let params = &self.cascade;

        let (afs, steeps) = (&params.activation_functions, &params.activation_steepnesses);
        let kinds: Vec<(Activation, f32)> = (0..params.num_candidates())
            .map(|i| (afs[i % afs.len()], steeps[(i / afs.len()) % steeps.len()]))
            .collect();

        let scale = (2. * (0.7 * self.num_hidden() as f32).powf(1. / self.num_input() as f32))
            .max(0.5)
            .min(8.);
        let len = kinds.len() * (num_in + num_out);
        let mut weights = vec![0.; len];
        initializer::uniform(&mut self.rng, &mut weights, -scale, scale);

        log::debug!(
            "Training {} candidates with {} inputs, initial weights in ±{}",
            kinds.len(),
            num_in,
            scale
        );

        Candidates {
            scores: vec![0.; kinds.len()],
            kinds,
            num_in,
            num_out,
            weights,
            slopes: vec![0.; len],
            prev_steps: vec![initial_step(&self.params); len],
            prev_slopes: vec![0.; len],
            epoch: 0,
        }
    }

    /// Trains the candidate pool. Returns the epochs used.
    fn train_candidates(&mut self, data: &TrainData, cands: &mut Candidates) -> usize {
        let max_epochs = self.cascade.max_cand_epochs;
        let residual = self.mse.sum;
        let mut optimizer = Optimizer::from_params(&self.params, &mut self.rng);
        let mut stagnation = Stagnation::new(
            self.cascade.candidate_change_fraction,
            self.cascade.candidate_stagnation_epochs,
            max_epochs,
        );

        for i in 0..max_epochs {
            let best = self.candidate_epoch(data, cands, &mut optimizer);
            if residual > 0. && best / residual > self.cascade.candidate_limit {
                return i + 1;
            }
            if stagnation.update(i, best) && i >= self.cascade.min_cand_epochs {
                return i + 1;
            }
        }
        max_epochs
    }

    /// One epoch over the candidate pool. Returns the best score.
    fn candidate_epoch(&mut self, data: &TrainData, cands: &mut Candidates, optimizer: &mut Optimizer) -> f32 {
        let residual = self.mse.sum;
        cands.scores.iter_mut().for_each(|s| *s = residual);

        let out = self.output_layer().neurons();
        let stride = cands.stride();
        let mut values = vec![0.; cands.num_in];
        let mut errors = vec![0.; cands.num_out];

        for p in 0..data.len() {
            self.forward(data.input(p));
            for (v, n) in values.iter_mut().zip(&self.neurons) {
                *v = n.value;
            }
            for ((e, n), d) in errors.iter_mut().zip(&self.neurons[out.clone()]).zip(data.output(p)) {
                let diff = d - n.value;
                *e = if n.activation.is_symmetric() { diff / 2. } else { diff };
            }

            for (c, &(activation, steepness)) in cands.kinds.iter().enumerate() {
                let base = c * stride;
                let (w_in, w_out) = cands.weights[base..base + stride].split_at(cands.num_in);
                let (s_in, s_out) = cands.slopes[base..base + stride].split_at_mut(cands.num_in);

                let sum: f32 = w_in.iter().zip(&values).map(|(w, v)| w * v).sum();
                let sum = (sum * steepness).max(-MAX_SUM).min(MAX_SUM);
                let a = activation.evaluate(sum);

                let mut error_value = 0.;
                let mut score = cands.scores[c];
                for ((w, s), e) in w_out.iter().zip(s_out.iter_mut()).zip(&errors) {
                    let diff = a * w - e;
                    *s -= 2. * diff * a;
                    error_value += diff * w;
                    score -= diff * diff;
                }
                cands.scores[c] = score;

                error_value *= activation.derivative(steepness, a, sum);
                for (s, v) in s_in.iter_mut().zip(&values) {
                    *s -= error_value * v;
                }
            }
        }

        let info = EpochInfo {
            num_data: data.len(),
            mse: self.mse(),
            epoch: cands.epoch,
        };
        optimizer.update_weights(
            &mut cands.weights,
            Slopes {
                slopes: &mut cands.slopes,
                prev_steps: &mut cands.prev_steps,
                prev_slopes: &mut cands.prev_slopes,
            },
            &info,
        );
        cands.epoch += 1;
        cands.best().1
    }

    fn install_candidate(&mut self, cands: &Candidates) {
        let (best, score) = cands.best();
        let (activation, steepness) = cands.kinds[best];
        let base = best * cands.stride();
        let (w_in, w_out) = cands.weights[base..base + cands.stride()].split_at(cands.num_in);
        let multiplier = self.cascade.weight_multiplier;
        let w_out: Vec<f32> = w_out.iter().map(|w| w * multiplier).collect();

        log::debug!(
            "Installing candidate {} ({:?}, steepness {}) with score {}",
            best,
            activation,
            steepness,
            score
        );
        self.insert_hidden_neuron(activation, steepness, w_in, &w_out);
    }
}
