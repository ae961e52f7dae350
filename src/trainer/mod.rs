use std::path::Path;

use crate::config::TrainingAlgorithm;
use crate::error::{Error, Result};
use crate::network::Network;
use crate::optimizer::{EpochInfo, Optimizer, OptimizerAlg, Slopes, TrainState};
use crate::storage::TrainData;

pub mod logger;

/// Closure invoked instead of the log report while training. Returning
/// [`ABORT`] stops training.
pub type TrainCallback = Box<dyn FnMut(&Network, &TrainData, &EpochReport) -> i32>;

/// Callback return value that stops training.
pub const ABORT: i32 = -1;

/// Progress of a training run, handed to the callback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpochReport {
    pub max_epochs: usize,
    pub epochs_between_reports: usize,
    pub desired_error: f32,
    pub epoch: usize,
    pub mse: f32,
    pub bit_fail: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The stop function reached the desired error.
    DesiredError,
    MaxEpochs,
    /// The callback returned [`ABORT`].
    Aborted,
}

/// Result of [`Network::train_on_data`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainOutcome {
    pub epochs: usize,
    pub mse: f32,
    pub bit_fail: usize,
    pub reason: StopReason,
}

impl Network {
    /// Fails if any neuron fed by a connection uses an activation function
    /// without a usable derivative.
    pub(crate) fn check_trainable(&self) -> Result<()> {
        let first = self.layers[1].first;
        match self.neurons[first..].iter().find(|n| !n.activation().is_trainable()) {
            Some(n) => Err(Error::Untrainable(n.activation())),
            None => Ok(()),
        }
    }

    pub(crate) fn check_data(&self, data: &TrainData) -> Result<()> {
        if data.num_input() != self.num_input() {
            return Err(Error::dims(self.num_input(), data.num_input()));
        }
        if data.num_output() != self.num_output() {
            return Err(Error::dims(self.num_output(), data.num_output()));
        }
        Ok(())
    }

    fn check_pattern(&self, input: &[f32], desired: &[f32]) -> Result<()> {
        if input.len() != self.num_input() {
            return Err(Error::dims(self.num_input(), input.len()));
        }
        if desired.len() != self.num_output() {
            return Err(Error::dims(self.num_output(), desired.len()));
        }
        Ok(())
    }

    /// Takes the training buffers out of the network, creating fresh ones when
    /// the algorithm or the topology changed since they were made.
    pub(crate) fn take_state(&mut self) -> TrainState {
        match self.train.take() {
            Some(s) if s.fits(&self.params, self.neurons.len(), self.weights.len()) => s,
            _ => TrainState::new(&self.params, self.neurons.len(), self.weights.len()),
        }
    }

    /// Runs `input` and records its error against `desired` without training.
    pub fn test(&mut self, input: &[f32], desired: &[f32]) -> Result<&[f32]> {
        self.check_pattern(input, desired)?;
        self.forward(input);
        let limit = self.params.bit_fail_limit;
        for (n, d) in self.layers[self.layers.len() - 1].neurons().zip(desired) {
            let neuron = &self.neurons[n];
            self.mse.update(neuron.activation(), d - neuron.value(), limit);
        }
        Ok(&self.output)
    }

    /// Mean square error over `data` without training. Resets the error first.
    pub fn test_data(&mut self, data: &TrainData) -> Result<f32> {
        self.check_data(data)?;
        self.reset_mse();
        for i in 0..data.len() {
            self.test(data.input(i), data.output(i))?;
        }
        Ok(self.mse())
    }

    /// A single incremental backpropagation step on one pattern.
    pub fn train(&mut self, input: &[f32], desired: &[f32]) -> Result<()> {
        self.check_pattern(input, desired)?;
        self.check_trainable()?;

        let mut params = self.params.clone();
        params.algorithm = TrainingAlgorithm::Incremental;
        let mut state = match self.train.take() {
            Some(s) if s.fits(&params, self.neurons.len(), self.weights.len()) => s,
            _ => TrainState::new(&params, self.neurons.len(), self.weights.len()),
        };
        let mut optimizer = Optimizer::from_params(&params, &mut self.rng);
        self.forward(input);
        self.learn_pattern(desired, &mut state, 1);
        self.step(&mut optimizer, &mut state, 0, 1);
        self.train = Some(state);
        Ok(())
    }

    /// One epoch over `data` with the configured algorithm. Returns the MSE of the epoch.
    pub fn train_epoch(&mut self, data: &TrainData) -> Result<f32> {
        self.check_data(data)?;
        self.check_trainable()?;
        Ok(self.epoch_from(data, 1))
    }

    /// Error and slopes of the pattern whose forward pass just ran, for the
    /// connections feeding the layers from `first_layer` on.
    fn learn_pattern(&mut self, desired: &[f32], state: &mut TrainState, first_layer: usize) {
        let (errors, slopes) = state.split();
        self.compute_errors(desired, errors);
        if first_layer + 1 < self.layers.len() {
            self.backpropagate(errors);
        }
        self.update_slopes(errors, slopes.slopes, first_layer);
    }

    /// Applies the optimizer to the weights feeding the layers from `first_layer` on.
    fn step(&mut self, optimizer: &mut Optimizer, state: &mut TrainState, first_layer: usize, num_data: usize) {
        let first_con = self.neurons[self.layers[first_layer].first].first_con;
        let info = EpochInfo {
            num_data,
            mse: self.mse.mse(),
            epoch: state.epoch,
        };
        let slopes = Slopes {
            slopes: &mut state.slopes[first_con..],
            prev_steps: &mut state.prev_steps[first_con..],
            prev_slopes: &mut state.prev_slopes[first_con..],
        };
        optimizer.update_weights(&mut self.weights[first_con..], slopes, &info);
    }

    /// One epoch training only the connections that feed the layers from
    /// `first_layer` on. Inputs must already have been checked.
    pub(crate) fn epoch_from(&mut self, data: &TrainData, first_layer: usize) -> f32 {
        self.reset_mse();
        let mut state = self.take_state();
        let mut optimizer = Optimizer::from_params(&self.params, &mut self.rng);

        if self.params.algorithm == TrainingAlgorithm::Incremental {
            for i in 0..data.len() {
                self.forward(data.input(i));
                self.learn_pattern(data.output(i), &mut state, first_layer);
                self.step(&mut optimizer, &mut state, first_layer, 1);
            }
        } else {
            for i in 0..data.len() {
                self.forward(data.input(i));
                self.learn_pattern(data.output(i), &mut state, first_layer);
            }
            self.step(&mut optimizer, &mut state, first_layer, data.len());
            state.epoch += 1;
        }

        self.train = Some(state);
        self.mse()
    }

    /// Hands `report` to the callback, or logs it when none is set.
    pub(crate) fn report(&mut self, data: &TrainData, report: &EpochReport) -> i32 {
        match self.callback.take() {
            Some(mut callback) => {
                let ret = callback(self, data, report);
                self.callback.get_or_insert(callback);
                ret
            }
            None => {
                logger::epoch(report);
                0
            }
        }
    }

    /// Trains on `data` for at most `max_epochs` epochs or until the stop
    /// function reaches `desired_error`. Progress is reported every
    /// `epochs_between_reports` epochs, never if it is zero.
    pub fn train_on_data(
        &mut self,
        data: &TrainData,
        max_epochs: usize,
        epochs_between_reports: usize,
        desired_error: f32,
    ) -> Result<TrainOutcome> {
        self.check_data(data)?;
        self.check_trainable()?;
        self.params.validate()?;

        if epochs_between_reports > 0 && self.callback.is_none() {
            logger::start(max_epochs, desired_error);
        }

        let mut outcome = TrainOutcome {
            epochs: 0,
            mse: self.mse(),
            bit_fail: self.bit_fail(),
            reason: StopReason::MaxEpochs,
        };
        for epoch in 1..=max_epochs {
            self.epoch_from(data, 1);
            let reached = self.mse.reached(self.params.stop_func, desired_error);
            outcome.epochs = epoch;
            outcome.mse = self.mse();
            outcome.bit_fail = self.bit_fail();

            if epochs_between_reports > 0
                && (epoch % epochs_between_reports == 0 || epoch == max_epochs || epoch == 1 || reached)
            {
                let report = EpochReport {
                    max_epochs,
                    epochs_between_reports,
                    desired_error,
                    epoch,
                    mse: outcome.mse,
                    bit_fail: outcome.bit_fail,
                };
                if self.report(data, &report) == ABORT {
                    outcome.reason = StopReason::Aborted;
                    break;
                }
            }
            if reached {
                outcome.reason = StopReason::DesiredError;
                break;
            }
        }
        Ok(outcome)
    }

    /// Loads a training data file and trains on it, see [`train_on_data`](Self::train_on_data).
    pub fn train_on_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        max_epochs: usize,
        epochs_between_reports: usize,
        desired_error: f32,
    ) -> Result<TrainOutcome> {
        let data = TrainData::from_file(path)?;
        self.train_on_data(&data, max_epochs, epochs_between_reports, desired_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a_funcs::Activation;
    use crate::loss_funcs::ErrorFunc;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn and_data() -> TrainData {
        TrainData::from_slices(
            &[&[0., 0.], &[0., 1.], &[1., 0.], &[1., 1.]],
            &[&[0.], &[0.], &[0.], &[1.]],
        )
        .unwrap()
    }

    #[test]
    fn rejects_threshold_networks() {
        let mut net = Network::standard(&[2, 1]).unwrap();
        net.set_activation_output(Activation::Threshold);
        let err = net.train_on_data(&and_data(), 10, 0, 0.01).unwrap_err();
        assert!(matches!(err, Error::Untrainable(Activation::Threshold)));
    }

    #[test]
    fn rejects_mismatched_data() {
        let mut net = Network::standard(&[3, 1]).unwrap();
        assert!(net.train_on_data(&and_data(), 10, 0, 0.01).is_err());
        assert!(net.train(&[0., 1.], &[1.]).is_err());
    }

    #[test]
    fn test_does_not_train() {
        let mut net = Network::standard(&[2, 2, 1]).unwrap();
        let before = net.weights().to_vec();
        let mse = net.test_data(&and_data()).unwrap();
        assert!(mse > 0.);
        assert_eq!(net.weights(), &before[..]);
    }

    #[test]
    fn every_algorithm_lowers_the_error() {
        for algorithm in [
            TrainingAlgorithm::Incremental,
            TrainingAlgorithm::Batch,
            TrainingAlgorithm::Rprop,
            TrainingAlgorithm::Quickprop,
            TrainingAlgorithm::Sarprop,
        ] {
            let data = and_data();
            let mut net = Network::standard(&[2, 3, 1]).unwrap();
            net.set_activation_output(Activation::Sigmoid);
            net.params_mut().algorithm = algorithm;
            net.params_mut().error_func = ErrorFunc::Linear;
            let start = net.test_data(&data).unwrap();
            net.train_on_data(&data, 300, 0, 0.).unwrap();
            let end = net.test_data(&data).unwrap();
            assert!(end < start, "{:?}: {} -> {}", algorithm, start, end);
        }
    }

    #[test]
    fn callback_can_abort() {
        let mut net = Network::standard(&[2, 2, 1]).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        net.set_callback(move |_, _, report| {
            log.borrow_mut().push(report.epoch);
            if report.epoch >= 3 {
                ABORT
            } else {
                0
            }
        });
        let outcome = net.train_on_data(&and_data(), 100, 1, 0.).unwrap();
        assert_eq!(outcome.reason, StopReason::Aborted);
        assert_eq!(outcome.epochs, 3);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
        assert!(net.has_callback());
    }

    #[test]
    fn reports_on_schedule() {
        let mut net = Network::standard(&[2, 2, 1]).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        net.set_callback(move |_, _, report| {
            log.borrow_mut().push(report.epoch);
            0
        });
        let outcome = net.train_on_data(&and_data(), 25, 10, 0.).unwrap();
        assert_eq!(outcome.reason, StopReason::MaxEpochs);
        assert_eq!(*seen.borrow(), vec![1, 10, 20, 25]);
    }

    #[test]
    fn algorithm_change_resets_state() {
        let data = and_data();
        let mut net = Network::standard(&[2, 2, 1]).unwrap();
        net.train_epoch(&data).unwrap();
        net.params_mut().algorithm = TrainingAlgorithm::Quickprop;
        net.train_epoch(&data).unwrap();
        assert_eq!(net.train.as_ref().map(|s| s.algorithm), Some(TrainingAlgorithm::Quickprop));
    }
}
