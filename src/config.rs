use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::a_funcs::Activation;
use crate::error::{Error, Result};
use crate::loss_funcs::{ErrorFunc, StopFunc};

/// The algorithm used by [`Network::train_on_data`](crate::network::Network::train_on_data).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingAlgorithm {
    /// Standard backpropagation, weights are updated after every pattern.
    Incremental,
    /// Standard backpropagation, weights are updated once per epoch.
    Batch,
    /// iRPROP-, adaptive per-weight step sizes. Ignores the learning rate.
    Rprop,
    /// Quickprop, uses a parabola through the last two slopes.
    Quickprop,
    /// RPROP with weight decay and simulated annealing noise.
    Sarprop,
}

impl Default for TrainingAlgorithm {
    fn default() -> Self {
        TrainingAlgorithm::Rprop
    }
}

impl TrainingAlgorithm {
    /// Whether the algorithm can drive cascade training.
    pub fn supports_cascade(self) -> bool {
        matches!(
            self,
            TrainingAlgorithm::Rprop | TrainingAlgorithm::Quickprop | TrainingAlgorithm::Sarprop
        )
    }
}

/// Parameters of the gradient trainers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainParams {
    pub algorithm: TrainingAlgorithm,
    pub error_func: ErrorFunc,
    pub stop_func: StopFunc,
    pub bit_fail_limit: f32,

    pub learning_rate: f32,
    pub learning_momentum: f32,

    pub quickprop_decay: f32,
    pub quickprop_mu: f32,

    pub rprop_increase_factor: f32,
    pub rprop_decrease_factor: f32,
    pub rprop_delta_min: f32,
    pub rprop_delta_max: f32,
    pub rprop_delta_zero: f32,

    pub sarprop_weight_decay_shift: f32,
    pub sarprop_step_error_threshold_factor: f32,
    pub sarprop_step_error_shift: f32,
    pub sarprop_temperature: f32,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            algorithm: TrainingAlgorithm::Rprop,
            error_func: ErrorFunc::Tanh,
            stop_func: StopFunc::Mse,
            bit_fail_limit: 0.35,
            learning_rate: 0.7,
            learning_momentum: 0.,
            quickprop_decay: -0.0001,
            quickprop_mu: 1.75,
            rprop_increase_factor: 1.2,
            rprop_decrease_factor: 0.5,
            rprop_delta_min: 0.,
            rprop_delta_max: 50.,
            rprop_delta_zero: 0.1,
            sarprop_weight_decay_shift: -6.644,
            sarprop_step_error_threshold_factor: 0.1,
            sarprop_step_error_shift: 1.385,
            sarprop_temperature: 0.015,
        }
    }
}

impl TrainParams {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn algorithm(mut self, algorithm: TrainingAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn error_func(mut self, error_func: ErrorFunc) -> Self {
        self.error_func = error_func;
        self
    }

    pub fn stop_func(mut self, stop_func: StopFunc) -> Self {
        self.stop_func = stop_func;
        self
    }

    pub fn bit_fail_limit(mut self, limit: f32) -> Self {
        self.bit_fail_limit = limit;
        self
    }

    pub fn learning_rate(mut self, rate: f32) -> Self {
        self.learning_rate = rate;
        self
    }

    pub fn learning_momentum(mut self, momentum: f32) -> Self {
        self.learning_momentum = momentum;
        self
    }

    /// Checks that the step size bounds and factors are usable.
    pub fn validate(&self) -> Result<()> {
        if self.rprop_delta_min > self.rprop_delta_max {
            return Err(Error::InvalidParameter(format!(
                "rprop_delta_min ({}) is larger than rprop_delta_max ({})",
                self.rprop_delta_min, self.rprop_delta_max
            )));
        }
        if self.rprop_increase_factor < 1. || self.rprop_decrease_factor > 1. {
            return Err(Error::InvalidParameter(format!(
                "rprop factors must grow and shrink the step, received increase {} and decrease {}",
                self.rprop_increase_factor, self.rprop_decrease_factor
            )));
        }
        Ok(())
    }

    /// Load parameters from a standalone JSON file. Missing fields take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&s)?;
        params.validate()?;
        Ok(params)
    }
}

/// Parameters of cascade correlation training.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeParams {
    pub output_change_fraction: f32,
    pub output_stagnation_epochs: usize,
    pub candidate_change_fraction: f32,
    pub candidate_stagnation_epochs: usize,
    pub weight_multiplier: f32,
    pub candidate_limit: f32,
    pub max_out_epochs: usize,
    pub min_out_epochs: usize,
    pub max_cand_epochs: usize,
    pub min_cand_epochs: usize,
    pub activation_functions: Vec<Activation>,
    pub activation_steepnesses: Vec<f32>,
    pub num_candidate_groups: usize,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            output_change_fraction: 0.01,
            output_stagnation_epochs: 12,
            candidate_change_fraction: 0.01,
            candidate_stagnation_epochs: 12,
            weight_multiplier: 0.4,
            candidate_limit: 1000.,
            max_out_epochs: 150,
            min_out_epochs: 50,
            max_cand_epochs: 150,
            min_cand_epochs: 50,
            activation_functions: vec![
                Activation::Sigmoid,
                Activation::SigmoidSymmetric,
                Activation::Gaussian,
                Activation::GaussianSymmetric,
                Activation::Elliot,
                Activation::ElliotSymmetric,
                Activation::SinSymmetric,
                Activation::CosSymmetric,
                Activation::Sin,
                Activation::Cos,
            ],
            activation_steepnesses: vec![0.25, 0.5, 0.75, 1.],
            num_candidate_groups: 2,
        }
    }
}

impl CascadeParams {
    pub fn new() -> Self {
        Default::default()
    }

    /// Number of candidates trained in every candidate phase.
    pub fn num_candidates(&self) -> usize {
        self.activation_functions.len()
            * self.activation_steepnesses.len()
            * self.num_candidate_groups
    }

    pub fn max_out_epochs(mut self, epochs: usize) -> Self {
        self.max_out_epochs = epochs;
        self
    }

    pub fn min_out_epochs(mut self, epochs: usize) -> Self {
        self.min_out_epochs = epochs;
        self
    }

    pub fn max_cand_epochs(mut self, epochs: usize) -> Self {
        self.max_cand_epochs = epochs;
        self
    }

    pub fn min_cand_epochs(mut self, epochs: usize) -> Self {
        self.min_cand_epochs = epochs;
        self
    }

    pub fn activation_functions(mut self, functions: Vec<Activation>) -> Self {
        self.activation_functions = functions;
        self
    }

    pub fn activation_steepnesses(mut self, steepnesses: Vec<f32>) -> Self {
        self.activation_steepnesses = steepnesses;
        self
    }

    pub fn num_candidate_groups(mut self, groups: usize) -> Self {
        self.num_candidate_groups = groups;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_candidates() == 0 {
            return Err(Error::InvalidParameter(
                "cascade training needs at least one activation function, steepness and candidate group"
                    .to_owned(),
            ));
        }
        if let Some(a) = self.activation_functions.iter().find(|a| !a.is_trainable()) {
            return Err(Error::Untrainable(*a));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = TrainParams::default();
        assert_eq!(p.algorithm, TrainingAlgorithm::Rprop);
        assert_eq!(p.error_func, ErrorFunc::Tanh);
        assert_eq!(p.rprop_delta_max, 50.);
        assert!(p.validate().is_ok());

        let c = CascadeParams::default();
        assert_eq!(c.num_candidates(), 10 * 4 * 2);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let p: TrainParams = serde_json::from_str(r#"{"learning_rate": 0.2}"#).unwrap();
        assert_eq!(p.learning_rate, 0.2);
        assert_eq!(p.quickprop_mu, 1.75);
    }

    #[test]
    fn rejects_inverted_deltas() {
        let mut p = TrainParams::default();
        p.rprop_delta_min = 10.;
        p.rprop_delta_max = 1.;
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_threshold_candidates() {
        let c = CascadeParams::default().activation_functions(vec![Activation::Threshold]);
        assert!(c.validate().is_err());
    }
}
