pub use gradient_descent::{Batch, Incremental};
pub mod gradient_descent;

pub use quickprop::Quickprop;
pub mod quickprop;

pub use rprop::{Rprop, Sarprop};
pub mod rprop;

use enum_dispatch::enum_dispatch;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::{TrainParams, TrainingAlgorithm};

/// Weights are never moved beyond this magnitude by the adaptive algorithms.
pub const MAX_WEIGHT: f32 = 1500.;

pub(crate) fn clamp_weight(w: f32) -> f32 {
    w.max(-MAX_WEIGHT).min(MAX_WEIGHT)
}

/// Per weight history an optimizer works on. Slopes point downhill, they are
/// the negated gradient of the error accumulated since the last update.
pub struct Slopes<'a> {
    pub slopes: &'a mut [f32],
    pub prev_steps: &'a mut [f32],
    pub prev_slopes: &'a mut [f32],
}

/// Facts about the epoch an update concludes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpochInfo {
    /// Patterns that contributed to the slopes.
    pub num_data: usize,
    /// Error of the epoch.
    pub mse: f32,
    /// Number of updates performed before this one.
    pub epoch: u32,
}

/// This trait provides the interface every training algorithm implements.
#[enum_dispatch]
pub trait OptimizerAlg {
    /// Moves the weights along the slopes and clears the slopes afterwards.
    fn update_weights(&mut self, weights: &mut [f32], state: Slopes<'_>, info: &EpochInfo);
}

#[enum_dispatch(OptimizerAlg)]
#[derive(Clone, Debug)]
pub enum Optimizer {
    Incremental,
    Batch,
    Rprop,
    Quickprop,
    Sarprop,
}

impl Optimizer {
    /// The optimizer configured by `params`. SARPROP draws its noise from a
    /// generator seeded by `rng`.
    pub fn from_params(params: &TrainParams, rng: &mut SmallRng) -> Self {
        match params.algorithm {
            TrainingAlgorithm::Incremental => {
                Incremental::new(params.learning_rate, params.learning_momentum).into()
            }
            TrainingAlgorithm::Batch => Batch::new(params.learning_rate).into(),
            TrainingAlgorithm::Rprop => Rprop {
                increase_factor: params.rprop_increase_factor,
                decrease_factor: params.rprop_decrease_factor,
                delta_min: params.rprop_delta_min,
                delta_max: params.rprop_delta_max,
            }
            .into(),
            TrainingAlgorithm::Quickprop => Quickprop {
                learning_rate: params.learning_rate,
                decay: params.quickprop_decay,
                mu: params.quickprop_mu,
            }
            .into(),
            TrainingAlgorithm::Sarprop => Sarprop {
                increase_factor: params.rprop_increase_factor,
                decrease_factor: params.rprop_decrease_factor,
                delta_max: params.rprop_delta_max,
                weight_decay_shift: params.sarprop_weight_decay_shift,
                step_error_threshold_factor: params.sarprop_step_error_threshold_factor,
                step_error_shift: params.sarprop_step_error_shift,
                temperature: params.sarprop_temperature,
                rng: SmallRng::seed_from_u64(rng.gen()),
            }
            .into(),
        }
    }
}

/// Buffers carried between training steps.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainState {
    pub(crate) algorithm: TrainingAlgorithm,
    /// Error signal of every neuron for the current pattern.
    pub(crate) errors: Vec<f32>,
    pub(crate) slopes: Vec<f32>,
    pub(crate) prev_steps: Vec<f32>,
    pub(crate) prev_slopes: Vec<f32>,
    /// Completed SARPROP epochs.
    pub(crate) epoch: u32,
}

impl TrainState {
    pub fn new(params: &TrainParams, num_neurons: usize, num_weights: usize) -> Self {
        Self {
            algorithm: params.algorithm,
            errors: vec![0.; num_neurons],
            slopes: vec![0.; num_weights],
            prev_steps: vec![initial_step(params); num_weights],
            prev_slopes: vec![0.; num_weights],
            epoch: 0,
        }
    }

    /// Whether the buffers still fit a network of the given size trained with `params`.
    pub fn fits(&self, params: &TrainParams, num_neurons: usize, num_weights: usize) -> bool {
        self.algorithm == params.algorithm
            && self.errors.len() == num_neurons
            && self.slopes.len() == num_weights
    }

    pub fn slopes(&self) -> &[f32] {
        &self.slopes
    }

    pub fn prev_steps(&self) -> &[f32] {
        &self.prev_steps
    }

    pub(crate) fn split(&mut self) -> (&mut [f32], Slopes<'_>) {
        (
            &mut self.errors,
            Slopes {
                slopes: &mut self.slopes,
                prev_steps: &mut self.prev_steps,
                prev_slopes: &mut self.prev_slopes,
            },
        )
    }
}

/// Step size a fresh weight history starts from.
pub(crate) fn initial_step(params: &TrainParams) -> f32 {
    match params.algorithm {
        TrainingAlgorithm::Rprop | TrainingAlgorithm::Sarprop => params.rprop_delta_zero,
        _ => 0.,
    }
}
