use serde::{Deserialize, Serialize};

use crate::a_funcs::Activation;

/// How the raw output difference is turned into the error signal that gets
/// backpropagated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorFunc {
    /// Plain difference between desired and actual output.
    Linear,
    /// Difference mapped through `ln((1 + d) / (1 - d))`, which punishes large
    /// errors harder. Works best with outputs in [-1, 1].
    Tanh,
}

impl Default for ErrorFunc {
    fn default() -> Self {
        ErrorFunc::Tanh
    }
}

impl ErrorFunc {
    pub fn eval(self, diff: f32) -> f32 {
        match self {
            ErrorFunc::Linear => diff,
            ErrorFunc::Tanh => {
                if diff < -0.999_999_9 {
                    -17.
                } else if diff > 0.999_999_9 {
                    17.
                } else {
                    ((1. + diff) / (1. - diff)).ln()
                }
            }
        }
    }
}

/// Criterion deciding when training has reached the desired error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopFunc {
    /// Stop when the mean square error drops to the desired error.
    Mse,
    /// Stop when the number of failing output bits drops to the desired error.
    Bit,
}

impl Default for StopFunc {
    fn default() -> Self {
        StopFunc::Mse
    }
}

/// Running mean square error and bit fail count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MseAccumulator {
    /// Sum of squared output differences since the last reset.
    pub sum: f32,
    /// Number of output values that contributed to `sum`.
    pub count: usize,
    pub bit_fail: usize,
}

impl MseAccumulator {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record one output difference and return it, halved for symmetric
    /// activations whose output range is twice as wide.
    pub fn update(&mut self, activation: Activation, diff: f32, bit_fail_limit: f32) -> f32 {
        let diff = if activation.is_symmetric() { diff / 2. } else { diff };
        self.sum += diff * diff;
        self.count += 1;
        if diff.abs() >= bit_fail_limit {
            self.bit_fail += 1;
        }
        diff
    }

    pub fn mse(&self) -> f32 {
        if self.count == 0 {
            0.
        } else {
            self.sum / self.count as f32
        }
    }

    pub fn reached(&self, stop: StopFunc, desired_error: f32) -> bool {
        match stop {
            StopFunc::Mse => self.mse() <= desired_error,
            StopFunc::Bit => self.bit_fail as f32 <= desired_error,
        }
    }
}
