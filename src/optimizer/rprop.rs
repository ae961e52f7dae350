use super::*;

/// Smallest step RPROP restarts from after the step collapsed to zero.
const MIN_PREV_STEP: f32 = 0.0001;
const SARPROP_DELTA_MIN: f32 = 0.000_001;

/// Resilient backpropagation without weight backtracking (iRPROP-).
///
/// Only the sign of the slope is used. Every weight has its own step size
/// which grows while the slope keeps its sign and shrinks when it flips.
#[derive(Clone, Debug)]
pub struct Rprop {
    pub increase_factor: f32,
    pub decrease_factor: f32,
    pub delta_min: f32,
    pub delta_max: f32,
}

impl OptimizerAlg for Rprop {
    fn update_weights(&mut self, weights: &mut [f32], state: Slopes<'_>, _info: &EpochInfo) {
        assert_eq!(weights.len(), state.slopes.len());
        let Slopes {
            slopes,
            prev_steps,
            prev_slopes,
        } = state;

        for i in 0..weights.len() {
            let prev_step = prev_steps[i].max(MIN_PREV_STEP);
            let mut slope = slopes[i];

            let step = if prev_slopes[i] * slope >= 0. {
                (prev_step * self.increase_factor).min(self.delta_max)
            } else {
                slope = 0.;
                (prev_step * self.decrease_factor)
                    .max(self.delta_min)
                    .min(self.delta_max)
            };

            if slope > 0. {
                weights[i] = clamp_weight(weights[i] + step);
            } else if slope < 0. {
                weights[i] = clamp_weight(weights[i] - step);
            }

            prev_steps[i] = step;
            prev_slopes[i] = slope;
            slopes[i] = 0.;
        }
    }
}

/// Simulated annealing RPROP. Adds weight decay and, while the error is
/// small, a random kick to collapsing steps that cools down over the epochs.
#[derive(Clone, Debug)]
pub struct Sarprop {
    pub increase_factor: f32,
    pub decrease_factor: f32,
    pub delta_max: f32,
    pub weight_decay_shift: f32,
    pub step_error_threshold_factor: f32,
    pub step_error_shift: f32,
    pub temperature: f32,
    pub rng: SmallRng,
}

impl OptimizerAlg for Sarprop {
    fn update_weights(&mut self, weights: &mut [f32], state: Slopes<'_>, info: &EpochInfo) {
        assert_eq!(weights.len(), state.slopes.len());
        let Slopes {
            slopes,
            prev_steps,
            prev_slopes,
        } = state;

        let decay = self.weight_decay_shift.exp2();
        let rmse = info.mse.sqrt();
        let noise = (-self.temperature * info.epoch as f32 + self.step_error_shift).exp2();

        for i in 0..weights.len() {
            let prev_step = prev_steps[i].max(SARPROP_DELTA_MIN);
            // uphill slope with weight decay
            let mut slope = -slopes[i] - weights[i] * decay;
            let same_sign = prev_slopes[i] * slope;

            let step = if same_sign > 0. {
                let step = (prev_step * self.increase_factor).min(self.delta_max);
                weights[i] += if slope < 0. { step } else { -step };
                step
            } else if same_sign < 0. {
                slope = 0.;
                if prev_step < self.step_error_threshold_factor * info.mse {
                    prev_step * self.decrease_factor + self.rng.gen::<f32>() * rmse * noise
                } else {
                    (prev_step * self.decrease_factor).max(SARPROP_DELTA_MIN)
                }
            } else {
                weights[i] += if slope < 0. { prev_step } else { -prev_step };
                prev_step
            };

            weights[i] = clamp_weight(weights[i]);
            prev_steps[i] = step;
            prev_slopes[i] = slope;
            slopes[i] = 0.;
        }
    }
}
