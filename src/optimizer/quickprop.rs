use super::*;

/// Quickprop, which treats the error along every weight as a parabola and
/// jumps towards its estimated minimum.
#[derive(Clone, Debug)]
pub struct Quickprop {
    pub learning_rate: f32,
    pub decay: f32,
    /// Maximum growth factor of a step.
    pub mu: f32,
}

impl OptimizerAlg for Quickprop {
    fn update_weights(&mut self, weights: &mut [f32], state: Slopes<'_>, info: &EpochInfo) {
        assert_eq!(weights.len(), state.slopes.len());
        let Slopes {
            slopes,
            prev_steps,
            prev_slopes,
        } = state;

        let epsilon = self.learning_rate / info.num_data.max(1) as f32;
        let shrink = self.mu / (1. + self.mu);

        for i in 0..weights.len() {
            let w = weights[i];
            let prev_step = prev_steps[i];
            let prev_slope = prev_slopes[i];
            let slope = slopes[i] + self.decay * w;
            let mut step = 0.;

            if prev_step > 0.001 {
                if slope > 0. {
                    step += epsilon * slope;
                }
                if slope > shrink * prev_slope {
                    step += self.mu * prev_step;
                } else {
                    step += prev_step * slope / (prev_slope - slope);
                }
            } else if prev_step < -0.001 {
                if slope < 0. {
                    step += epsilon * slope;
                }
                if slope < shrink * prev_slope {
                    step += self.mu * prev_step;
                } else {
                    step += prev_step * slope / (prev_slope - slope);
                }
            } else {
                step += epsilon * slope;
            }

            prev_steps[i] = step;
            weights[i] = clamp_weight(w + step);
            prev_slopes[i] = slope;
            slopes[i] = 0.;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_is_gradient_descent() {
        let mut opt = Quickprop {
            learning_rate: 0.8,
            decay: 0.,
            mu: 1.75,
        };
        let mut w = [0.5];
        let mut prev_steps = [0.];
        let mut prev_slopes = [0.];
        opt.update_weights(
            &mut w,
            Slopes {
                slopes: &mut [2.],
                prev_steps: &mut prev_steps,
                prev_slopes: &mut prev_slopes,
            },
            &EpochInfo {
                num_data: 4,
                mse: 0.,
                epoch: 0,
            },
        );
        assert!((w[0] - 0.9).abs() < 1e-6);
        assert!((prev_steps[0] - 0.4).abs() < 1e-6);
        assert_eq!(prev_slopes, [2.]);
    }

    #[test]
    fn jumps_to_parabola_minimum() {
        let mut opt = Quickprop {
            learning_rate: 0.,
            decay: 0.,
            mu: 1.75,
        };
        // slope halved after a step of 1: minimum lies one more step ahead
        let mut w = [1.];
        let mut prev_steps = [1.];
        opt.update_weights(
            &mut w,
            Slopes {
                slopes: &mut [1.],
                prev_steps: &mut prev_steps,
                prev_slopes: &mut [2.],
            },
            &EpochInfo {
                num_data: 1,
                mse: 0.,
                epoch: 0,
            },
        );
        assert!((w[0] - 2.).abs() < 1e-6);
    }
}
