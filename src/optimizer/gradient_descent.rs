use super::*;

/// Plain gradient descent with momentum, applied after every pattern.
#[derive(Clone, Debug)]
pub struct Incremental {
    learning_rate: f32,
    momentum: f32,
}

impl Incremental {
    pub fn new(learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
        }
    }
}

impl OptimizerAlg for Incremental {
    fn update_weights(&mut self, weights: &mut [f32], state: Slopes<'_>, _info: &EpochInfo) {
        assert_eq!(weights.len(), state.slopes.len());
        for ((w, s), prev) in weights.iter_mut().zip(state.slopes.iter_mut()).zip(state.prev_steps.iter_mut()) {
            let delta = self.learning_rate * *s + self.momentum * *prev;
            *w += delta;
            *prev = delta;
            *s = 0.;
        }
    }
}

/// Gradient descent on the slopes averaged over a whole epoch.
#[derive(Clone, Debug)]
pub struct Batch {
    learning_rate: f32,
}

impl Batch {
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl OptimizerAlg for Batch {
    fn update_weights(&mut self, weights: &mut [f32], state: Slopes<'_>, info: &EpochInfo) {
        assert_eq!(weights.len(), state.slopes.len());
        let k = self.learning_rate / info.num_data.max(1) as f32;
        for (w, s) in weights.iter_mut().zip(state.slopes.iter_mut()) {
            *w += k * *s;
            *s = 0.;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(num_data: usize) -> EpochInfo {
        EpochInfo {
            num_data,
            mse: 0.,
            epoch: 0,
        }
    }

    #[test]
    fn incremental_uses_momentum() {
        let mut opt = Incremental::new(0.5, 0.9);
        let mut w = [1., 1.];
        let mut slopes = [2., -2.];
        let mut prev = [0., 1.];
        let mut prev_slopes = [0., 0.];
        opt.update_weights(
            &mut w,
            Slopes {
                slopes: &mut slopes,
                prev_steps: &mut prev,
                prev_slopes: &mut prev_slopes,
            },
            &info(1),
        );
        assert_eq!(w[0], 2.);
        assert!((w[1] - 0.9).abs() < 1e-6);
        assert_eq!(prev[0], 1.);
        assert!((prev[1] + 0.1).abs() < 1e-6);
        assert_eq!(slopes, [0., 0.]);
    }

    #[test]
    fn batch_averages() {
        let mut opt = Batch::new(1.);
        let mut w = [0.];
        let mut slopes = [4.];
        opt.update_weights(
            &mut w,
            Slopes {
                slopes: &mut slopes,
                prev_steps: &mut [0.],
                prev_slopes: &mut [0.],
            },
            &info(4),
        );
        assert_eq!(w, [1.]);
        assert_eq!(slopes, [0.]);
    }
}
