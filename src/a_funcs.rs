use serde::{Deserialize, Serialize};

/// Activation functions a neuron can use.
///
/// All functions receive the weighted input sum already multiplied by the
/// neuron's steepness, so `evaluate` works on `s * x` and `derivative` returns
/// `dy/dx` (which carries a factor of `s`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activation {
    Linear,
    Threshold,
    ThresholdSymmetric,
    Sigmoid,
    SigmoidStepwise,
    SigmoidSymmetric,
    SigmoidSymmetricStepwise,
    Gaussian,
    GaussianSymmetric,
    Elliot,
    ElliotSymmetric,
    LinearPiece,
    LinearPieceSymmetric,
    SinSymmetric,
    CosSymmetric,
    Sin,
    Cos,
}

/// Breakpoints shared by both stepwise sigmoids, in `s * x` space.
pub const STEPWISE_BREAKPOINTS: [f32; 6] = [
    -2.646_652_5,
    -1.472_219_5,
    -0.549_306_15,
    0.549_306_15,
    1.472_219_3,
    2.646_653,
];

pub const SIGMOID_STEPWISE_RESULTS: [f32; 6] = [0.005, 0.05, 0.25, 0.75, 0.95, 0.995];

pub const SIGMOID_SYMMETRIC_STEPWISE_RESULTS: [f32; 6] = [-0.99, -0.9, -0.5, 0.5, 0.9, 0.99];

/// Sums are clamped to this magnitude before activation.
pub const MAX_SUM: f32 = 150.;

impl Activation {
    pub const ALL: [Activation; 17] = [
        Activation::Linear,
        Activation::Threshold,
        Activation::ThresholdSymmetric,
        Activation::Sigmoid,
        Activation::SigmoidStepwise,
        Activation::SigmoidSymmetric,
        Activation::SigmoidSymmetricStepwise,
        Activation::Gaussian,
        Activation::GaussianSymmetric,
        Activation::Elliot,
        Activation::ElliotSymmetric,
        Activation::LinearPiece,
        Activation::LinearPieceSymmetric,
        Activation::SinSymmetric,
        Activation::CosSymmetric,
        Activation::Sin,
        Activation::Cos,
    ];

    pub fn evaluate(self, sum: f32) -> f32 {
        match self {
            Activation::Linear => sum,
            Activation::Threshold => {
                if sum < 0. {
                    0.
                } else {
                    1.
                }
            }
            Activation::ThresholdSymmetric => {
                if sum < 0. {
                    -1.
                } else {
                    1.
                }
            }
            Activation::Sigmoid => 1. / (1. + (-2. * sum).exp()),
            Activation::SigmoidSymmetric => 2. / (1. + (-2. * sum).exp()) - 1.,
            Activation::SigmoidStepwise => stepwise(&SIGMOID_STEPWISE_RESULTS, 0., 1., sum),
            Activation::SigmoidSymmetricStepwise => {
                stepwise(&SIGMOID_SYMMETRIC_STEPWISE_RESULTS, -1., 1., sum)
            }
            Activation::Gaussian => (-sum * sum).exp(),
            Activation::GaussianSymmetric => (-sum * sum).exp() * 2. - 1.,
            Activation::Elliot => (sum / 2.) / (1. + sum.abs()) + 0.5,
            Activation::ElliotSymmetric => sum / (1. + sum.abs()),
            Activation::LinearPiece => sum.max(0.).min(1.),
            Activation::LinearPieceSymmetric => sum.max(-1.).min(1.),
            Activation::SinSymmetric => sum.sin(),
            Activation::CosSymmetric => sum.cos(),
            Activation::Sin => sum.sin() / 2. + 0.5,
            Activation::Cos => sum.cos() / 2. + 0.5,
        }
    }

    /// Derivative with respect to the unscaled input, given the steepness, the
    /// neuron's output `value` and its steepness-scaled `sum`.
    pub fn derivative(self, steepness: f32, value: f32, sum: f32) -> f32 {
        let s = steepness;
        match self {
            Activation::Linear | Activation::LinearPiece | Activation::LinearPieceSymmetric => s,
            // not differentiable; training refuses these up front
            Activation::Threshold | Activation::ThresholdSymmetric => 0.,
            Activation::Sigmoid | Activation::SigmoidStepwise => {
                let y = value.max(0.01).min(0.99);
                2. * s * y * (1. - y)
            }
            Activation::SigmoidSymmetric | Activation::SigmoidSymmetricStepwise => {
                let y = value.max(-0.98).min(0.98);
                s * (1. - y * y)
            }
            Activation::Gaussian => -2. * sum * value * s,
            Activation::GaussianSymmetric => -2. * sum * (value + 1.) * s,
            Activation::Elliot => {
                let d = 1. + sum.abs();
                s / (2. * d * d)
            }
            Activation::ElliotSymmetric => {
                let d = 1. + sum.abs();
                s / (d * d)
            }
            Activation::SinSymmetric => s * sum.cos(),
            Activation::CosSymmetric => -s * sum.sin(),
            Activation::Sin => s * sum.cos() / 2.,
            Activation::Cos => -s * sum.sin() / 2.,
        }
    }

    /// Whether the function's output range is centered around zero.
    pub fn is_symmetric(self) -> bool {
        matches!(
            self,
            Activation::ThresholdSymmetric
                | Activation::SigmoidSymmetric
                | Activation::SigmoidSymmetricStepwise
                | Activation::GaussianSymmetric
                | Activation::ElliotSymmetric
                | Activation::LinearPieceSymmetric
                | Activation::SinSymmetric
                | Activation::CosSymmetric
        )
    }

    pub fn is_trainable(self) -> bool {
        !matches!(self, Activation::Threshold | Activation::ThresholdSymmetric)
    }

    /// Largest magnitude the function can output, `None` for unbounded functions.
    pub fn output_bound(self) -> Option<f32> {
        match self {
            Activation::Linear => None,
            _ => Some(1.),
        }
    }
}

impl Default for Activation {
    fn default() -> Self {
        Activation::SigmoidStepwise
    }
}

fn stepwise(results: &[f32; 6], min: f32, max: f32, sum: f32) -> f32 {
    let v = &STEPWISE_BREAKPOINTS;
    if sum < v[0] {
        return min;
    }
    if sum >= v[5] {
        return max;
    }
    // first segment whose right end lies beyond the sum
    let i = (1..6).find(|&i| sum < v[i]).unwrap_or(5);
    let (v1, v2, r1, r2) = (v[i - 1], v[i], results[i - 1], results[i]);
    (r2 - r1) / (v2 - v1) * (sum - v1) + r1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_derivative(a: Activation, s: f32, x: f32) -> f32 {
        let h = 1e-3;
        (a.evaluate(s * (x + h)) - a.evaluate(s * (x - h))) / (2. * h)
    }

    #[test]
    fn smooth_derivatives_match_numeric() {
        let smooth = [
            Activation::Linear,
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
        ];
        for &a in &smooth {
            for &s in &[0.5f32, 1.0] {
                for &x in &[-0.8f32, -0.3, 0.2, 0.7] {
                    let sum = s * x;
                    let analytic = a.derivative(s, a.evaluate(sum), sum);
                    let numeric = numeric_derivative(a, s, x);
                    assert!(
                        (analytic - numeric).abs() < 1e-2,
                        "{:?} s={} x={}: {} vs {}",
                        a,
                        s,
                        x,
                        analytic,
                        numeric
                    );
                }
            }
        }
    }

    #[test]
    fn stepwise_tracks_sigmoid() {
        for i in -40..40 {
            let x = i as f32 / 10.;
            let exact = Activation::Sigmoid.evaluate(x);
            let approx = Activation::SigmoidStepwise.evaluate(x);
            assert!((exact - approx).abs() < 0.05, "x={} {} {}", x, exact, approx);

            let exact = Activation::SigmoidSymmetric.evaluate(x);
            let approx = Activation::SigmoidSymmetricStepwise.evaluate(x);
            assert!((exact - approx).abs() < 0.1, "x={} {} {}", x, exact, approx);
        }
    }

    #[test]
    fn stepwise_saturates() {
        assert_eq!(Activation::SigmoidStepwise.evaluate(-10.), 0.);
        assert_eq!(Activation::SigmoidStepwise.evaluate(10.), 1.);
        assert_eq!(Activation::SigmoidSymmetricStepwise.evaluate(-10.), -1.);
        assert_eq!(Activation::SigmoidSymmetricStepwise.evaluate(10.), 1.);
        assert!((Activation::SigmoidStepwise.evaluate(0.) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn thresholds() {
        assert_eq!(Activation::Threshold.evaluate(-0.1), 0.);
        assert_eq!(Activation::Threshold.evaluate(0.), 1.);
        assert_eq!(Activation::ThresholdSymmetric.evaluate(-0.1), -1.);
        assert!(!Activation::Threshold.is_trainable());
        assert!(Activation::Sigmoid.is_trainable());
    }
}
