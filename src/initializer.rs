use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// Fills `weights` with values drawn uniformly from `[min, max]`.
/// A degenerate range sets every weight to `min`.
pub fn uniform<R: Rng>(rng: &mut R, weights: &mut [f32], min: f32, max: f32) {
    if !(min < max) {
        weights.iter_mut().for_each(|w| *w = min);
        return;
    }
    let dist = Uniform::new_inclusive(min, max);
    for w in weights {
        *w = dist.sample(rng);
    }
}

/// Single uniform sample from `[min, max]`.
pub fn sample<R: Rng>(rng: &mut R, min: f32, max: f32) -> f32 {
    if !(min < max) {
        return min;
    }
    Uniform::new_inclusive(min, max).sample(rng)
}

/// Scale of the Widrow-Nguyen initialization for a network with `num_hidden`
/// hidden neurons receiving inputs in `[min_in, max_in]`.
pub fn widrow_multiplier(num_hidden: usize, num_input: usize, min_in: f32, max_in: f32) -> f32 {
    let spread = max_in - min_in;
    let spread = if spread > 0. { spread } else { 1. };
    // without hidden neurons the rule degenerates, fall back to one neuron
    let hidden = num_hidden.max(1) as f64;
    ((0.7 * hidden).powf(1. / num_input.max(1) as f64) / spread as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn uniform_respects_bounds() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut w = vec![0.; 1000];
        uniform(&mut rng, &mut w, -0.5, 0.25);
        assert!(w.iter().all(|w| *w >= -0.5 && *w <= 0.25));
        assert!(w.iter().any(|w| *w < 0.));

        uniform(&mut rng, &mut w, 1., 1.);
        assert!(w.iter().all(|w| *w == 1.));
    }

    #[test]
    fn widrow_shrinks_with_input_spread() {
        let narrow = widrow_multiplier(4, 2, 0., 1.);
        let wide = widrow_multiplier(4, 2, -10., 10.);
        assert!(narrow > wide);
        assert!((narrow - (2.8f64.sqrt() as f32)).abs() < 1e-5);
    }
}
