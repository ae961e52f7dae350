#![allow(dead_code)]

use rusty_fann::{Activation, Network, NetworkBuilder, TrainData};

/// XOR with inputs and outputs in {-1, 1}.
pub fn xor_data() -> TrainData {
    TrainData::from_slices(
        &[&[-1., -1.], &[-1., 1.], &[1., -1.], &[1., 1.]],
        &[&[-1.], &[1.], &[1.], &[-1.]],
    )
    .unwrap()
}

/// XOR with inputs and outputs in {0, 1}.
pub fn xor_binary_data() -> TrainData {
    TrainData::from_slices(
        &[&[0., 0.], &[0., 1.], &[1., 0.], &[1., 1.]],
        &[&[0.], &[1.], &[1.], &[0.]],
    )
    .unwrap()
}

/// `sin(x)` sampled on [-3, 3], squeezed into [0.1, 0.9].
pub fn sin_data(points: usize) -> TrainData {
    TrainData::from_fn(points, 1, 1, |i, input, output| {
        let x = i as f32 / (points - 1) as f32 * 6. - 3.;
        input[0] = x;
        output[0] = x.sin() * 0.4 + 0.5;
    })
}

pub fn xor_network(seed: u64) -> Network {
    NetworkBuilder::standard(&[2, 3, 1])
        .hidden_activation(Activation::SigmoidSymmetric)
        .output_activation(Activation::SigmoidSymmetric)
        .seed(seed)
        .build()
        .unwrap()
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
