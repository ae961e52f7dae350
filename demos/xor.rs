//! Trains a small network on XOR with RPROP, then exports it to fixed point.

use rusty_fann::{Activation, NetworkBuilder, StopFunc, TrainData};

fn xor_data() -> rusty_fann::Result<TrainData> {
    TrainData::from_slices(
        &[&[-1., -1.], &[-1., 1.], &[1., -1.], &[1., 1.]],
        &[&[-1.], &[1.], &[1.], &[-1.]],
    )
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let data = xor_data()?;
    let mut network = NetworkBuilder::standard(&[2, 3, 1])
        .hidden_activation(Activation::SigmoidSymmetric)
        .output_activation(Activation::SigmoidSymmetric)
        .build()?;
    network.params_mut().stop_func = StopFunc::Bit;
    network.params_mut().bit_fail_limit = 0.35;
    network.init_weights(&data)?;

    let outcome = network.train_on_data(&data, 1000, 100, 0.)?;
    println!(
        "Stopped after {} epochs ({:?}), mse {}",
        outcome.epochs, outcome.reason, outcome.mse
    );

    for (input, desired) in data.iter() {
        let out = network.run(input)?;
        println!("XOR {:?} -> {:?}, should be {:?}", input, out, desired);
    }

    network.save("xor_float.net")?;
    let report = network.save_fixed("xor_fixed.net", Some(&data))?;
    println!("Fixed point export uses decimal point {}", report.decimal_point);
    data.save_fixed("xor_fixed.data", report.decimal_point)?;

    Ok(())
}
