//! Grows a shortcut network with cascade correlation until it fits a sine wave.

use rusty_fann::{Activation, Network, TrainData, TrainingAlgorithm};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let points = 100;
    let mut data = TrainData::from_fn(points, 1, 1, |i, input, output| {
        let x = i as f32 / (points - 1) as f32 * 2. * std::f32::consts::PI;
        input[0] = x;
        output[0] = x.sin();
    });
    data.scale_input(-1., 1.)?;

    let mut network = Network::shortcut(&[1, 1])?;
    network.set_activation_output(Activation::Linear);
    network.params_mut().algorithm = TrainingAlgorithm::Rprop;
    network.set_callback(|net, _data, report| {
        println!(
            "{} hidden neurons, mse {:.6}",
            net.num_hidden(),
            report.mse
        );
        0
    });

    let summary = network.cascade_train_on_data(&data, 20, 1, 0.0005)?;
    println!(
        "Added {} neurons in {} epochs, final mse {} ({:?})",
        summary.neurons_added,
        summary.total_epochs(),
        summary.mse,
        summary.reason
    );

    for x in [-1., -0.5, 0., 0.5, 1.].iter() {
        let out = network.run(&[*x])?;
        println!("{:>5} -> {:.4}", x, out[0]);
    }
    network.save("cascade_sin.net")?;
    Ok(())
}
