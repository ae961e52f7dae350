mod common;

use rusty_fann::{
    Activation, ErrorKind, FixedNetwork, Network, NetworkBuilder, TrainData, TrainParams,
    TrainingAlgorithm,
};

#[test]
fn network_save_and_load() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("xor.net");
    let data = common::xor_data();

    let mut network = common::xor_network(1);
    network.params_mut().algorithm = TrainingAlgorithm::Quickprop;
    network.cascade_params_mut().weight_multiplier = 0.3;
    network.set_scaling_params(&data, -1., 1., -1., 1.)?;
    network.train_on_data(&data, 50, 0, 0.)?;
    network.save(&path)?;

    let mut loaded = Network::from_file(&path)?;
    assert_eq!(loaded.layer_sizes(), network.layer_sizes());
    assert_eq!(loaded.bias_counts(), network.bias_counts());
    assert_eq!(loaded.weights(), network.weights());
    assert_eq!(loaded.params(), network.params());
    assert_eq!(loaded.cascade_params(), network.cascade_params());
    assert_eq!(loaded.scaling_params(), network.scaling_params());
    assert_eq!(loaded.activation(1, 0)?, Activation::SigmoidSymmetric);

    for (input, _) in data.iter() {
        let correct = network.run(input)?.to_vec();
        let prediction = loaded.run(input)?;
        assert_eq!(correct, prediction, "Network structure damaged during saving.");
    }
    Ok(())
}

#[test]
fn grown_network_save_and_load() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("grown.net");
    let data = common::sin_data(20);

    let mut network = Network::shortcut(&[1, 1])?;
    network.cascade_params_mut().max_out_epochs = 20;
    network.cascade_params_mut().max_cand_epochs = 20;
    network.cascade_train_on_data(&data, 2, 0, 0.)?;
    network.save(&path)?;

    let mut loaded = Network::from_file(&path)?;
    assert_eq!(loaded.layer_sizes(), vec![1, 1, 1, 1]);
    assert_eq!(loaded.bias_counts(), vec![1, 0, 0, 0]);
    let correct = network.run(&[0.5])?.to_vec();
    assert_eq!(loaded.run(&[0.5])?, &correct[..]);
    Ok(())
}

#[test]
fn truncated_network_file_is_rejected() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.net");
    let network = Network::standard(&[2, 1])?;
    network.save(&path)?;

    let text = std::fs::read_to_string(&path)?;
    std::fs::write(&path, &text[..text.len() / 2])?;
    let err = Network::from_file(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedFile);
    Ok(())
}

#[test]
fn train_data_save_and_load() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sin.data");
    let data = common::sin_data(33);
    data.save(&path)?;

    let loaded = TrainData::from_file(&path)?;
    assert_eq!(loaded, data);
    Ok(())
}

#[test]
fn train_data_fixed_save() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("xor_fixed.data");
    let data = common::xor_data();
    data.save_fixed(&path, 10)?;

    let text = std::fs::read_to_string(&path)?;
    assert!(text.starts_with("4 2 1\n-1024 -1024\n-1024\n"));
    let loaded = TrainData::from_file(&path)?;
    assert_eq!(loaded.input(3), &[1024., 1024.]);
    Ok(())
}

#[test]
fn malformed_train_data() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bad.data");
    std::fs::write(&path, "2 1 1\n0.5\n1\n0.25\n")?;
    let err = TrainData::from_file(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedFile);
    Ok(())
}

#[test]
fn fixed_network_save_and_load() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("xor_fixed.net");
    let data = common::xor_data();

    let mut network = NetworkBuilder::standard(&[2, 3, 1])
        .hidden_activation(Activation::SigmoidSymmetricStepwise)
        .output_activation(Activation::SigmoidSymmetricStepwise)
        .seed(4)
        .build()?;
    network.train_on_data(&data, 200, 0, 0.)?;
    let report = network.save_fixed(&path, Some(&data))?;
    assert!(!report.precision_loss);

    let mut fixed = FixedNetwork::from_file(&path)?;
    assert_eq!(fixed.decimal_point(), report.decimal_point);
    for (input, _) in data.iter() {
        let expected = network.run(input)?[0];
        let got = fixed.run_float(input)?[0];
        assert!((expected - got).abs() < 0.02, "{} vs {}", expected, got);
    }
    Ok(())
}

#[test]
fn params_from_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("params.json");
    std::fs::write(&path, r#"{"algorithm": "Sarprop", "rprop_delta_max": 10.0}"#)?;

    let params = TrainParams::from_file(&path)?;
    assert_eq!(params.algorithm, TrainingAlgorithm::Sarprop);
    assert_eq!(params.rprop_delta_max, 10.);
    assert_eq!(params.rprop_delta_zero, TrainParams::default().rprop_delta_zero);

    let mut network = Network::standard(&[2, 1])?;
    network.set_params(params)?;
    assert_eq!(network.params().algorithm, TrainingAlgorithm::Sarprop);
    Ok(())
}
