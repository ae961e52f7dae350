use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rusty_fann::{Activation, NetworkBuilder, TrainData, TrainingAlgorithm};

fn sample_data(len: usize) -> TrainData {
    TrainData::from_fn(len, 1, 1, |i, input, output| {
        input[0] = i as f32 / len as f32;
        output[0] = (input[0] * 6.).sin() * 0.4 + 0.5;
    })
}

fn running_speed(c: &mut Criterion) {
    let mut group = c.benchmark_group("run");
    for width in [10, 100].iter() {
        let mut network = NetworkBuilder::standard(&[1, *width, *width, 1])
            .hidden_activation(Activation::Sigmoid)
            .output_activation(Activation::Sigmoid)
            .seed(0)
            .build()
            .unwrap();
        group.bench_with_input(BenchmarkId::new("hidden", width), &[0.5f32], |b, input| {
            b.iter(|| network.run(black_box(input)).map(|o| o[0]))
        });
    }
    group.finish();
}

fn training_speed(c: &mut Criterion) {
    let data = sample_data(100);
    let mut group = c.benchmark_group("train_epoch");
    for algorithm in [
        TrainingAlgorithm::Incremental,
        TrainingAlgorithm::Batch,
        TrainingAlgorithm::Rprop,
        TrainingAlgorithm::Quickprop,
        TrainingAlgorithm::Sarprop,
    ]
    .iter()
    {
        let mut network = NetworkBuilder::standard(&[1, 100, 100, 1])
            .hidden_activation(Activation::Sigmoid)
            .output_activation(Activation::Sigmoid)
            .seed(0)
            .build()
            .unwrap();
        network.params_mut().algorithm = *algorithm;
        group.bench_with_input(
            BenchmarkId::new("algorithm", format!("{:?}", algorithm)),
            &data,
            |b, data| b.iter(|| network.train_epoch(black_box(data)).unwrap()),
        );
    }
    group.finish();
}

criterion_group!(benches, running_speed, training_speed);
criterion_main!(benches);
