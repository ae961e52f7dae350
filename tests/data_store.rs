mod common;

use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rusty_fann::{ErrorKind, TrainData};

/// Row `i` has input `[i, 2i]` and output `[-i]`.
fn numbered(len: usize) -> TrainData {
    TrainData::from_fn(len, 2, 1, |i, input, output| {
        input[0] = i as f32;
        input[1] = 2. * i as f32;
        output[0] = -(i as f32);
    })
}

#[test]
fn subset_of_four() {
    let data = numbered(4);
    let sub = data.subset(1, 2).unwrap();
    assert_eq!(sub.len(), 2);
    assert_eq!(sub.input(0), &[1., 2.]);
    assert_eq!(sub.output(1), &[-2.]);

    let err = data.subset(3, 2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTopology);
}

#[test]
fn merge_keeps_order() {
    let a = numbered(3);
    let b = numbered(2);
    let merged = a.merge(&b).unwrap();
    assert_eq!(merged.len(), 5);
    assert_eq!(merged.input(2), a.input(2));
    assert_eq!(merged.input(3), b.input(0));
    assert_eq!(merged.output(4), b.output(1));

    let other = TrainData::new(2, 3, 1);
    let err = a.merge(&other).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
    assert_eq!(a, numbered(3));
}

#[test]
fn scale_both_sides() {
    let mut data = common::sin_data(10);
    let original = data.clone();
    data.scale(-1., 1.).unwrap();
    assert_eq!(data.input_range(), (-1., 1.));
    let (lo, hi) = data.output_range();
    assert!((lo + 1.).abs() < 1e-6 && (hi - 1.).abs() < 1e-6);

    data.descale_input().unwrap();
    data.descale_output().unwrap();
    for (a, b) in data.inputs().iter().zip(original.inputs()) {
        assert!((a - b).abs() < 1e-5);
    }
    for (a, b) in data.outputs().iter().zip(original.outputs()) {
        assert!((a - b).abs() < 1e-5);
    }
}

proptest! {
    #[test]
    fn shuffle_is_a_permutation(len in 0usize..60, seed in any::<u64>()) {
        let mut data = numbered(len);
        data.shuffle(&mut SmallRng::seed_from_u64(seed));
        prop_assert_eq!(data.len(), len);

        let mut seen = vec![false; len];
        for (input, output) in data.iter() {
            let i = input[0] as usize;
            prop_assert!(!seen[i]);
            seen[i] = true;
            // rows move as a whole
            prop_assert_eq!(input[1], 2. * input[0]);
            prop_assert_eq!(output[0], -input[0]);
        }
        prop_assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn scaling_round_trips(
        values in prop::collection::vec(-1000f32..1000., 2..40),
        lo in -5f32..0.,
        hi in 0.5f32..5.,
    ) {
        let refs: Vec<&[f32]> = values.iter().map(std::slice::from_ref).collect();
        let mut data = TrainData::from_slices(&refs, &refs).unwrap();
        let original = data.clone();

        data.scale_input(lo, hi).unwrap();
        let (min, max) = data.input_range();
        prop_assert!(min >= lo - 1e-3 && max <= hi + 1e-3);
        data.descale_input().unwrap();

        let (omin, omax) = original.input_range();
        let tolerance = (omax - omin).max(1.) * 1e-4;
        for (a, b) in data.inputs().iter().zip(original.inputs()) {
            prop_assert!((a - b).abs() <= tolerance, "{} vs {}", a, b);
        }
    }
}
