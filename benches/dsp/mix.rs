//! Benchmarks for equal-power mixing.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use mod_delay::dsp::mix::equal_power_mix_in_place;

use crate::BLOCK_SIZES;

pub fn bench_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/mix");

    for &size in BLOCK_SIZES {
        let dry_input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();
        let wet: Vec<f32> = (0..size).map(|i| (i as f32 * 0.07).cos()).collect();
        let mut dry = dry_input.clone();

        group.bench_with_input(BenchmarkId::new("equal_power", size), &size, |b, _| {
            b.iter(|| {
                dry.copy_from_slice(&dry_input);
                equal_power_mix_in_place(black_box(&mut dry), black_box(&wet), 0.35);
            })
        });
    }

    group.finish();
}
