//! Benchmarks for block-rate parameter smoothing.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use mod_delay::dsp::smoother::{SmoothedValue, Smoother};

use crate::BLOCK_SIZES;

pub fn bench_smoother(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/smoother");
    let smoother = Smoother::new(0.3, 48_000.0);

    for &size in BLOCK_SIZES {
        // Three engine controls per block
        let mut values = [
            SmoothedValue::gliding(0.08, 1.2),
            SmoothedValue::gliding(0.1, 0.9),
            SmoothedValue::gliding(0.5, 0.0),
        ];
        group.bench_with_input(BenchmarkId::new("three_controls", size), &size, |b, &size| {
            b.iter(|| {
                let [a, f, m] = &mut values;
                smoother.smooth_all(&mut [&mut *a, &mut *f, &mut *m], black_box(size));
                // Keep them moving so the benchmark never measures a settled value
                a.set_target(if a.current() > 1.0 { 0.08 } else { 1.2 });
            })
        });
    }

    group.finish();
}
