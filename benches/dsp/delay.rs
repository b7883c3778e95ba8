//! Benchmarks for delay line reads and writes.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use mod_delay::dsp::delay::DelayLine;

use crate::BLOCK_SIZES;

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    // 1.5 s of stereo at 48kHz plus block slack
    let frames = 72_000 + 2_048;

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin() * 0.5).collect();

        // Whole-frame delay: the all-pass collapses to a plain read
        let mut line = DelayLine::new(frames, 2).unwrap();
        group.bench_with_input(BenchmarkId::new("integer_3840", size), &size, |b, _| {
            b.iter(|| {
                for &x in &input {
                    for ch in 0..2 {
                        let y = line.read(ch, black_box(3_840.0));
                        line.write(ch, x + y * 0.3);
                    }
                    line.advance();
                }
            })
        });

        // Sweeping fractional delay (chorus-like)
        let mut line = DelayLine::new(frames, 2).unwrap();
        group.bench_with_input(BenchmarkId::new("fractional_sweep", size), &size, |b, _| {
            b.iter(|| {
                for (i, &x) in input.iter().enumerate() {
                    let delay = 480.0 + (i as f64 * 0.01).sin() * 48.0;
                    for ch in 0..2 {
                        let y = line.read(ch, black_box(delay));
                        line.write(ch, x + y * 0.3);
                    }
                    line.advance();
                }
            })
        });
    }

    group.finish();
}
