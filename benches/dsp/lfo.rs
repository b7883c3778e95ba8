//! Benchmarks for LFO generation, one per waveform.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use mod_delay::dsp::lfo::{Lfo, LfoSettings, Waveform};

use crate::BLOCK_SIZES;

pub fn bench_lfo(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/lfo");

    for waveform in Waveform::ALL {
        let settings = LfoSettings {
            frequency: 2.0,
            waveform,
            depth: 0.01,
        };
        for &size in BLOCK_SIZES {
            let mut lfo = Lfo::new(settings, 48_000.0);
            group.bench_with_input(BenchmarkId::new(waveform.name(), size), &size, |b, &size| {
                b.iter(|| {
                    let mut sum = 0.0f32;
                    for _ in 0..size {
                        sum += lfo.advance();
                    }
                    black_box(sum)
                })
            });
        }
    }

    group.finish();
}
