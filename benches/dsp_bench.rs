//! Benchmarks for the delay primitives and the full engine.
//!
//! Run with: cargo bench
//!
//! Everything here runs on the audio thread, so it has to finish well
//! inside the block deadline.
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 frames  = 1.33ms deadline
//!   - 128 frames = 2.67ms deadline
//!   - 256 frames = 5.33ms deadline
//!   - 512 frames = 10.67ms deadline
//!
//! Benchmark groups:
//!   - dsp/*        Delay line, LFO, smoother and mix on their own
//!   - scenarios/*  The engine processing interleaved 16-bit blocks

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

criterion_group!(
    benches,
    dsp::bench_delay,
    dsp::bench_lfo,
    dsp::bench_smoother,
    dsp::bench_mix,
    scenarios::bench_engine,
);
criterion_main!(benches);
