//! Benchmarks for low-level DSP primitives.

mod delay;
mod lfo;
mod mix;
mod smoother;

pub use delay::bench_delay;
pub use lfo::bench_lfo;
pub use mix::bench_mix;
pub use smoother::bench_smoother;
