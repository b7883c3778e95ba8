//! Low-level DSP primitives used by the delay engine.
//!
//! These components are allocation-free once constructed and realtime-safe.
//! They stay focused on the signal-processing math; the engine layers
//! parameter validation, control messages and block orchestration on top.

/// Interleaved circular delay memory with all-pass fractional reads.
pub mod delay;
/// Low frequency oscillator for delay-time modulation.
pub mod lfo;
/// Equal-power dry/wet mixing.
pub mod mix;
/// Block-rate one-pole parameter smoothing.
pub mod smoother;

pub use lfo::{Lfo, LfoSettings, Waveform};
pub use smoother::{SmoothedValue, Smoother};
