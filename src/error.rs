use thiserror::Error;

use crate::engine::Param;

/// Everything the engine can refuse.
///
/// Configuration errors leave the engine untouched: a rejected setter does
/// not move its target. Numeric overflow while processing is not an error,
/// samples are clamped to the 16-bit range instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DelayError {
    #[error("unsupported sample rate {0} Hz (expected 11025, 22050, 44100 or 48000)")]
    UnsupportedSampleRate(u32),

    #[error("unsupported channel count {0} (expected 1 or 2)")]
    UnsupportedChannels(usize),

    #[error("maximum delay must be finite and at least one frame long, got {0} s")]
    InvalidMaxDelay(f32),

    #[error("{param} value {value} outside allowed range {min}..{max}")]
    OutOfRange {
        param: Param,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("unknown waveform selector {0}")]
    InvalidWaveform(u8),

    #[error("LFO is disabled")]
    LfoDisabled,

    #[error("block of {len} samples is not a whole number of {channels}-channel frames")]
    MisalignedBlock { len: usize, channels: usize },

    #[error("could not allocate {slots} delay slots")]
    Allocation { slots: usize },

    #[error("control queue is full")]
    ControlQueueFull,
}
