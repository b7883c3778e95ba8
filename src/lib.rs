pub mod control; // Cross-thread parameter updates
pub mod dsp;
pub mod engine;
pub mod error;
pub mod io;

pub use dsp::lfo::{LfoSettings, Waveform};
pub use engine::{ChannelLayout, DelayConfig, DelayEngine, DelaySettings, SampleRate};
pub use error::DelayError;

#[cfg(feature = "rtrb")]
pub use control::DelayController;

/// Largest block the engine is sized for. Also the slack added to the
/// delay memory so a block's writes never lap its reads.
pub const MAX_BLOCK_SIZE: usize = 2048;

/// Sample rates accepted at open time, in Hz.
pub const SUPPORTED_SAMPLE_RATES: [u32; 4] = [11_025, 22_050, 44_100, 48_000];
