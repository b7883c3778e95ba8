//! The modulated feedback delay engine.
//!
//! One [`DelayEngine`] processes one interleaved 16-bit stream:
//!
//! ```text
//! input ──┬──────────────────────────────────────────── dry ──┐
//!         │                                                   │
//!         └──►(+)──► [delay memory] ──► all-pass read ── wet ─┴─► equal-power mix ──► output
//!              ▲                             │
//!              └────────── × feedback ◄──────┘
//!
//! delay time = smoothed base delay + LFO offset, clamped every frame
//! ```
//!
//! Control setters only ever move targets. The smoother moves the current
//! values once per block, inside [`DelayEngine::process_block`].

use std::fmt;
use std::ops::{Bound, RangeBounds};

use log::{debug, info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    control::{ControlMessage, MessageReceiver},
    dsp::{
        delay::DelayLine,
        lfo::{self, Lfo, LfoSettings, Waveform},
        mix::equal_power_mix,
        smoother::{SmoothedValue, Smoother},
    },
    error::DelayError,
    io::pcm::{self, Endianness},
    MAX_BLOCK_SIZE, SUPPORTED_SAMPLE_RATES,
};

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, RingBuffer};

/// Default settle time of the parameter smoother, in seconds.
pub const DEFAULT_SMOOTHING_TIME: f32 = 0.3;

/// Default capacity of the delay memory, in seconds.
pub const DEFAULT_MAX_DELAY: f32 = 1.5;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRate {
    Hz11025,
    Hz22050,
    Hz44100,
    Hz48000,
}

impl SampleRate {
    pub fn hz(self) -> u32 {
        match self {
            SampleRate::Hz11025 => SUPPORTED_SAMPLE_RATES[0],
            SampleRate::Hz22050 => SUPPORTED_SAMPLE_RATES[1],
            SampleRate::Hz44100 => SUPPORTED_SAMPLE_RATES[2],
            SampleRate::Hz48000 => SUPPORTED_SAMPLE_RATES[3],
        }
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = DelayError;

    fn try_from(hz: u32) -> Result<Self, Self::Error> {
        match hz {
            11_025 => Ok(SampleRate::Hz11025),
            22_050 => Ok(SampleRate::Hz22050),
            44_100 => Ok(SampleRate::Hz44100),
            48_000 => Ok(SampleRate::Hz48000),
            other => Err(DelayError::UnsupportedSampleRate(other)),
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn count(self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }
}

impl TryFrom<usize> for ChannelLayout {
    type Error = DelayError;

    fn try_from(channels: usize) -> Result<Self, Self::Error> {
        match channels {
            1 => Ok(ChannelLayout::Mono),
            2 => Ok(ChannelLayout::Stereo),
            other => Err(DelayError::UnsupportedChannels(other)),
        }
    }
}

/// A settable control, used for bound checks and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    BaseDelay,
    Feedback,
    DryWet,
    LfoFrequency,
    LfoDepth,
    SmoothingTime,
}

impl Param {
    /// Accepted range. Delay-like bounds depend on the engine's capacity.
    pub fn range(self, max_delay: f32) -> (Bound<f32>, Bound<f32>) {
        use Bound::{Excluded, Included};
        match self {
            Param::BaseDelay => (Excluded(0.0), Included(max_delay)),
            Param::Feedback => (Included(0.0), Excluded(1.0)),
            Param::DryWet => (Included(0.0), Included(1.0)),
            Param::LfoFrequency => (Included(lfo::MIN_FREQUENCY), Included(lfo::MAX_FREQUENCY)),
            Param::LfoDepth => (Excluded(0.0), Included(lfo::MAX_DEPTH)),
            Param::SmoothingTime => (Included(0.0), Included(10.0)),
        }
    }

    /// `value` if it is finite and in range, otherwise `OutOfRange`.
    /// Rejections are logged.
    pub fn check(self, value: f32, max_delay: f32) -> Result<f32, DelayError> {
        self.validate(value, max_delay).map_err(log_rejection)
    }

    /// Same test as [`check`](Self::check), without logging. Safe on the
    /// audio thread.
    pub fn validate(self, value: f32, max_delay: f32) -> Result<f32, DelayError> {
        let range = self.range(max_delay);
        if value.is_finite() && range.contains(&value) {
            return Ok(value);
        }
        Err(DelayError::OutOfRange {
            param: self,
            value,
            min: bound_value(range.0),
            max: bound_value(range.1),
        })
    }
}

fn bound_value(bound: Bound<f32>) -> f32 {
    match bound {
        Bound::Included(v) | Bound::Excluded(v) => v,
        Bound::Unbounded => f32::INFINITY,
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Param::BaseDelay => "base delay",
            Param::Feedback => "feedback",
            Param::DryWet => "dry/wet",
            Param::LfoFrequency => "LFO frequency",
            Param::LfoDepth => "LFO depth",
            Param::SmoothingTime => "smoothing time",
        };
        f.write_str(name)
    }
}

/// Control values applied when a stream opens.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelaySettings {
    /// Base delay in seconds.
    pub base_delay: f32,
    /// Fraction of the wet signal fed back into the line, `[0, 1)`.
    pub feedback: f32,
    /// 0.0 = dry only, 1.0 = wet only.
    pub dry_wet: f32,
    /// `None` runs without modulation.
    pub lfo: Option<LfoSettings>,
}

impl Default for DelaySettings {
    fn default() -> Self {
        Self {
            base_delay: 0.08,
            feedback: 0.1,
            dry_wet: 0.5,
            lfo: Some(LfoSettings::default()),
        }
    }
}

/// Everything [`DelayEngine::open`] needs.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayConfig {
    /// Hz, one of [`SUPPORTED_SAMPLE_RATES`].
    pub sample_rate: u32,
    /// 1 or 2, interleaved.
    pub channels: usize,
    /// Capacity of the delay memory in seconds.
    pub max_delay_seconds: f32,
    /// Settle time constant of the parameter smoother in seconds.
    pub smoothing_time: f32,
    pub settings: DelaySettings,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            max_delay_seconds: DEFAULT_MAX_DELAY,
            smoothing_time: DEFAULT_SMOOTHING_TIME,
            settings: DelaySettings::default(),
        }
    }
}

/// Optional modulation source owned by the engine.
#[derive(Debug, Clone)]
pub enum Modulation {
    Off,
    Lfo(Lfo),
}

impl Modulation {
    #[inline]
    fn advance(&mut self) -> f32 {
        match self {
            Modulation::Off => 0.0,
            Modulation::Lfo(lfo) => lfo.advance(),
        }
    }
}

pub struct DelayEngine {
    sample_rate: SampleRate,
    channels: ChannelLayout,
    max_delay: f32,
    smoothing_time: f32,
    smoother: Smoother,
    line: DelayLine,
    base_delay: SmoothedValue,
    feedback: SmoothedValue,
    dry_wet: SmoothedValue,
    modulation: Modulation,
    /// Decoded samples for `process_bytes`, one maximum block long.
    scratch: Vec<i16>,
    rejected_controls: u64,
    #[cfg(feature = "rtrb")]
    control_rx: Option<Consumer<ControlMessage>>,
}

impl DelayEngine {
    /// Validate `config`, allocate the delay memory and apply the initial
    /// settings. Nothing is left allocated on failure.
    pub fn open(config: DelayConfig) -> Result<Self, DelayError> {
        let sample_rate = SampleRate::try_from(config.sample_rate).map_err(log_rejection)?;
        let channels = ChannelLayout::try_from(config.channels).map_err(log_rejection)?;
        let max_delay = check_max_delay(config.max_delay_seconds)?;
        let smoothing_time = Param::SmoothingTime.check(config.smoothing_time, max_delay)?;

        let settings = config.settings;
        let base_delay = Param::BaseDelay.check(settings.base_delay, max_delay)?;
        let feedback = Param::Feedback.check(settings.feedback, max_delay)?;
        let dry_wet = Param::DryWet.check(settings.dry_wet, max_delay)?;
        let modulation = match settings.lfo {
            Some(lfo) => Modulation::Lfo(Lfo::new(
                check_lfo(lfo, max_delay)?,
                sample_rate.hz() as f32,
            )),
            None => Modulation::Off,
        };

        let line = allocate_line(sample_rate, channels, max_delay)?;
        let scratch = allocate_scratch(channels)?;

        info!(
            "opened delay: {} Hz, {} channel(s), {:.3} s capacity ({} slots)",
            sample_rate.hz(),
            channels.count(),
            max_delay,
            line.len()
        );

        Ok(Self {
            sample_rate,
            channels,
            max_delay,
            smoothing_time,
            smoother: Smoother::new(smoothing_time, sample_rate.hz() as f32),
            line,
            base_delay: SmoothedValue::new(base_delay),
            feedback: SmoothedValue::new(feedback),
            dry_wet: SmoothedValue::new(dry_wet),
            modulation,
            scratch,
            rejected_controls: 0,
            #[cfg(feature = "rtrb")]
            control_rx: None,
        })
    }

    /// Release the delay memory and oscillator.
    pub fn close(self) {
        info!(
            "closed delay ({} Hz, {} channel(s))",
            self.sample_rate.hz(),
            self.channels.count()
        );
    }

    /// Re-target the engine at another stream format.
    ///
    /// A no-op when nothing changed. Otherwise the delay memory is
    /// reallocated and all stream state (write head, interpolation state,
    /// LFO phase) restarts; control targets are kept. On error the engine is
    /// left exactly as it was.
    pub fn set_info(&mut self, sample_rate: u32, channels: usize) -> Result<(), DelayError> {
        if sample_rate == self.sample_rate.hz() && channels == self.channels.count() {
            return Ok(());
        }
        let rate = SampleRate::try_from(sample_rate).map_err(log_rejection)?;
        let layout = ChannelLayout::try_from(channels).map_err(log_rejection)?;

        let line = allocate_line(rate, layout, self.max_delay)?;
        let scratch = allocate_scratch(layout)?;

        self.sample_rate = rate;
        self.channels = layout;
        self.line = line;
        self.scratch = scratch;
        self.smoother = Smoother::new(self.smoothing_time, rate.hz() as f32);
        if let Modulation::Lfo(lfo) = &mut self.modulation {
            lfo.set_sample_rate(rate.hz() as f32);
            lfo.reset_phase();
        }

        info!("stream format changed to {} Hz, {} channel(s)", rate.hz(), channels);
        Ok(())
    }

    /// Process one block of interleaved samples in place.
    ///
    /// Returns the number of frames processed. The block may be any length
    /// that is a whole number of frames; a short block is processed exactly
    /// like a full one.
    pub fn process_block(&mut self, block: &mut [i16]) -> Result<usize, DelayError> {
        let channels = self.channels.count();
        if block.len() % channels != 0 {
            return Err(DelayError::MisalignedBlock {
                len: block.len(),
                channels,
            });
        }
        Ok(self.render(block))
    }

    /// Process a block of raw PCM bytes in place.
    ///
    /// Returns frames processed. Bytes are decoded with the given byte
    /// order, processed in chunks of at most [`MAX_BLOCK_SIZE`] frames and
    /// encoded back in the same order.
    pub fn process_bytes(
        &mut self,
        bytes: &mut [u8],
        endianness: Endianness,
    ) -> Result<usize, DelayError> {
        let channels = self.channels.count();
        if bytes.len() % (2 * channels) != 0 {
            return Err(DelayError::MisalignedBlock {
                len: bytes.len(),
                channels,
            });
        }

        let mut scratch = std::mem::take(&mut self.scratch);
        let mut frames = 0;
        for chunk in bytes.chunks_mut(scratch.len() * 2) {
            let samples = &mut scratch[..chunk.len() / 2];
            pcm::decode_into(chunk, samples, endianness);
            frames += self.render(samples);
            pcm::encode_into(samples, chunk, endianness);
        }
        self.scratch = scratch;

        Ok(frames)
    }

    /// The block processor proper. `block` is frame-aligned.
    fn render(&mut self, block: &mut [i16]) -> usize {
        let channels = self.channels.count();
        let frames = block.len() / channels;

        self.drain_controls();
        self.smooth(frames);

        let sample_rate = self.sample_rate.hz() as f64;
        let max_frames = self.max_delay as f64 * sample_rate;
        let base_delay = self.base_delay.current();
        let feedback = self.feedback.current();
        let dry_wet = self.dry_wet.current();

        for frame in block.chunks_exact_mut(channels) {
            let offset = self.modulation.advance();
            // At least one frame: this frame's slot has not been written yet.
            let delay_frames = ((base_delay + offset) as f64 * sample_rate)
                .max(1.0)
                .min(max_frames);

            for (channel, sample) in frame.iter_mut().enumerate() {
                let dry = pcm::i16_to_f32(*sample);
                let wet = self.line.read(channel, delay_frames);
                self.line.write(channel, dry + wet * feedback);
                *sample = pcm::f32_to_i16(equal_power_mix(wet, dry, dry_wet));
            }
            self.line.advance();
        }

        frames
    }

    fn smooth(&mut self, frames: usize) {
        self.smoother.smooth_all(
            &mut [&mut self.base_delay, &mut self.feedback, &mut self.dry_wet],
            frames,
        );
        if let Modulation::Lfo(lfo) = &mut self.modulation {
            lfo.smooth(&self.smoother, frames);
        }
    }

    #[cfg(feature = "rtrb")]
    fn drain_controls(&mut self) {
        if let Some(mut rx) = self.control_rx.take() {
            self.apply_messages(&mut rx);
            self.control_rx = Some(rx);
        }
    }

    #[cfg(not(feature = "rtrb"))]
    fn drain_controls(&mut self) {}

    /// Open a lock-free control channel for another thread.
    ///
    /// Messages pushed through the returned controller are applied at the
    /// start of the next block. Replaces any previous channel.
    #[cfg(feature = "rtrb")]
    pub fn controller(&mut self, capacity: usize) -> crate::control::DelayController {
        let (tx, rx) = RingBuffer::new(capacity);
        self.control_rx = Some(rx);
        info!("control channel opened ({capacity} messages)");
        crate::control::DelayController::new(tx, self.max_delay)
    }

    /// Apply every pending message from `rx`. Messages the engine refuses
    /// are counted in [`rejected_controls`](Self::rejected_controls).
    ///
    /// Nothing is logged, so this is safe to call from the audio callback.
    pub fn apply_messages<R: MessageReceiver>(&mut self, rx: &mut R) {
        while let Some(message) = rx.pop() {
            if self.apply_quietly(message).is_err() {
                self.rejected_controls += 1;
            }
        }
    }

    /// [`apply`](Self::apply) without any logging.
    fn apply_quietly(&mut self, message: ControlMessage) -> Result<(), DelayError> {
        let max_delay = self.max_delay;
        match message {
            ControlMessage::BaseDelay(seconds) => {
                let seconds = Param::BaseDelay.validate(seconds, max_delay)?;
                self.base_delay.set_target(seconds);
            }
            ControlMessage::Feedback(amount) => {
                let amount = Param::Feedback.validate(amount, max_delay)?;
                self.feedback.set_target(amount);
            }
            ControlMessage::DryWet(ratio) => {
                let ratio = Param::DryWet.validate(ratio, max_delay)?;
                self.dry_wet.set_target(ratio);
            }
            ControlMessage::LfoFrequency(hz) => {
                let hz = Param::LfoFrequency.validate(hz, max_delay)?;
                self.lfo_mut()?.set_frequency_target(hz);
            }
            ControlMessage::LfoWaveform(waveform) => self.lfo_mut()?.set_waveform(waveform),
            ControlMessage::LfoDepth(seconds) => {
                let seconds = Param::LfoDepth.validate(seconds, max_delay)?;
                self.lfo_mut()?.set_depth_target(seconds.min(max_delay));
            }
            ControlMessage::EnableLfo(settings) => {
                let settings = validate_lfo(settings, max_delay)?;
                self.modulation =
                    Modulation::Lfo(Lfo::fading_in(settings, self.sample_rate.hz() as f32));
            }
            ControlMessage::DisableLfo => self.modulation = Modulation::Off,
            ControlMessage::Reset => self.reset(),
        }
        Ok(())
    }

    /// Apply one control message, as if the matching setter was called.
    pub fn apply(&mut self, message: ControlMessage) -> Result<(), DelayError> {
        match message {
            ControlMessage::BaseDelay(seconds) => self.set_base_delay(seconds),
            ControlMessage::Feedback(amount) => self.set_feedback(amount),
            ControlMessage::DryWet(ratio) => self.set_dry_wet(ratio),
            ControlMessage::LfoFrequency(hz) => self.set_lfo_frequency(hz),
            ControlMessage::LfoWaveform(waveform) => self.set_lfo_waveform(waveform),
            ControlMessage::LfoDepth(seconds) => self.set_lfo_depth(seconds),
            ControlMessage::EnableLfo(settings) => self.enable_lfo(settings),
            ControlMessage::DisableLfo => {
                self.disable_lfo();
                Ok(())
            }
            ControlMessage::Reset => {
                self.reset();
                Ok(())
            }
        }
    }

    // --- Setters: targets only ---

    pub fn set_base_delay(&mut self, seconds: f32) -> Result<(), DelayError> {
        let seconds = Param::BaseDelay.check(seconds, self.max_delay)?;
        self.base_delay.set_target(seconds);
        debug!("base delay target {seconds:.4} s");
        Ok(())
    }

    pub fn set_feedback(&mut self, amount: f32) -> Result<(), DelayError> {
        let amount = Param::Feedback.check(amount, self.max_delay)?;
        self.feedback.set_target(amount);
        debug!("feedback target {amount:.3}");
        Ok(())
    }

    pub fn set_dry_wet(&mut self, ratio: f32) -> Result<(), DelayError> {
        let ratio = Param::DryWet.check(ratio, self.max_delay)?;
        self.dry_wet.set_target(ratio);
        debug!("dry/wet target {ratio:.3}");
        Ok(())
    }

    pub fn set_lfo_frequency(&mut self, hz: f32) -> Result<(), DelayError> {
        let hz = Param::LfoFrequency.check(hz, self.max_delay)?;
        self.lfo_mut()?.set_frequency_target(hz);
        debug!("LFO frequency target {hz:.2} Hz");
        Ok(())
    }

    pub fn set_lfo_waveform(&mut self, waveform: Waveform) -> Result<(), DelayError> {
        self.lfo_mut()?.set_waveform(waveform);
        debug!("LFO waveform {}", waveform.name());
        Ok(())
    }

    /// Accepts `(0, 1]` seconds; the stored target is capped at the delay
    /// capacity.
    pub fn set_lfo_depth(&mut self, seconds: f32) -> Result<(), DelayError> {
        let seconds = Param::LfoDepth.check(seconds, self.max_delay)?;
        let max_delay = self.max_delay;
        self.lfo_mut()?.set_depth_target(seconds.min(max_delay));
        debug!("LFO depth target {seconds:.4} s");
        Ok(())
    }

    /// Switch modulation on. A running LFO is replaced; the new one starts
    /// at zero depth and glides to `settings.depth`.
    pub fn enable_lfo(&mut self, settings: LfoSettings) -> Result<(), DelayError> {
        let settings = check_lfo(settings, self.max_delay)?;
        self.modulation = Modulation::Lfo(Lfo::fading_in(settings, self.sample_rate.hz() as f32));
        debug!(
            "LFO on: {} at {:.2} Hz, depth {:.4} s",
            settings.waveform.name(),
            settings.frequency,
            settings.depth
        );
        Ok(())
    }

    pub fn disable_lfo(&mut self) {
        self.modulation = Modulation::Off;
        debug!("LFO off");
    }

    /// Silence the delay memory and rewind the LFO. Parameters are kept.
    pub fn reset(&mut self) {
        self.line.reset();
        if let Modulation::Lfo(lfo) = &mut self.modulation {
            lfo.reset_phase();
        }
    }

    fn lfo_mut(&mut self) -> Result<&mut Lfo, DelayError> {
        match &mut self.modulation {
            Modulation::Lfo(lfo) => Ok(lfo),
            Modulation::Off => Err(DelayError::LfoDisabled),
        }
    }

    fn lfo(&self) -> Option<&Lfo> {
        match &self.modulation {
            Modulation::Lfo(lfo) => Some(lfo),
            Modulation::Off => None,
        }
    }

    // --- Getters: current (smoothed) values ---

    pub fn base_delay(&self) -> f32 {
        self.base_delay.current()
    }

    pub fn feedback(&self) -> f32 {
        self.feedback.current()
    }

    pub fn dry_wet(&self) -> f32 {
        self.dry_wet.current()
    }

    pub fn lfo_frequency(&self) -> Option<f32> {
        self.lfo().map(|lfo| lfo.frequency().current())
    }

    pub fn lfo_depth(&self) -> Option<f32> {
        self.lfo().map(|lfo| lfo.depth().current())
    }

    pub fn lfo_waveform(&self) -> Option<Waveform> {
        self.lfo().map(Lfo::waveform)
    }

    pub fn is_lfo_enabled(&self) -> bool {
        matches!(self.modulation, Modulation::Lfo(_))
    }

    // --- Target getters ---

    pub fn base_delay_target(&self) -> f32 {
        self.base_delay.target()
    }

    pub fn feedback_target(&self) -> f32 {
        self.feedback.target()
    }

    pub fn dry_wet_target(&self) -> f32 {
        self.dry_wet.target()
    }

    pub fn lfo_frequency_target(&self) -> Option<f32> {
        self.lfo().map(|lfo| lfo.frequency().target())
    }

    pub fn lfo_depth_target(&self) -> Option<f32> {
        self.lfo().map(|lfo| lfo.depth().target())
    }

    // --- Stream facts ---

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.hz()
    }

    pub fn channels(&self) -> usize {
        self.channels.count()
    }

    pub fn max_delay(&self) -> f32 {
        self.max_delay
    }

    /// Slot the next frame's channel 0 will be written to.
    pub fn write_index(&self) -> usize {
        self.line.write_index()
    }

    /// Size of the delay memory in slots.
    pub fn memory_len(&self) -> usize {
        self.line.len()
    }

    /// Control messages refused since open.
    pub fn rejected_controls(&self) -> u64 {
        self.rejected_controls
    }
}

fn log_rejection(error: DelayError) -> DelayError {
    warn!("{error}");
    error
}

fn check_max_delay(seconds: f32) -> Result<f32, DelayError> {
    if seconds.is_finite() && seconds > 0.0 {
        Ok(seconds)
    } else {
        Err(log_rejection(DelayError::InvalidMaxDelay(seconds)))
    }
}

fn check_lfo(settings: LfoSettings, max_delay: f32) -> Result<LfoSettings, DelayError> {
    validate_lfo(settings, max_delay).map_err(log_rejection)
}

fn validate_lfo(settings: LfoSettings, max_delay: f32) -> Result<LfoSettings, DelayError> {
    let frequency = Param::LfoFrequency.validate(settings.frequency, max_delay)?;
    let depth = Param::LfoDepth.validate(settings.depth, max_delay)?;
    Ok(LfoSettings {
        frequency,
        waveform: settings.waveform,
        depth: depth.min(max_delay),
    })
}

/// Delay memory for `max_delay` seconds plus one maximum block of slack.
fn allocate_line(
    sample_rate: SampleRate,
    channels: ChannelLayout,
    max_delay: f32,
) -> Result<DelayLine, DelayError> {
    let exact_frames = max_delay as f64 * sample_rate.hz() as f64;
    // The shortest usable delay is one frame.
    if exact_frames < 1.0 {
        return Err(log_rejection(DelayError::InvalidMaxDelay(max_delay)));
    }
    let delay_frames = exact_frames.ceil();
    if delay_frames > (usize::MAX / 4) as f64 {
        return Err(log_rejection(DelayError::Allocation { slots: usize::MAX }));
    }
    DelayLine::new(delay_frames as usize + MAX_BLOCK_SIZE, channels.count()).map_err(log_rejection)
}

fn allocate_scratch(channels: ChannelLayout) -> Result<Vec<i16>, DelayError> {
    let slots = MAX_BLOCK_SIZE * channels.count();
    let mut scratch = Vec::new();
    scratch
        .try_reserve_exact(slots)
        .map_err(|_| log_rejection(DelayError::Allocation { slots }))?;
    scratch.resize(slots, 0);
    Ok(scratch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dry_config(channels: usize) -> DelayConfig {
        DelayConfig {
            sample_rate: 48_000,
            channels,
            max_delay_seconds: 0.5,
            smoothing_time: DEFAULT_SMOOTHING_TIME,
            settings: DelaySettings {
                base_delay: 0.001,
                feedback: 0.0,
                dry_wet: 0.0,
                lfo: None,
            },
        }
    }

    #[test]
    fn test_open_close_every_supported_format() {
        for rate in SUPPORTED_SAMPLE_RATES {
            for channels in [1, 2] {
                let engine = DelayEngine::open(DelayConfig {
                    sample_rate: rate,
                    channels,
                    ..DelayConfig::default()
                })
                .unwrap();
                assert_eq!(engine.sample_rate(), rate);
                assert_eq!(engine.channels(), channels);
                assert_eq!(engine.memory_len() % channels, 0);
                engine.close();
            }
        }
    }

    #[test]
    fn test_open_rejects_bad_formats() {
        let bad_rate = DelayConfig {
            sample_rate: 96_000,
            ..DelayConfig::default()
        };
        assert_eq!(
            DelayEngine::open(bad_rate).err(),
            Some(DelayError::UnsupportedSampleRate(96_000))
        );

        let bad_channels = DelayConfig {
            channels: 6,
            ..DelayConfig::default()
        };
        assert_eq!(
            DelayEngine::open(bad_channels).err(),
            Some(DelayError::UnsupportedChannels(6))
        );

        let bad_delay = DelayConfig {
            max_delay_seconds: 0.0,
            ..DelayConfig::default()
        };
        assert!(matches!(
            DelayEngine::open(bad_delay),
            Err(DelayError::InvalidMaxDelay(_))
        ));
    }

    #[test]
    fn test_open_rejects_out_of_range_settings() {
        let mut config = DelayConfig::default();
        config.settings.base_delay = 2.0;
        assert!(matches!(
            DelayEngine::open(config),
            Err(DelayError::OutOfRange {
                param: Param::BaseDelay,
                ..
            })
        ));
    }

    #[test]
    fn test_open_oversized_memory_fails_without_engine() {
        let config = DelayConfig {
            max_delay_seconds: 1e15,
            ..DelayConfig::default()
        };
        assert!(matches!(
            DelayEngine::open(config),
            Err(DelayError::Allocation { .. })
        ));
    }

    #[test]
    fn test_capacity_under_one_frame_is_refused() {
        let tiny = DelayConfig {
            sample_rate: 11_025,
            channels: 1,
            max_delay_seconds: 5e-5,
            settings: DelaySettings {
                base_delay: 5e-5,
                lfo: None,
                ..DelaySettings::default()
            },
            ..DelayConfig::default()
        };
        assert!(matches!(
            DelayEngine::open(tiny),
            Err(DelayError::InvalidMaxDelay(_))
        ));

        // 2.4 frames at 48 kHz is usable, 0.55 at 11.025 kHz is not.
        let mut engine = DelayEngine::open(DelayConfig {
            sample_rate: 48_000,
            ..tiny
        })
        .unwrap();
        assert!(matches!(
            engine.set_info(11_025, 1),
            Err(DelayError::InvalidMaxDelay(_))
        ));
        assert_eq!(engine.sample_rate(), 48_000);

        let mut block = vec![1_000i16; 64];
        assert_eq!(engine.process_block(&mut block).unwrap(), 64);
    }

    #[test]
    fn test_defaults() {
        let engine = DelayEngine::open(DelayConfig::default()).unwrap();
        assert_eq!(engine.base_delay(), 0.08);
        assert_eq!(engine.feedback(), 0.1);
        assert_eq!(engine.dry_wet(), 0.5);
        assert_eq!(engine.lfo_frequency(), Some(1.0));
        assert_eq!(engine.lfo_waveform(), Some(Waveform::Triangle));
        assert_eq!(engine.lfo_depth(), Some(0.01));
    }

    #[test]
    fn test_rejected_setters_leave_targets_alone() {
        let mut engine = DelayEngine::open(DelayConfig::default()).unwrap();

        assert!(engine.set_base_delay(0.0).is_err());
        assert!(engine.set_base_delay(1.6).is_err());
        assert!(engine.set_feedback(1.0).is_err());
        assert!(engine.set_feedback(-0.1).is_err());
        assert!(engine.set_dry_wet(1.01).is_err());
        assert!(engine.set_dry_wet(f32::NAN).is_err());
        assert!(engine.set_lfo_frequency(0.001).is_err());
        assert!(engine.set_lfo_frequency(25.0).is_err());
        assert!(engine.set_lfo_depth(0.0).is_err());
        assert!(engine.set_lfo_depth(1.5).is_err());

        assert_eq!(engine.base_delay_target(), 0.08);
        assert_eq!(engine.feedback_target(), 0.1);
        assert_eq!(engine.dry_wet_target(), 0.5);
        assert_eq!(engine.lfo_frequency_target(), Some(1.0));
        assert_eq!(engine.lfo_depth_target(), Some(0.01));
    }

    #[test]
    fn test_setters_move_target_not_current() {
        let mut engine = DelayEngine::open(DelayConfig::default()).unwrap();
        engine.set_base_delay(1.5).unwrap();
        engine.set_feedback(0.0).unwrap();
        engine.set_dry_wet(1.0).unwrap();

        assert_eq!(engine.base_delay_target(), 1.5);
        assert_eq!(engine.base_delay(), 0.08);
        assert_eq!(engine.feedback(), 0.1);
        assert_eq!(engine.dry_wet(), 0.5);

        let mut block = vec![0i16; 256];
        engine.process_block(&mut block).unwrap();
        assert!(engine.base_delay() > 0.08 && engine.base_delay() < 1.5);
    }

    #[test]
    fn test_depth_target_capped_at_capacity() {
        let config = DelayConfig {
            max_delay_seconds: 0.25,
            settings: DelaySettings {
                base_delay: 0.1,
                ..DelaySettings::default()
            },
            ..DelayConfig::default()
        };
        let mut engine = DelayEngine::open(config).unwrap();
        engine.set_lfo_depth(0.9).unwrap();
        assert_eq!(engine.lfo_depth_target(), Some(0.25));
    }

    #[test]
    fn test_lfo_setters_need_an_lfo() {
        let mut engine = DelayEngine::open(dry_config(1)).unwrap();
        assert_eq!(engine.set_lfo_frequency(2.0), Err(DelayError::LfoDisabled));
        assert_eq!(engine.set_lfo_waveform(Waveform::Sine), Err(DelayError::LfoDisabled));
        assert_eq!(engine.lfo_frequency(), None);

        engine.enable_lfo(LfoSettings::default()).unwrap();
        assert!(engine.is_lfo_enabled());
        assert_eq!(engine.lfo_depth(), Some(0.0));
        assert_eq!(engine.lfo_depth_target(), Some(0.01));
        engine.set_lfo_waveform(Waveform::Sawtooth).unwrap();
        assert_eq!(engine.lfo_waveform(), Some(Waveform::Sawtooth));

        engine.disable_lfo();
        assert!(!engine.is_lfo_enabled());
    }

    #[test]
    fn test_misaligned_block_is_rejected() {
        let mut engine = DelayEngine::open(dry_config(2)).unwrap();
        let mut block = vec![0i16; 7];
        assert_eq!(
            engine.process_block(&mut block),
            Err(DelayError::MisalignedBlock { len: 7, channels: 2 })
        );
        assert_eq!(engine.write_index(), 0);

        let mut bytes = vec![0u8; 6];
        assert!(engine.process_bytes(&mut bytes, Endianness::Little).is_err());
    }

    #[test]
    fn test_returns_frame_count() {
        let mut engine = DelayEngine::open(dry_config(2)).unwrap();
        let mut block = vec![0i16; 128];
        assert_eq!(engine.process_block(&mut block), Ok(64));
        assert_eq!(engine.write_index(), 128);

        let mut empty: Vec<i16> = Vec::new();
        assert_eq!(engine.process_block(&mut empty), Ok(0));
    }

    #[test]
    fn test_dry_only_is_identity() {
        let mut engine = DelayEngine::open(dry_config(2)).unwrap();
        let input: Vec<i16> = (0..512).map(|i| ((i * 977) % 65_536 - 32_768) as i16).collect();
        let mut block = input.clone();
        engine.process_block(&mut block).unwrap();
        assert_eq!(block, input);
    }

    #[test]
    fn test_wet_only_delays_by_base_delay() {
        let mut config = dry_config(1);
        config.settings.dry_wet = 1.0;
        let mut engine = DelayEngine::open(config).unwrap();

        // 0.001 s at 48 kHz = 48 frames.
        let input: Vec<i16> = (0..300).map(|i| (i * 100) as i16).collect();
        let mut block = input.clone();
        engine.process_block(&mut block).unwrap();

        assert!(block[..48].iter().all(|&s| s == 0));
        assert_eq!(&block[48..], &input[..300 - 48]);
    }

    #[test]
    fn test_bytes_match_samples() {
        let input: Vec<i16> = (0..4_800).map(|i| ((i as f32 * 0.05).sin() * 12_000.0) as i16).collect();

        let mut config = dry_config(2);
        config.settings = DelaySettings::default();
        let mut by_samples = DelayEngine::open(config).unwrap();
        let mut by_bytes = DelayEngine::open(config).unwrap();

        let mut samples = input.clone();
        for block in samples.chunks_mut(1_024) {
            by_samples.process_block(block).unwrap();
        }

        let mut bytes: Vec<u8> = input.iter().flat_map(|s| s.to_be_bytes()).collect();
        for block in bytes.chunks_mut(2_048) {
            by_bytes.process_bytes(block, Endianness::Big).unwrap();
        }

        let decoded: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_set_info_reallocates_and_keeps_targets() {
        let mut engine = DelayEngine::open(DelayConfig::default()).unwrap();
        engine.set_feedback(0.4).unwrap();
        let mut block = vec![1_000i16; 256];
        engine.process_block(&mut block).unwrap();
        assert_ne!(engine.write_index(), 0);

        engine.set_info(22_050, 1).unwrap();
        assert_eq!(engine.sample_rate(), 22_050);
        assert_eq!(engine.channels(), 1);
        assert_eq!(engine.write_index(), 0);
        assert_eq!(engine.feedback_target(), 0.4);

        assert!(engine.set_info(8_000, 1).is_err());
        assert_eq!(engine.sample_rate(), 22_050);

        let before = engine.memory_len();
        engine.set_info(22_050, 1).unwrap();
        assert_eq!(engine.memory_len(), before);
    }

    #[test]
    fn test_reset_silences_memory() {
        let mut config = dry_config(1);
        config.settings.dry_wet = 1.0;
        let mut engine = DelayEngine::open(config).unwrap();

        let mut block = vec![5_000i16; 96];
        engine.process_block(&mut block).unwrap();
        engine.reset();

        let mut silence = vec![0i16; 96];
        engine.process_block(&mut silence).unwrap();
        assert!(silence.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_apply_counts_refused_messages() {
        struct Queue(Vec<ControlMessage>);
        impl MessageReceiver for Queue {
            fn pop(&mut self) -> Option<ControlMessage> {
                if self.0.is_empty() {
                    None
                } else {
                    Some(self.0.remove(0))
                }
            }
        }

        let mut engine = DelayEngine::open(dry_config(1)).unwrap();
        let mut queue = Queue(vec![
            ControlMessage::Feedback(0.5),
            ControlMessage::LfoFrequency(3.0),
            ControlMessage::DryWet(2.0),
        ]);
        engine.apply_messages(&mut queue);
        assert_eq!(engine.feedback_target(), 0.5);
        assert_eq!(engine.rejected_controls(), 2);
    }
}
