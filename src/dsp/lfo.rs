//! Low Frequency Oscillator driving the delay-time modulation.

/*
Low Frequency Oscillators
=========================

An LFO is an oscillator running at sub-audio frequencies (here 0.01 Hz to
20 Hz). It never reaches the output directly: it moves the delay time, and
a moving delay time is what turns a plain echo into chorus or flanging.

Vocabulary
----------

  phase       Position inside one cycle, normalized to [0, 1). Advances by
              frequency / sample_rate every sample and wraps with
              phase -= floor(phase).

  bipolar     Raw waveform output, -1.0 to +1.0.

  unipolar    (bipolar + 1) / 2, 0.0 to 1.0. The delay can only be pushed
              further into the past, never ahead of the write head, so the
              modulation is unipolar.

  depth       How many seconds the unipolar value is scaled to. The engine
              adds depth * unipolar on top of the base delay.


Shapes (phase p in [0, 1))
--------------------------

    SINE        sin(2 pi p)                 smooth, the classic chorus sweep
    TRIANGLE    4 |p - 0.5| - 1             constant rate of change
    SQUARE      p >= 0.5 ? 1 : -1           jumps between two delay times
    SAWTOOTH    2 p - 1                     slow rise, instant reset

    TRIANGLE starts at +1 (p = 0), falls to -1 at p = 0.5 and climbs back:

     1 ┤╲      ╱╲      ╱
       │ ╲    ╱  ╲    ╱
    -1 ┤  ╲╱      ╲╱
       └──────────────────→ p

Square and sawtooth have hard edges. Fed into a delay time they produce
pitch blips; they are kept because they are useful as deliberate effects.
*/

use std::f64::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::smoother::{SmoothedValue, Smoother};
use crate::error::DelayError;

/// Slowest accepted LFO rate in Hz.
pub const MIN_FREQUENCY: f32 = 0.01;
/// Fastest accepted LFO rate in Hz.
pub const MAX_FREQUENCY: f32 = 20.0;
/// Largest accepted modulation depth in seconds.
pub const MAX_DEPTH: f32 = 1.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    Sine,
    Square,
    #[default]
    Triangle,
    Sawtooth,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Triangle,
        Waveform::Sawtooth,
    ];

    /// Bipolar value of this shape at `phase` in [0, 1).
    #[inline]
    pub fn sample(self, phase: f64) -> f32 {
        let value = match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Square => {
                if phase >= 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 4.0 * (phase - 0.5).abs() - 1.0,
            Waveform::Sawtooth => 2.0 * phase - 1.0,
        };
        value as f32
    }

    /// The next shape in selector order, wrapping around.
    pub fn next(self) -> Self {
        let index = u8::from(self) as usize;
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Triangle => "triangle",
            Waveform::Sawtooth => "sawtooth",
        }
    }
}

impl From<Waveform> for u8 {
    fn from(waveform: Waveform) -> u8 {
        match waveform {
            Waveform::Sine => 0,
            Waveform::Square => 1,
            Waveform::Triangle => 2,
            Waveform::Sawtooth => 3,
        }
    }
}

impl TryFrom<u8> for Waveform {
    type Error = DelayError;

    fn try_from(selector: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(selector as usize)
            .copied()
            .ok_or(DelayError::InvalidWaveform(selector))
    }
}

/// Convert bipolar signal (-1.0 to +1.0) to unipolar (0.0 to 1.0).
#[inline]
pub fn bipolar_to_unipolar(bipolar: f32) -> f32 {
    (bipolar + 1.0) * 0.5
}

/// Initial oscillator parameters.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfoSettings {
    /// Rate in Hz.
    pub frequency: f32,
    pub waveform: Waveform,
    /// Peak delay offset in seconds.
    pub depth: f32,
}

impl Default for LfoSettings {
    fn default() -> Self {
        Self {
            frequency: 1.0,
            waveform: Waveform::Triangle,
            depth: 0.01,
        }
    }
}

/// Phase-accumulator LFO with smoothed rate and depth.
#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f64,
    sample_period: f64,
    waveform: Waveform,
    frequency: SmoothedValue,
    depth: SmoothedValue,
}

impl Lfo {
    /// Oscillator already running at `settings`.
    pub fn new(settings: LfoSettings, sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            sample_period: 1.0 / sample_rate as f64,
            waveform: settings.waveform,
            frequency: SmoothedValue::new(settings.frequency),
            depth: SmoothedValue::new(settings.depth),
        }
    }

    /// Oscillator whose depth glides up from zero, for switching modulation
    /// on while audio is running.
    pub fn fading_in(settings: LfoSettings, sample_rate: f32) -> Self {
        let mut lfo = Self::new(settings, sample_rate);
        lfo.depth = SmoothedValue::gliding(0.0, settings.depth);
        lfo
    }

    /// Next delay offset in seconds, in `[0, depth]`.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        let bipolar = self.waveform.sample(self.phase);

        self.phase += self.frequency.current() as f64 * self.sample_period;
        self.phase -= self.phase.floor();

        bipolar_to_unipolar(bipolar) * self.depth.current()
    }

    /// Move rate and depth one block toward their targets.
    pub fn smooth(&mut self, smoother: &Smoother, frames: usize) {
        smoother.smooth_all(&mut [&mut self.frequency, &mut self.depth], frames);
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_period = 1.0 / sample_rate as f64;
    }

    pub fn reset_phase(&mut self) {
        self.phase = 0.0;
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn frequency(&self) -> &SmoothedValue {
        &self.frequency
    }

    pub fn depth(&self) -> &SmoothedValue {
        &self.depth
    }

    pub fn set_frequency_target(&mut self, hz: f32) {
        self.frequency.set_target(hz);
    }

    pub fn set_depth_target(&mut self, seconds: f32) {
        self.depth.set_target(seconds);
    }
}
