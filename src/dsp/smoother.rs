//! One-pole parameter smoothing.

/*
Parameter Smoothing
===================

A control value that jumps instantly (a knob turned, a button pressed)
produces an audible click or zipper noise when it drives a delay time or a
gain. The fix is to low-pass filter the control path: the caller edits a
TARGET, and the value the DSP actually uses (the CURRENT) glides toward it.

Vocabulary
----------

  target      The value most recently requested by a control call.

  current     The value the audio path reads. Only the smoother moves it.

  settle      Time constant tau of the glide. After tau seconds the current
  time        value has covered ~63% of the distance to the target, after
              5 tau it is within 1%.


The Math
--------

A single-pole IIR low-pass, one step per sample:

    alpha    = 1 - exp(-1 / (tau * sample_rate))
    current += alpha * (target - current)

Running that step n times in a row with a fixed target collapses to one
step with

    alpha_n  = 1 - (1 - alpha)^n

so we can update once per audio BLOCK and still honour the configured
settle time, whatever the block size. Control signals are sub-audio, so
holding them constant inside a block is inaudible.

    value
      T ┤            ___________________
        │        _.-'
        │     .-'
        │   .'
        │  /
      C ┼─┘
        └────────────────────────────────→ blocks

The response to a step is monotonic: alpha_n is always in [0, 1), so the
current value never overshoots the target.
*/

/// Distance below which the current value snaps onto its target.
const SNAP_EPSILON: f64 = 1e-6;

/// A (current, target) control pair.
///
/// Stored in f64: near the end of a glide the per-block step falls below
/// half an f32 ulp long before the distance falls below the snap
/// threshold, and an f32 pair would stop short of its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedValue {
    current: f64,
    target: f64,
}

impl SmoothedValue {
    /// Start settled at `value`.
    pub fn new(value: f32) -> Self {
        Self {
            current: value as f64,
            target: value as f64,
        }
    }

    /// Start at `current` and glide toward `target`.
    pub fn gliding(current: f32, target: f32) -> Self {
        Self {
            current: current as f64,
            target: target as f64,
        }
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current as f32
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target as f32
    }

    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target as f64;
    }

    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }

    #[inline]
    fn approach(&mut self, alpha: f64) {
        let distance = self.target - self.current;
        if distance.abs() <= SNAP_EPSILON {
            self.current = self.target;
        } else {
            self.current += alpha * distance;
        }
    }
}

/// Block-rate one-pole smoother shared by every control pair of an engine.
#[derive(Debug, Clone, Copy)]
pub struct Smoother {
    /// Per-sample retention `1 - alpha`, kept in f64 because alpha is tiny
    /// at high sample rates.
    retention: f64,
}

impl Smoother {
    /// Smoother settling with time constant `settle_seconds`.
    ///
    /// A non-positive settle time disables smoothing (targets apply on the
    /// next block).
    pub fn new(settle_seconds: f32, sample_rate: f32) -> Self {
        let samples = settle_seconds as f64 * sample_rate as f64;
        let retention = if samples > 0.0 {
            (-1.0 / samples).exp()
        } else {
            0.0
        };
        Self { retention }
    }

    /// `alpha = 1 - exp(-1 / (tau * sample_rate))`.
    pub fn per_sample_coefficient(&self) -> f64 {
        1.0 - self.retention
    }

    /// Coefficient equivalent to `frames` consecutive per-sample steps.
    pub fn block_coefficient(&self, frames: usize) -> f64 {
        if frames == 0 {
            return 0.0;
        }
        let exponent = i32::try_from(frames).unwrap_or(i32::MAX);
        1.0 - self.retention.powi(exponent)
    }

    /// Advance one pair by a block of `frames` samples.
    #[inline]
    pub fn smooth(&self, value: &mut SmoothedValue, frames: usize) {
        value.approach(self.block_coefficient(frames));
    }

    /// Advance several pairs with a coefficient computed once.
    pub fn smooth_all(&self, values: &mut [&mut SmoothedValue], frames: usize) {
        let alpha = self.block_coefficient(frames);
        for value in values.iter_mut() {
            value.approach(alpha);
        }
    }
}
