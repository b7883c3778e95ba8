//! State shared between the audio callback and the UI thread
//!
//! Everything here that crosses threads is `Copy`, so the audio callback
//! reports without allocating.

use mod_delay::{DelayEngine, DelaySettings, LfoSettings, Waveform};

/// Stream format the engine was opened with
#[derive(Clone, Copy, Debug)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LfoSnapshot {
    pub frequency: f32,
    pub waveform: Waveform,
    pub depth: f32,
}

/// Current (smoothed) engine values, sent once per audio callback
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EngineSnapshot {
    pub base_delay: f32,
    pub feedback: f32,
    pub dry_wet: f32,
    /// `None` while modulation is off
    pub lfo: Option<LfoSnapshot>,
    /// Control messages the engine refused
    pub rejected_controls: u64,
    /// Callbacks that found the capture ring short
    pub underruns: u64,
}

impl EngineSnapshot {
    pub fn capture(engine: &DelayEngine, underruns: u64) -> Self {
        let lfo = match (
            engine.lfo_frequency(),
            engine.lfo_waveform(),
            engine.lfo_depth(),
        ) {
            (Some(frequency), Some(waveform), Some(depth)) => Some(LfoSnapshot {
                frequency,
                waveform,
                depth,
            }),
            _ => None,
        };

        Self {
            base_delay: engine.base_delay(),
            feedback: engine.feedback(),
            dry_wet: engine.dry_wet(),
            lfo,
            rejected_controls: engine.rejected_controls(),
            underruns,
        }
    }
}

/// Step sizes and wrap points of the front-panel keys
const BASE_DELAY_STEP: f32 = 0.1;
const BASE_DELAY_WRAP: f32 = 0.001;
const LFO_FREQUENCY_STEP: f32 = 0.1;
const LFO_FREQUENCY_MAX: f32 = 10.0;
const LFO_FREQUENCY_WRAP: f32 = 0.01;
const FEEDBACK_STEP: f32 = 0.05;
const FEEDBACK_MAX: f32 = 0.95;
const DRY_WET_STEP: f32 = 0.1;

/// Targets as the UI last sent them. Each key press steps one of these and
/// wraps back to the bottom of its range, like a single-button panel.
#[derive(Clone, Copy, Debug)]
pub struct Controls {
    pub base_delay: f32,
    pub feedback: f32,
    pub dry_wet: f32,
    pub lfo: LfoSettings,
    pub lfo_enabled: bool,
    max_delay: f32,
}

impl Controls {
    pub fn new(settings: DelaySettings, max_delay: f32) -> Self {
        Self {
            base_delay: settings.base_delay,
            feedback: settings.feedback,
            dry_wet: settings.dry_wet,
            lfo: settings.lfo.unwrap_or_default(),
            lfo_enabled: settings.lfo.is_some(),
            max_delay,
        }
    }

    pub fn step_base_delay(&mut self) -> f32 {
        let next = on_grid(self.base_delay + BASE_DELAY_STEP);
        self.base_delay = if next > self.max_delay { BASE_DELAY_WRAP } else { next };
        self.base_delay
    }

    pub fn step_lfo_frequency(&mut self) -> f32 {
        let next = on_grid(self.lfo.frequency + LFO_FREQUENCY_STEP);
        self.lfo.frequency = if next > LFO_FREQUENCY_MAX {
            LFO_FREQUENCY_WRAP
        } else {
            next
        };
        self.lfo.frequency
    }

    pub fn step_waveform(&mut self) -> Waveform {
        self.lfo.waveform = self.lfo.waveform.next();
        self.lfo.waveform
    }

    pub fn step_feedback(&mut self) -> f32 {
        let next = on_grid(self.feedback + FEEDBACK_STEP);
        self.feedback = if next > FEEDBACK_MAX { 0.0 } else { next };
        self.feedback
    }

    pub fn step_dry_wet(&mut self) -> f32 {
        let next = on_grid(self.dry_wet + DRY_WET_STEP);
        self.dry_wet = if next > 1.0 { 0.0 } else { next };
        self.dry_wet
    }

    pub fn toggle_lfo(&mut self) -> bool {
        self.lfo_enabled = !self.lfo_enabled;
        self.lfo_enabled
    }
}

/// Repeated float steps drift; keep key-driven values on a 1/1000 grid.
fn on_grid(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}
