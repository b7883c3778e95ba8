//! Parameter updates from outside the audio thread.
//!
//! A user-interface thread must never touch the engine directly while the
//! audio thread is processing. Instead it pushes [`ControlMessage`]s into a
//! lock-free single-producer single-consumer ring; the engine drains the
//! ring at the top of every block and applies each message to its targets.
//! Pushing never blocks and never allocates.

#[cfg(feature = "rtrb")]
use log::debug;
#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer};

use crate::dsp::lfo::{LfoSettings, Waveform};
#[cfg(feature = "rtrb")]
use crate::{engine::Param, error::DelayError};

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ControlMessage {
    BaseDelay(f32),
    Feedback(f32),
    DryWet(f32),
    LfoFrequency(f32),
    LfoWaveform(Waveform),
    LfoDepth(f32),
    EnableLfo(LfoSettings),
    DisableLfo,
    Reset,
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<ControlMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<ControlMessage> {
    fn pop(&mut self) -> Option<ControlMessage> {
        Consumer::pop(self).ok()
    }
}

/// Sending half of an engine's control channel.
///
/// Bounds are checked here, on the caller's thread, so a bad value is
/// reported to whoever produced it. Checks that need the engine's state
/// (such as "is the LFO on?") happen when the message is applied; refused
/// messages show up in `DelayEngine::rejected_controls`.
#[cfg(feature = "rtrb")]
pub struct DelayController {
    tx: Producer<ControlMessage>,
    max_delay: f32,
}

#[cfg(feature = "rtrb")]
impl DelayController {
    pub(crate) fn new(tx: Producer<ControlMessage>, max_delay: f32) -> Self {
        Self { tx, max_delay }
    }

    pub fn set_base_delay(&mut self, seconds: f32) -> Result<(), DelayError> {
        let seconds = Param::BaseDelay.check(seconds, self.max_delay)?;
        self.send(ControlMessage::BaseDelay(seconds))
    }

    pub fn set_feedback(&mut self, amount: f32) -> Result<(), DelayError> {
        let amount = Param::Feedback.check(amount, self.max_delay)?;
        self.send(ControlMessage::Feedback(amount))
    }

    pub fn set_dry_wet(&mut self, ratio: f32) -> Result<(), DelayError> {
        let ratio = Param::DryWet.check(ratio, self.max_delay)?;
        self.send(ControlMessage::DryWet(ratio))
    }

    pub fn set_lfo_frequency(&mut self, hz: f32) -> Result<(), DelayError> {
        let hz = Param::LfoFrequency.check(hz, self.max_delay)?;
        self.send(ControlMessage::LfoFrequency(hz))
    }

    pub fn set_lfo_waveform(&mut self, waveform: Waveform) -> Result<(), DelayError> {
        self.send(ControlMessage::LfoWaveform(waveform))
    }

    /// Raw selector form, as sent by simple button or serial front ends.
    pub fn set_lfo_waveform_index(&mut self, selector: u8) -> Result<(), DelayError> {
        let waveform = Waveform::try_from(selector)?;
        self.set_lfo_waveform(waveform)
    }

    pub fn set_lfo_depth(&mut self, seconds: f32) -> Result<(), DelayError> {
        let seconds = Param::LfoDepth.check(seconds, self.max_delay)?;
        self.send(ControlMessage::LfoDepth(seconds))
    }

    pub fn enable_lfo(&mut self, settings: LfoSettings) -> Result<(), DelayError> {
        Param::LfoFrequency.check(settings.frequency, self.max_delay)?;
        Param::LfoDepth.check(settings.depth, self.max_delay)?;
        self.send(ControlMessage::EnableLfo(settings))
    }

    pub fn disable_lfo(&mut self) -> Result<(), DelayError> {
        self.send(ControlMessage::DisableLfo)
    }

    pub fn reset(&mut self) -> Result<(), DelayError> {
        self.send(ControlMessage::Reset)
    }

    /// Delay capacity of the engine this controller drives.
    pub fn max_delay(&self) -> f32 {
        self.max_delay
    }

    fn send(&mut self, message: ControlMessage) -> Result<(), DelayError> {
        self.tx.push(message).map_err(|_| {
            debug!("control queue full, dropped {message:?}");
            DelayError::ControlQueueFull
        })
    }
}
