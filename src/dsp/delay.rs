//! Interleaved circular delay memory with all-pass fractional reads.

/*
Delay Line
==========

The delay memory is one flat ring of signed 16-bit slots holding every
channel interleaved, exactly like the PCM stream itself:

    slot   0    1    2    3    4    5    6   ...
          L0   R0   L1   R1   L2   R2   L3   ...

Channel c of frame f lives in slot f * channels + c, so consecutive samples
of one channel are `channels` slots apart. The write head always points at
channel 0 of the next frame and moves `channels` slots per frame.


Reading in the Past
-------------------

For a delay of D frames (D may be fractional), the read position of channel
c is

    read = write_index + c - D * channels

Working in frames rather than slots keeps every read on the right channel's
stride by construction: the whole part is wrapped modulo the number of
frames and then expanded back to a slot.

    older ◄──────────────────────────────────── newer
          ... [ A ]──frac──x──────[ B ] ... [write]
                  └── read position

A is the older neighbour, B = A + one frame is the newer one.


All-Pass Interpolation
----------------------

Linear interpolation low-passes the delayed signal, and the amount changes
as the delay moves. A first-order all-pass has a flat magnitude response
and only shifts phase, so a sweeping chorus keeps its brightness:

    alpha = frac / (2 - frac)
    y[n]  = alpha * (B - y[n-1]) + A

y[n-1] is the previous output of the same channel, kept across blocks.

  frac = 0      alpha = 0, y = A                 (integer delay, exact)
  frac -> 1     alpha -> 1, y = B + A - y[n-1]   (pole near -1)

Near-integer delays are snapped onto the integer so a delay that is
"really" whole never parks the recurrence next to its pole.


Minimum Delay
-------------

Each frame is read before it is written. A delay under one frame would
address the slot about to be overwritten, which still holds data from a
full lap ago. Callers clamp the delay to at least one frame.
*/

use crate::{
    error::DelayError,
    io::pcm::{f32_to_i16, i16_to_f32},
};

/// Channels the memory layout supports.
pub const MAX_CHANNELS: usize = 2;

/// Fractional parts closer than this to a whole frame are treated as whole.
const INTEGER_SNAP_FRAMES: f64 = 1e-2;

pub struct DelayLine {
    memory: Vec<i16>,
    channels: usize,
    frames: usize,
    write_index: usize,
    old_sample: [f32; MAX_CHANNELS],
}

impl DelayLine {
    /// Allocate a zeroed line of `frames` frames of `channels` samples each.
    ///
    /// Allocation is fallible: an oversized request is reported instead of
    /// aborting the process.
    pub fn new(frames: usize, channels: usize) -> Result<Self, DelayError> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(DelayError::UnsupportedChannels(channels));
        }
        let frames = frames.max(2);
        let slots = frames
            .checked_mul(channels)
            .ok_or(DelayError::Allocation { slots: usize::MAX })?;

        let mut memory = Vec::new();
        memory
            .try_reserve_exact(slots)
            .map_err(|_| DelayError::Allocation { slots })?;
        memory.resize(slots, 0);

        Ok(Self {
            memory,
            channels,
            frames,
            write_index: 0,
            old_sample: [0.0; MAX_CHANNELS],
        })
    }

    /// Total slots (frames * channels).
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Slot of channel 0 of the frame about to be written.
    pub fn write_index(&self) -> usize {
        self.write_index
    }

    /// Interpolated sample of `channel`, `delay_frames` frames behind the
    /// write head. Updates the channel's all-pass state.
    #[inline]
    pub fn read(&mut self, channel: usize, delay_frames: f64) -> f32 {
        let delay_frames = snap_to_integer(delay_frames);
        let position = (self.write_index / self.channels) as f64 - delay_frames;

        let whole = position.floor();
        let frac = (position - whole) as f32;
        let alpha = frac / (2.0 - frac);

        let frame_a = (whole as i64).rem_euclid(self.frames as i64) as usize;
        let slot_a = frame_a * self.channels + channel;
        let slot_b = (slot_a + self.channels) % self.memory.len();

        let sample_a = i16_to_f32(self.memory[slot_a]);
        let sample_b = i16_to_f32(self.memory[slot_b]);

        let y = alpha * (sample_b - self.old_sample[channel]) + sample_a;
        self.old_sample[channel] = y;
        y
    }

    /// Store `value` for `channel` at the write head, quantized to 16 bits.
    #[inline]
    pub fn write(&mut self, channel: usize, value: f32) {
        self.memory[self.write_index + channel] = f32_to_i16(value);
    }

    /// Move the write head to the next frame.
    #[inline]
    pub fn advance(&mut self) {
        self.write_index += self.channels;
        if self.write_index >= self.memory.len() {
            self.write_index -= self.memory.len();
        }
    }

    /// Silence the memory and forget the interpolation state.
    pub fn reset(&mut self) {
        self.memory.fill(0);
        self.write_index = 0;
        self.old_sample = [0.0; MAX_CHANNELS];
    }
}

#[inline]
fn snap_to_integer(delay_frames: f64) -> f64 {
    let nearest = delay_frames.round();
    if (delay_frames - nearest).abs() < INTEGER_SNAP_FRAMES {
        nearest
    } else {
        delay_frames
    }
}
