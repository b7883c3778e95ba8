//! 16-bit PCM sample conversions.
//!
//! Samples are decoded from bytes with an explicit byte order, never by
//! reinterpreting memory.

/// Full-scale value of a signed 16-bit sample as a float divisor.
const FULL_SCALE: f32 = 32768.0;

/// Byte order of a raw PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// `i16` to a float in [-1.0, 1.0).
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / FULL_SCALE
}

/// Float to `i16`, rounded to nearest and hard-clamped to the 16-bit range.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    // `as` maps NaN to 0.
    (sample * FULL_SCALE).round().clamp(-FULL_SCALE, FULL_SCALE - 1.0) as i16
}

#[inline]
pub fn decode_sample(bytes: [u8; 2], endianness: Endianness) -> i16 {
    match endianness {
        Endianness::Little => i16::from_le_bytes(bytes),
        Endianness::Big => i16::from_be_bytes(bytes),
    }
}

#[inline]
pub fn encode_sample(sample: i16, endianness: Endianness) -> [u8; 2] {
    match endianness {
        Endianness::Little => sample.to_le_bytes(),
        Endianness::Big => sample.to_be_bytes(),
    }
}

/// Decode `bytes` into `samples`. Both must describe the same number of
/// samples; any trailing odd byte is ignored.
pub fn decode_into(bytes: &[u8], samples: &mut [i16], endianness: Endianness) {
    debug_assert_eq!(bytes.len() / 2, samples.len());
    for (pair, sample) in bytes.chunks_exact(2).zip(samples.iter_mut()) {
        *sample = decode_sample([pair[0], pair[1]], endianness);
    }
}

/// Encode `samples` back into `bytes`.
pub fn encode_into(samples: &[i16], bytes: &mut [u8], endianness: Endianness) {
    debug_assert_eq!(bytes.len() / 2, samples.len());
    for (pair, &sample) in bytes.chunks_exact_mut(2).zip(samples) {
        pair.copy_from_slice(&encode_sample(sample, endianness));
    }
}
