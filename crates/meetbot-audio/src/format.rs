//! PCM format types, duration math, and sample conversion.
//!
//! Grounded on the reference audio-format helpers: convert between 16-bit
//! signed little-endian and 32-bit float little-endian, compute duration
//! from a byte count, and reject combinations the pipeline cannot handle.

use meetbot_foundation::error::IncompatibleAudioFormat;

/// Mono PCM wire format. `byte_depth` is 2 for signed 16-bit or 4 for
/// IEEE float32 in `[-1, 1]`. Immutable value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    pub sample_rate_hz: u32,
    pub byte_depth: u8,
}

impl AudioFormat {
    pub const PCM16: u8 = 2;
    pub const FLOAT32: u8 = 4;

    pub fn new(sample_rate_hz: u32, byte_depth: u8) -> Self {
        debug_assert!(sample_rate_hz > 0, "sample rate must be positive");
        debug_assert!(
            byte_depth == Self::PCM16 || byte_depth == Self::FLOAT32,
            "byte_depth must be 2 (i16) or 4 (f32)"
        );
        Self {
            sample_rate_hz,
            byte_depth,
        }
    }

    pub fn pcm16(sample_rate_hz: u32) -> Self {
        Self::new(sample_rate_hz, Self::PCM16)
    }

    pub fn float32(sample_rate_hz: u32) -> Self {
        Self::new(sample_rate_hz, Self::FLOAT32)
    }

    /// Number of samples represented by `byte_len` bytes at this format.
    pub fn samples_in(&self, byte_len: usize) -> usize {
        byte_len / self.byte_depth as usize
    }

    pub fn bytes_for_samples(&self, samples: usize) -> usize {
        samples * self.byte_depth as usize
    }
}

/// Duration, in seconds, of a PCM buffer of `byte_len` bytes at `fmt`.
pub fn duration_seconds(byte_len: usize, fmt: AudioFormat) -> f64 {
    fmt.samples_in(byte_len) as f64 / fmt.sample_rate_hz as f64
}

/// Duration, in nanoseconds, of a PCM buffer of `byte_len` bytes at `fmt`.
/// Agrees with `duration_seconds` to within 1 ns by construction: both
/// derive from the same sample count.
pub fn duration_ns(byte_len: usize, fmt: AudioFormat) -> u64 {
    let samples = fmt.samples_in(byte_len) as u128;
    ((samples * 1_000_000_000) / fmt.sample_rate_hz as u128) as u64
}

/// Convert a PCM buffer between `from` and `to` formats. Only byte-depth
/// conversion is supported; a sample-rate mismatch is a hard error, never
/// resampled here.
pub fn convert_format(
    data: &[u8],
    from: AudioFormat,
    to: AudioFormat,
) -> Result<Vec<u8>, IncompatibleAudioFormat> {
    if from.sample_rate_hz != to.sample_rate_hz {
        return Err(IncompatibleAudioFormat {
            reader_hz: from.sample_rate_hz,
            expected_hz: to.sample_rate_hz,
        });
    }
    if from.byte_depth == to.byte_depth {
        return Ok(data.to_vec());
    }
    match (from.byte_depth, to.byte_depth) {
        (AudioFormat::PCM16, AudioFormat::FLOAT32) => Ok(i16_bytes_to_f32_bytes(data)),
        (AudioFormat::FLOAT32, AudioFormat::PCM16) => Ok(f32_bytes_to_i16_bytes(data)),
        _ => Ok(data.to_vec()),
    }
}

fn i16_bytes_to_f32_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2);
    for chunk in data.chunks_exact(2) {
        let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
        let f = i16_to_f32(sample);
        out.extend_from_slice(&f.to_le_bytes());
    }
    out
}

fn f32_bytes_to_i16_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() / 2);
    for chunk in data.chunks_exact(4) {
        let f = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let sample = f32_to_i16(f);
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_math_agrees() {
        let fmt = AudioFormat::pcm16(16_000);
        let bytes = 16_000 * 2; // 1 second of mono 16-bit audio
        let secs = duration_seconds(bytes, fmt);
        let ns = duration_ns(bytes, fmt);
        assert!((secs - 1.0).abs() < 1e-9);
        assert!((ns as i64 - 1_000_000_000i64).abs() <= 1);
    }

    #[test]
    fn round_trip_f32_i16_f32_within_quantization_error() {
        let samples = [0.0f32, 0.5, -0.5, 0.999, -0.999, 1.0, -1.0];
        for &s in &samples {
            let i = f32_to_i16(s);
            let back = i16_to_f32(i);
            assert!((back - s).abs() < 2.0 / 32767.0);
        }
    }

    #[test]
    fn sample_rate_mismatch_is_hard_error() {
        let from = AudioFormat::pcm16(16_000);
        let to = AudioFormat::pcm16(48_000);
        let err = convert_format(&[0, 0], from, to).unwrap_err();
        assert_eq!(err.reader_hz, 16_000);
        assert_eq!(err.expected_hz, 48_000);
    }

    #[test]
    fn byte_depth_conversion_roundtrips() {
        let from = AudioFormat::pcm16(16_000);
        let to = AudioFormat::float32(16_000);
        let i16_samples: [i16; 3] = [0, 16384, -16384];
        let mut bytes = Vec::new();
        for s in i16_samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        let as_f32 = convert_format(&bytes, from, to).unwrap();
        let back = convert_format(&as_f32, to, from).unwrap();
        for (orig, round) in bytes.chunks_exact(2).zip(back.chunks_exact(2)) {
            let o = i16::from_le_bytes([orig[0], orig[1]]);
            let r = i16::from_le_bytes([round[0], round[1]]);
            assert!((o - r).abs() <= 1);
        }
    }
}
