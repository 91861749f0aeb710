use async_trait::async_trait;
use meetbot_audio::AudioFormat;

use crate::detector::VadDetector;

/// Three aggressiveness levels, mirroring the common WebRTC-VAD presets:
/// higher aggressiveness requires a louder signal to call it speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggressiveness {
    Low,
    Medium,
    High,
}

impl Aggressiveness {
    fn threshold_dbfs(self) -> f32 {
        match self {
            Aggressiveness::Low => -40.0,
            Aggressiveness::Medium => -32.0,
            Aggressiveness::High => -24.0,
        }
    }
}

/// Stateless RMS/dBFS energy-based detector. Valid window durations are
/// 10/20/30 ms at 8/16/32/48 kHz, per the WebRTC VAD convention.
pub struct EnergyVad {
    format: AudioFormat,
    window_size_samples: usize,
    aggressiveness: Aggressiveness,
}

impl EnergyVad {
    pub fn new(
        sample_rate_hz: u32,
        window_duration_ms: u32,
        aggressiveness: Aggressiveness,
    ) -> Self {
        assert!(
            matches!(sample_rate_hz, 8_000 | 16_000 | 32_000 | 48_000),
            "unsupported sample rate for energy VAD: {sample_rate_hz}"
        );
        assert!(
            matches!(window_duration_ms, 10 | 20 | 30),
            "unsupported window duration for energy VAD: {window_duration_ms}ms"
        );
        let window_size_samples = (sample_rate_hz as u64 * window_duration_ms as u64 / 1000) as usize;
        Self {
            format: AudioFormat::pcm16(sample_rate_hz),
            window_size_samples,
            aggressiveness,
        }
    }

    fn calculate_dbfs(&self, frame: &[i16]) -> f32 {
        if frame.is_empty() {
            return -100.0;
        }
        let sum_squares: i64 = frame.iter().map(|&s| (s as i64) * (s as i64)).sum();
        let mean_square = sum_squares as f64 / frame.len() as f64;
        let rms = (mean_square.sqrt() / 32768.0) as f32;
        if rms <= 1e-10 {
            return -100.0;
        }
        20.0 * rms.log10()
    }
}

#[async_trait]
impl VadDetector for EnergyVad {
    fn audio_format(&self) -> AudioFormat {
        self.format
    }

    fn window_size_samples(&self) -> usize {
        self.window_size_samples
    }

    async fn is_speech(&mut self, window_bytes: &[u8]) -> bool {
        let samples: Vec<i16> = window_bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        self.calculate_dbfs(&samples) > self.aggressiveness.threshold_dbfs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silence(samples: usize) -> Vec<u8> {
        vec![0u8; samples * 2]
    }

    fn full_scale(samples: usize) -> Vec<u8> {
        let mut v = Vec::with_capacity(samples * 2);
        for _ in 0..samples {
            v.extend_from_slice(&32767i16.to_le_bytes());
        }
        v
    }

    #[tokio::test]
    async fn silence_is_not_speech() {
        let mut vad = EnergyVad::new(16_000, 20, Aggressiveness::Medium);
        let window = silence(vad.window_size_samples());
        assert!(!vad.is_speech(&window).await);
    }

    #[tokio::test]
    async fn full_scale_is_speech() {
        let mut vad = EnergyVad::new(16_000, 20, Aggressiveness::High);
        let window = full_scale(vad.window_size_samples());
        assert!(vad.is_speech(&window).await);
    }

    #[test]
    fn window_size_matches_duration() {
        let vad = EnergyVad::new(16_000, 20, Aggressiveness::Medium);
        assert_eq!(vad.window_size_samples(), 320);
    }

    #[test]
    #[should_panic]
    fn rejects_unsupported_sample_rate() {
        EnergyVad::new(44_100, 20, Aggressiveness::Medium);
    }
}
