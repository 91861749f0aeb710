use async_trait::async_trait;
use meetbot_audio::AudioFormat;
use voice_activity_detector::VoiceActivityDetector;

use crate::detector::VadDetector;

/// Stateful neural detector (Silero-style). Carries a hidden state inside
/// the wrapped model; `reset_state()` zeros it. Operates on 512-sample
/// windows at 16kHz or 256-sample windows at 8kHz of float32 PCM.
pub struct NeuralVad {
    detector: VoiceActivityDetector,
    format: AudioFormat,
    window_size_samples: usize,
    threshold: f32,
}

impl NeuralVad {
    pub fn new(sample_rate_hz: u32, threshold: f32) -> Self {
        let window_size_samples = match sample_rate_hz {
            16_000 => 512,
            8_000 => 256,
            other => panic!("unsupported sample rate for neural VAD: {other}"),
        };
        let detector = VoiceActivityDetector::builder()
            .sample_rate(sample_rate_hz)
            .chunk_size(window_size_samples)
            .build()
            .expect("failed to build neural VAD model");
        Self {
            detector,
            format: AudioFormat::float32(sample_rate_hz),
            window_size_samples,
            threshold,
        }
    }

    fn f32_samples(window_bytes: &[u8]) -> Vec<f32> {
        window_bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }
}

#[async_trait]
impl VadDetector for NeuralVad {
    fn audio_format(&self) -> AudioFormat {
        self.format
    }

    fn window_size_samples(&self) -> usize {
        self.window_size_samples
    }

    async fn is_speech(&mut self, window_bytes: &[u8]) -> bool {
        let samples = Self::f32_samples(window_bytes);
        let probability = self.detector.predict(samples);
        probability >= self.threshold
    }

    fn reset_state(&mut self) {
        self.detector.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn silence_is_below_default_threshold() {
        let mut vad = NeuralVad::new(16_000, 0.5);
        let window = vec![0u8; 512 * 4];
        assert!(!vad.is_speech(&window).await);
    }

    #[test]
    fn window_sizes_match_sample_rate() {
        assert_eq!(NeuralVad::new(16_000, 0.5).window_size_samples(), 512);
        assert_eq!(NeuralVad::new(8_000, 0.5).window_size_samples(), 256);
    }
}
