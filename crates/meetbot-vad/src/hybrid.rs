use async_trait::async_trait;
use meetbot_audio::{convert_format, AudioFormat};

use crate::detector::VadDetector;

/// Always consults the cheap detector; only when it reports speech after a
/// non-speech window does the hybrid confirm with the accurate (neural)
/// detector, running it on the same window zero-padded up to its larger
/// window size. This rejects cheap false positives at low extra cost.
/// The hybrid's window size equals the cheap detector's.
pub struct HybridVad {
    cheap: Box<dyn VadDetector>,
    accurate: Box<dyn VadDetector>,
    last_cheap_speech: bool,
    last_used_accurate: bool,
}

impl HybridVad {
    pub fn new(cheap: Box<dyn VadDetector>, accurate: Box<dyn VadDetector>) -> Self {
        Self {
            cheap,
            accurate,
            last_cheap_speech: false,
            last_used_accurate: false,
        }
    }

    async fn confirm_with_accurate(&mut self, cheap_window: &[u8]) -> bool {
        if !self.last_used_accurate {
            self.accurate.reset_state();
        }
        self.last_used_accurate = true;

        let converted = convert_format(cheap_window, self.cheap.audio_format(), self.accurate.audio_format())
            .expect("cheap and accurate detectors must share a sample rate");
        let target_bytes =
            self.accurate.window_size_samples() * self.accurate.audio_format().byte_depth as usize;
        let mut padded = converted;
        padded.resize(target_bytes, 0);
        self.accurate.is_speech(&padded).await
    }
}

#[async_trait]
impl VadDetector for HybridVad {
    fn audio_format(&self) -> AudioFormat {
        self.cheap.audio_format()
    }

    fn window_size_samples(&self) -> usize {
        self.cheap.window_size_samples()
    }

    async fn is_speech(&mut self, window_bytes: &[u8]) -> bool {
        let cheap_says_speech = self.cheap.is_speech(window_bytes).await;

        let result = if cheap_says_speech && !self.last_cheap_speech {
            self.confirm_with_accurate(window_bytes).await
        } else {
            self.last_used_accurate = false;
            cheap_says_speech
        };

        self.last_cheap_speech = cheap_says_speech;
        result
    }

    fn reset_state(&mut self) {
        self.cheap.reset_state();
        self.accurate.reset_state();
        self.last_cheap_speech = false;
        self.last_used_accurate = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::{Aggressiveness, EnergyVad};
    use crate::neural::NeuralVad;

    #[tokio::test]
    async fn silence_never_triggers_accurate_confirmation() {
        let cheap = EnergyVad::new(16_000, 20, Aggressiveness::Medium);
        let accurate = NeuralVad::new(16_000, 0.5);
        let mut hybrid = HybridVad::new(Box::new(cheap), Box::new(accurate));
        let window = vec![0u8; hybrid.window_size_samples() * 2];
        assert!(!hybrid.is_speech(&window).await);
        assert!(!hybrid.last_used_accurate);
    }

    #[tokio::test]
    async fn window_size_matches_cheap_detector() {
        let cheap = EnergyVad::new(16_000, 20, Aggressiveness::Medium);
        let accurate = NeuralVad::new(16_000, 0.5);
        let cheap_window = cheap.window_size_samples();
        let hybrid = HybridVad::new(Box::new(cheap), Box::new(accurate));
        assert_eq!(hybrid.window_size_samples(), cheap_window);
    }
}
