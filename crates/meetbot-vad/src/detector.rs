use async_trait::async_trait;
use meetbot_audio::AudioFormat;

/// A per-window speech/non-speech decision. Implementations may be
/// stateless (energy/WebRTC) or stateful (neural, hybrid).
#[async_trait]
pub trait VadDetector: Send {
    /// The format this detector expects windows to already be in.
    fn audio_format(&self) -> AudioFormat;

    /// The number of samples (at `audio_format`) per window.
    fn window_size_samples(&self) -> usize;

    /// Decide whether `window_bytes` (exactly `window_size_samples *
    /// byte_depth` bytes) contains speech.
    async fn is_speech(&mut self, window_bytes: &[u8]) -> bool;

    /// Clear any internal state (hidden tensors, debounce timers).
    fn reset_state(&mut self) {}
}
