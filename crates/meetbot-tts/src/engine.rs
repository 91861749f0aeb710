use async_trait::async_trait;
use meetbot_audio::AudioFormat;
use tokio::sync::mpsc;

use crate::error::TtsResult;
use crate::types::{TtsConfig, VoiceInfo};

/// `stream(text)` returns raw PCM chunks at `audio_format()`. The engine is
/// free to chunk arbitrarily; implementations may split the input by
/// sentence before invoking the model to reduce first-audio latency.
#[async_trait]
pub trait TtsEngine: Send + Sync {
    fn audio_format(&self) -> AudioFormat;

    async fn stream(&self, text: &str) -> mpsc::Receiver<Vec<u8>>;

    async fn list_voices(&self) -> TtsResult<Vec<VoiceInfo>> {
        Ok(Vec::new())
    }

    fn config(&self) -> &TtsConfig;
}
