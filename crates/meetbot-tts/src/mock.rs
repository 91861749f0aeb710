use std::time::Duration;

use async_trait::async_trait;
use meetbot_audio::AudioFormat;
use tokio::sync::mpsc;

use crate::engine::TtsEngine;
use crate::error::TtsResult;
use crate::types::{TtsConfig, VoiceInfo};

/// Deterministic test/demo engine: emits `ms_per_word` of silence-valued
/// PCM per word, one chunk per word, at the configured format.
pub struct MockTtsEngine {
    format: AudioFormat,
    ms_per_word: u64,
    config: TtsConfig,
}

impl MockTtsEngine {
    pub fn new(format: AudioFormat, ms_per_word: u64) -> Self {
        Self {
            format,
            ms_per_word,
            config: TtsConfig::default(),
        }
    }
}

#[async_trait]
impl TtsEngine for MockTtsEngine {
    fn audio_format(&self) -> AudioFormat {
        self.format
    }

    async fn stream(&self, text: &str) -> mpsc::Receiver<Vec<u8>> {
        let (tx, rx) = mpsc::channel(16);
        let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        let format = self.format;
        let ms_per_word = self.ms_per_word;

        tokio::spawn(async move {
            for _ in words {
                let samples =
                    (format.sample_rate_hz as u64 * ms_per_word / 1000) as usize;
                let chunk = vec![0u8; format.bytes_for_samples(samples)];
                tokio::time::sleep(Duration::from_millis(1)).await;
                if tx.send(chunk).await.is_err() {
                    return;
                }
            }
        });

        rx
    }

    async fn list_voices(&self) -> TtsResult<Vec<VoiceInfo>> {
        Ok(vec![VoiceInfo {
            id: "mock".to_string(),
            name: "Mock Voice".to_string(),
            language: self.config.language.clone(),
        }])
    }

    fn config(&self) -> &TtsConfig {
        &self.config
    }
}
