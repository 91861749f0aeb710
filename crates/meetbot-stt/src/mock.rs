use async_trait::async_trait;
use meetbot_vad::VadWindow;
use tokio::sync::mpsc;

use crate::engine::SttEngine;
use crate::error::SttUnavailable;
use crate::types::SttSegment;

/// Deterministic test/demo engine: buffers the whole utterance, then emits
/// one segment spanning the speech windows it saw, with one placeholder
/// word per speech window. Never fails unless constructed with
/// `fail_with` set.
pub struct MockSttEngine {
    window_duration_s: f64,
    fail_with: Option<String>,
}

impl MockSttEngine {
    pub fn new(window_duration_s: f64) -> Self {
        Self {
            window_duration_s,
            fail_with: None,
        }
    }

    pub fn failing(window_duration_s: f64, reason: impl Into<String>) -> Self {
        Self {
            window_duration_s,
            fail_with: Some(reason.into()),
        }
    }
}

#[async_trait]
impl SttEngine for MockSttEngine {
    async fn stream(
        &self,
        mut windows: mpsc::Receiver<VadWindow>,
    ) -> mpsc::Receiver<Result<SttSegment, SttUnavailable>> {
        let (tx, rx) = mpsc::channel(4);
        let window_duration_s = self.window_duration_s;
        let fail_with = self.fail_with.clone();

        tokio::spawn(async move {
            if let Some(reason) = fail_with {
                let _ = tx.send(Err(SttUnavailable(reason))).await;
                return;
            }

            let mut first_speech_idx: Option<usize> = None;
            let mut last_speech_idx: Option<usize> = None;
            let mut speech_words = 0usize;
            let mut idx = 0usize;

            while let Some(window) = windows.recv().await {
                if window.is_speech {
                    first_speech_idx.get_or_insert(idx);
                    last_speech_idx = Some(idx);
                    speech_words += 1;
                }
                idx += 1;
            }

            if let (Some(first), Some(last)) = (first_speech_idx, last_speech_idx) {
                let start = first as f64 * window_duration_s;
                let end = (last + 1) as f64 * window_duration_s;
                let text = vec!["word"; speech_words].join(" ");
                let _ = tx.send(Ok(SttSegment::new(text, start, end))).await;
            }
        });

        rx
    }
}
