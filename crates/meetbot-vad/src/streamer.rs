//! Drives a detector over an `AudioReader`, emitting labelled `VadWindow`s
//! with a one-window look-back: the most recent non-speech window is held
//! back and, if the next window is speech, released first under its
//! *original* label so callers get one frame of leading context around
//! every speech burst without any window being emitted twice.

use meetbot_audio::{convert_format, duration_ns, AudioReader};
use meetbot_foundation::error::{IncompatibleAudioFormat, MeetbotError};
use tokio::sync::mpsc;

use crate::detector::VadDetector;
use crate::types::VadWindow;

pub struct VadStreamer<R: AudioReader, D: VadDetector> {
    reader: R,
    detector: D,
    window_bytes: usize,
    elapsed_ns: u64,
}

impl<R: AudioReader, D: VadDetector> VadStreamer<R, D> {
    /// Fails with `SampleRateMismatch` (carried as `IncompatibleAudioFormat`)
    /// if the reader's rate differs from the detector's.
    pub fn new(reader: R, detector: D) -> Result<Self, MeetbotError> {
        if reader.format().sample_rate_hz != detector.audio_format().sample_rate_hz {
            return Err(MeetbotError::IncompatibleAudioFormat(
                IncompatibleAudioFormat {
                    reader_hz: reader.format().sample_rate_hz,
                    expected_hz: detector.audio_format().sample_rate_hz,
                },
            ));
        }
        let window_bytes = detector.window_size_samples() * reader.format().byte_depth as usize;
        Ok(Self {
            reader,
            detector,
            window_bytes,
            elapsed_ns: 0,
        })
    }

    /// Spawn the streaming task; returns a channel of emitted windows in
    /// strict wall-clock order.
    pub fn spawn(mut self) -> mpsc::Receiver<VadWindow>
    where
        R: 'static,
        D: 'static,
    {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            if let Err(e) = self.run(tx).await {
                tracing::error!(error = %e, "VAD streamer terminated");
            }
        });
        rx
    }

    async fn run(&mut self, tx: mpsc::Sender<VadWindow>) -> Result<(), MeetbotError> {
        let reader_fmt = self.reader.format();
        let detector_fmt = self.detector.audio_format();
        let window_period_ns = duration_ns(self.window_bytes, reader_fmt);
        let mut buffer: Vec<u8> = Vec::new();
        let mut pending: Option<VadWindow> = None;

        loop {
            while buffer.len() < self.window_bytes {
                let chunk = self.reader.read().await?;
                buffer.extend_from_slice(&chunk.data);
            }
            let window_bytes: Vec<u8> = buffer.drain(0..self.window_bytes).collect();
            let time_ns = self.elapsed_ns;
            self.elapsed_ns += window_period_ns;

            let converted = convert_format(&window_bytes, reader_fmt, detector_fmt)?;
            let is_speech = self.detector.is_speech(&converted).await;
            let current = VadWindow::new(window_bytes, time_ns, is_speech, None);

            if is_speech {
                if let Some(held) = pending.take() {
                    if tx.send(held).await.is_err() {
                        return Ok(());
                    }
                }
                if tx.send(current).await.is_err() {
                    return Ok(());
                }
            } else {
                if let Some(held) = pending.replace(current) {
                    if tx.send(held).await.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::{Aggressiveness, EnergyVad};
    use meetbot_audio::{AudioFormat, InMemoryReader};

    fn silence_pcm(samples: usize) -> Vec<u8> {
        vec![0u8; samples * 2]
    }

    fn tone_pcm(samples: usize) -> Vec<u8> {
        let mut v = Vec::with_capacity(samples * 2);
        for _ in 0..samples {
            v.extend_from_slice(&32000i16.to_le_bytes());
        }
        v
    }

    #[tokio::test(start_paused = true)]
    async fn all_silence_yields_only_non_speech_windows() {
        let fmt = AudioFormat::pcm16(16_000);
        let detector = EnergyVad::new(16_000, 20, Aggressiveness::Medium);
        let window_samples = detector.window_size_samples();
        let mut pcm = silence_pcm(window_samples * 4);
        pcm.truncate(window_samples * 2 * 4);
        let mut reader = InMemoryReader::new(fmt, window_samples * 2, pcm);
        reader.start();
        let streamer = VadStreamer::new(reader, detector).unwrap();
        let mut rx = streamer.spawn();
        for _ in 0..3 {
            let w = rx.recv().await.unwrap();
            assert!(!w.is_speech);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn speech_burst_is_preceded_by_one_leading_window() {
        let fmt = AudioFormat::pcm16(16_000);
        let detector = EnergyVad::new(16_000, 20, Aggressiveness::Medium);
        let window_samples = detector.window_size_samples();
        let mut pcm = silence_pcm(window_samples); // window 0: silence
        pcm.extend(tone_pcm(window_samples)); // window 1: speech
        pcm.extend(tone_pcm(window_samples)); // window 2: speech
        pcm.extend(silence_pcm(window_samples)); // window 3: silence
        let mut reader = InMemoryReader::new(fmt, window_samples * 2, pcm);
        reader.start();
        let streamer = VadStreamer::new(reader, detector).unwrap();
        let mut rx = streamer.spawn();

        let w0 = rx.recv().await.unwrap();
        assert!(!w0.is_speech, "leading silent window kept its original label");
        let w1 = rx.recv().await.unwrap();
        assert!(w1.is_speech);
        let w2 = rx.recv().await.unwrap();
        assert!(w2.is_speech);
    }

    #[tokio::test]
    async fn sample_rate_mismatch_is_rejected_up_front() {
        let reader = InMemoryReader::new(AudioFormat::pcm16(48_000), 320, vec![0u8; 320]);
        let detector = EnergyVad::new(16_000, 20, Aggressiveness::Medium);
        let err = VadStreamer::new(reader, detector).unwrap_err();
        assert!(matches!(err, MeetbotError::IncompatibleAudioFormat(_)));
    }
}
