//! Text-to-speech playback with barge-in: splits `speak_text`'s input into
//! word-count-scaled chunks, synthesizes and writes them to the output
//! device chunk by chunk, and aborts mid-chunk the moment a participant
//! starts talking again.
//!
//! Grounded on the reference speech controller's producer/consumer split:
//! a producer task synthesizes a chunk's audio and hands it to the
//! consumer alongside its prefetch permit; the consumer converts it to
//! the writer's format and drains it one writer-chunk at a time, checking
//! the shared no-speech latch before every single write so a barge-in can
//! never let more than one writer-chunk of audio escape. Only one
//! `speak_text` call may be in flight at a time.

use std::sync::Arc;

use meetbot_audio::{convert_format, duration_seconds, AudioFormat, AudioWriter};
use meetbot_events::{Event, EventBus};
use meetbot_foundation::clock::SharedClock;
use meetbot_foundation::config::SpeechControllerArgs;
use meetbot_foundation::error::{MeetbotError, MeetbotResult};
use meetbot_transcript::{Role, Transcript, TranscriptSegment};
use meetbot_tts::TtsEngine;
use tokio::sync::{mpsc, Mutex as AsyncMutex, OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::latch::NoSpeechLatch;

/// Assumed floor on spoken words per second for the barge-in estimate: a
/// writer-chunk's worth of audio is only a handful of milliseconds, and
/// the plain bytes-written/chunk-size ratio underestimates badly on the
/// very first chunk checked, often rounding down to zero words spoken.
const MIN_WORDS_PER_SECOND: f64 = 2.0;

/// Splits `text` into chunks of roughly `max(15, min(50, 0.2 * words))`
/// words, matching the reference's length-scaled chunking so short replies
/// aren't needlessly fragmented and long ones remain interruptible.
fn chunk_text(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    let chunk_words = ((0.2 * words.len() as f64) as usize).clamp(15, 50);
    words
        .chunks(chunk_words)
        .map(|c| c.join(" "))
        .collect()
}

/// Estimates how many of `chunk_words` words have actually reached the
/// writer, given `bytes_written` of a chunk whose total converted size is
/// `chunk_byte_size`. Always at least one word once any audio has been
/// written, and never more than the chunk actually contains.
fn estimate_spoken_words(
    bytes_written: usize,
    chunk_byte_size: usize,
    chunk_words: usize,
    writer_fmt: AudioFormat,
) -> usize {
    if chunk_words == 0 || bytes_written == 0 {
        return 0;
    }
    let ratio_estimate = if chunk_byte_size == 0 {
        0.0
    } else {
        (bytes_written as f64 / chunk_byte_size as f64) * chunk_words as f64
    };
    let elapsed_s = duration_seconds(bytes_written, writer_fmt);
    let floor_estimate = elapsed_s * MIN_WORDS_PER_SECOND;
    ratio_estimate
        .max(floor_estimate)
        .max(1.0)
        .min(chunk_words as f64)
        .round() as usize
}

enum Produced {
    /// One fully-synthesized chunk, carried with the prefetch permit that
    /// was acquired to produce it; the permit is released (dropped) once
    /// the consumer finishes writing and transcribing this chunk, so the
    /// producer cannot race ahead of playback by more than
    /// `prefetch_chunks` chunks.
    Chunk {
        text: String,
        audio: Vec<u8>,
        _permit: OwnedSemaphorePermit,
    },
    TextEnd,
}

/// Drives TTS playback. One instance is shared by the session; `speak_text`
/// serializes concurrent callers via an internal mutex, matching "only one
/// active utterance at a time".
pub struct SpeechController {
    engine: Arc<dyn TtsEngine>,
    transcript: Transcript,
    events: EventBus,
    latch: NoSpeechLatch,
    args: SpeechControllerArgs,
    clock: SharedClock,
    exclusive: AsyncMutex<()>,
}

impl SpeechController {
    pub fn new(
        engine: Arc<dyn TtsEngine>,
        transcript: Transcript,
        events: EventBus,
        latch: NoSpeechLatch,
        args: SpeechControllerArgs,
        clock: SharedClock,
    ) -> Self {
        Self {
            engine,
            transcript,
            events,
            latch,
            args,
            clock,
            exclusive: AsyncMutex::new(()),
        }
    }

    /// Speaks `text` through `writer`, chunk by chunk. Returns `Ok(())` on
    /// full completion, or `Err(MeetbotError::SpeechInterrupted)` carrying
    /// the text actually spoken before a participant started talking.
    pub async fn speak_text(
        &self,
        text: &str,
        writer: &AsyncMutex<Box<dyn AudioWriter>>,
    ) -> MeetbotResult<()> {
        let _guard = self.exclusive.lock().await;
        let chunks = chunk_text(text);
        if chunks.is_empty() {
            return Ok(());
        }

        let (writer_chunk_size, writer_fmt) = {
            let w = writer.lock().await;
            (w.chunk_size(), w.format())
        };
        let tts_fmt = self.engine.audio_format();

        let (tx, mut rx) = mpsc::channel::<Produced>(self.args.prefetch_chunks.max(1) * 2);
        let semaphore = Arc::new(Semaphore::new(self.args.prefetch_chunks.max(1)));
        let engine = self.engine.clone();
        let producer_chunks = chunks.clone();

        let producer = tokio::spawn({
            let semaphore = semaphore.clone();
            async move {
                for chunk in producer_chunks {
                    let Ok(permit) = semaphore.clone().acquire_owned().await else {
                        break;
                    };
                    let mut audio_rx = engine.stream(&chunk).await;
                    let mut audio = Vec::new();
                    while let Some(part) = audio_rx.recv().await {
                        audio.extend(part);
                    }
                    if tx
                        .send(Produced::Chunk {
                            text: chunk,
                            audio,
                            _permit: permit,
                        })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                let _ = tx.send(Produced::TextEnd).await;
            }
        });

        let mut spoken_chunks: Vec<String> = Vec::new();
        let mut interrupted_text: Option<String> = None;

        'consumer: loop {
            match rx.recv().await {
                Some(Produced::Chunk { text: chunk_text, audio, _permit }) => {
                    let converted = convert_format(&audio, tts_fmt, writer_fmt)?;
                    let chunk_byte_size = converted.len();
                    let chunk_words: Vec<&str> = chunk_text.split_whitespace().collect();
                    let chunk_start = self.clock.now_s();
                    let mut bytes_written = 0usize;

                    while converted.len() - bytes_written >= writer_chunk_size {
                        if !self.latch.is_set() {
                            let spoken = estimate_spoken_words(
                                bytes_written,
                                chunk_byte_size,
                                chunk_words.len(),
                                writer_fmt,
                            );
                            let partial_words = chunk_words[..spoken.min(chunk_words.len())].join(" ");
                            let partial_text = if partial_words.is_empty() {
                                "…".to_string()
                            } else {
                                format!("{partial_words} …")
                            };
                            let end_s = self.clock.now_s();
                            self.append_segment(partial_text, chunk_start, end_s);
                            interrupted_text = Some(partial_words);
                            break 'consumer;
                        }
                        let slice = &converted[bytes_written..bytes_written + writer_chunk_size];
                        writer.lock().await.write(slice).await?;
                        bytes_written += writer_chunk_size;
                    }

                    // CHUNK_END: flush whatever's left under a full
                    // writer-chunk, then the chunk's finished segment.
                    if bytes_written < converted.len() {
                        writer.lock().await.write(&converted[bytes_written..]).await?;
                    }
                    let end_s = self.clock.now_s();
                    self.append_segment(chunk_text.clone(), chunk_start, end_s);
                    spoken_chunks.push(chunk_text);
                }
                Some(Produced::TextEnd) | None => break 'consumer,
            }
        }
        producer.abort();

        if let Some(partial) = interrupted_text {
            if !partial.is_empty() {
                spoken_chunks.push(partial);
            }
            let spoken_text = spoken_chunks.join(" ");
            debug!(spoken_text = %spoken_text, "speech interrupted by barge-in");
            return Err(MeetbotError::SpeechInterrupted { spoken_text });
        }
        Ok(())
    }

    fn append_segment(&self, text: String, start_s: f64, end_s: f64) {
        let segment = TranscriptSegment::new(text, start_s, end_s, None, Role::Assistant);
        self.transcript.append(segment.clone());
        self.events.publish(Event::Segment(segment));
    }

    /// Resolves once no `speak_text` call is in flight. Used by the session
    /// composer to avoid tearing down mid-utterance on a graceful leave.
    pub async fn wait_idle(&self) {
        let _ = self.exclusive.lock().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meetbot_audio::PacedWriter;
    use meetbot_tts::MockTtsEngine;

    #[test]
    fn chunk_text_clamps_chunk_size() {
        let short = "one two three";
        assert_eq!(chunk_text(short).len(), 1);

        let long = vec!["word"; 400].join(" ");
        let chunks = chunk_text(&long);
        assert!(chunks.len() > 1);
        for c in &chunks {
            let n = c.split_whitespace().count();
            assert!(n <= 50);
        }
    }

    #[test]
    fn chunk_text_on_empty_input_is_empty() {
        assert!(chunk_text("").is_empty());
        assert!(chunk_text("   ").is_empty());
    }

    #[test]
    fn estimate_spoken_words_floors_to_one_word_on_first_write() {
        let fmt = AudioFormat::pcm16(16_000);
        let n = estimate_spoken_words(320, 32_000, 10, fmt);
        assert!((1..=3).contains(&n));
    }

    #[test]
    fn estimate_spoken_words_is_zero_before_anything_is_written() {
        let fmt = AudioFormat::pcm16(16_000);
        assert_eq!(estimate_spoken_words(0, 32_000, 10, fmt), 0);
    }

    fn make_controller(
        format: AudioFormat,
        ms_per_word: u64,
        latch: NoSpeechLatch,
    ) -> (SpeechController, Transcript) {
        let engine: Arc<dyn TtsEngine> = Arc::new(MockTtsEngine::new(format, ms_per_word));
        let transcript = Transcript::new();
        let events = EventBus::new();
        let controller = SpeechController::new(
            engine,
            transcript.clone(),
            events,
            latch,
            SpeechControllerArgs::default(),
            meetbot_foundation::clock::real_clock(),
        );
        (controller, transcript)
    }

    #[tokio::test(start_paused = true)]
    async fn speak_text_completes_without_interruption() {
        let format = AudioFormat::pcm16(16_000);
        let (controller, transcript) = make_controller(format, 50, NoSpeechLatch::new());

        let mut writer = PacedWriter::new(format, 320);
        writer.start();
        let writer: Box<dyn AudioWriter> = Box::new(writer);
        let writer = AsyncMutex::new(writer);

        controller.speak_text("hello there friend", &writer).await.unwrap();
        let all = transcript.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "hello there friend");
        assert_eq!(all[0].role, Role::Assistant);
    }

    #[tokio::test(start_paused = true)]
    async fn speak_text_appends_one_segment_per_chunk() {
        let format = AudioFormat::pcm16(16_000);
        let (controller, transcript) = make_controller(format, 10, NoSpeechLatch::new());

        let mut writer = PacedWriter::new(format, 320);
        writer.start();
        let writer: Box<dyn AudioWriter> = Box::new(writer);
        let writer = AsyncMutex::new(writer);

        let text = vec!["word"; 120].join(" ");
        controller.speak_text(&text, &writer).await.unwrap();
        let all = transcript.all();
        assert!(all.len() > 1, "a 120-word reply should split into multiple chunks");
        for segment in &all {
            assert_eq!(segment.role, Role::Assistant);
        }
        assert_eq!(
            all.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" "),
            text
        );
    }

    #[tokio::test(start_paused = true)]
    async fn speak_text_stops_when_latch_clears_mid_playback() {
        let format = AudioFormat::pcm16(16_000);
        let latch = NoSpeechLatch::new();
        latch.clear();
        let (controller, transcript) = make_controller(format, 50, latch);

        let mut writer = PacedWriter::new(format, 320);
        writer.start();
        let writer: Box<dyn AudioWriter> = Box::new(writer);
        let writer = AsyncMutex::new(writer);

        let text = vec!["word"; 40].join(" ");
        let err = controller.speak_text(&text, &writer).await.unwrap_err();
        assert!(err.is_speech_interrupted());

        let all = transcript.all();
        assert_eq!(all.len(), 1, "exactly one partial segment should be appended");
        assert!(all[0].text.ends_with('…'));
        assert_eq!(all[0].role, Role::Assistant);
    }

    #[tokio::test(start_paused = true)]
    async fn speak_text_converts_tts_format_to_writer_format() {
        let tts_format = AudioFormat::float32(16_000);
        let writer_format = AudioFormat::pcm16(16_000);
        let engine: Arc<dyn TtsEngine> = Arc::new(MockTtsEngine::new(tts_format, 50));
        let transcript = Transcript::new();
        let events = EventBus::new();
        let controller = SpeechController::new(
            engine,
            transcript.clone(),
            events,
            NoSpeechLatch::new(),
            SpeechControllerArgs::default(),
            meetbot_foundation::clock::real_clock(),
        );

        let mut writer = PacedWriter::new(writer_format, 320);
        writer.start();
        let writer: Box<dyn AudioWriter> = Box::new(writer);
        let writer = AsyncMutex::new(writer);

        controller.speak_text("hello there friend", &writer).await.unwrap();
        assert_eq!(transcript.all().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_idle_resolves_immediately_with_no_speech_in_flight() {
        let format = AudioFormat::pcm16(16_000);
        let (controller, _transcript) = make_controller(format, 50, NoSpeechLatch::new());

        tokio::time::timeout(std::time::Duration::from_millis(10), controller.wait_idle())
            .await
            .expect("wait_idle should not block when nothing is speaking");
    }
}
