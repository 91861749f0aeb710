//! Composes the VAD streamer, transcription controller, speech
//! controller, and meeting backend into one session object, exposing the
//! external operations a caller (CLI, RPC handler, test harness) drives a
//! meeting bot through.
//!
//! Construction order mirrors the dependency graph: foundation types
//! first, then the transcript/event bus shared by both controllers, then
//! the VAD streamer and transcription controller wired to the STT engine,
//! then the speech controller wired to the TTS engine and output writer.
//! Teardown runs in reverse, logging and swallowing backend errors so a
//! single failing step never strands the rest of the cleanup.

use std::sync::Arc;

use meetbot_audio::AudioWriter;
use meetbot_events::{Event, EventBus, EventKind};
use meetbot_foundation::config::SessionConfig;
use meetbot_foundation::error::MeetbotResult;
use meetbot_stt::SttEngine;
use meetbot_transcript::{Transcript, TranscriptSegment};
use meetbot_tts::TtsEngine;
use meetbot_vad::VadStreamer;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::latch::NoSpeechLatch;
use crate::meeting_controller::MeetingController;
use crate::speech_controller::SpeechController;
use crate::transcription_controller::TranscriptionController;

/// A live meeting session: a meeting backend, a transcription pipeline
/// feeding a shared transcript, and a speech controller for the bot's
/// own voice. Construct via `SessionComposer::compose`.
pub struct MeetingSession {
    config: SessionConfig,
    meeting: Arc<dyn MeetingController>,
    speech: SpeechController,
    writer: AsyncMutex<Box<dyn AudioWriter>>,
    transcript: Transcript,
    events: EventBus,
    transcription_task: JoinHandle<()>,
}

impl MeetingSession {
    pub async fn join_meeting(
        &self,
        url: &str,
        passcode: Option<&str>,
    ) -> MeetbotResult<()> {
        self.meeting.join(url, &self.config.name, passcode).await
    }

    /// Leaves the meeting. `force` skips waiting for any in-flight
    /// `speak_text` to finish before tearing down the backend.
    pub async fn leave_meeting(&self, force: bool) {
        if !force {
            // Best-effort: wait for the speech controller's exclusion lock
            // to prove no speak_text is in flight before tearing down.
            let _ = tokio::time::timeout(
                std::time::Duration::from_secs(5),
                self.speech.wait_idle(),
            )
            .await;
        }
        if let Err(err) = self.meeting.leave().await {
            warn!(error = %err, "error leaving meeting, continuing teardown");
        }
        self.transcription_task.abort();
    }

    pub async fn speak_text(&self, text: &str) -> MeetbotResult<()> {
        self.speech.speak_text(text, &self.writer).await
    }

    pub async fn send_chat_message(&self, text: &str) -> MeetbotResult<()> {
        self.meeting.send_chat_message(text).await
    }

    pub async fn get_chat_history(&self) -> MeetbotResult<Vec<crate::meeting_controller::ChatMessage>> {
        self.meeting.get_chat_history().await
    }

    pub async fn get_participants(&self) -> MeetbotResult<Vec<crate::meeting_controller::Participant>> {
        self.meeting.get_participants().await
    }

    pub async fn mute(&self) -> MeetbotResult<()> {
        self.meeting.mute().await
    }

    pub async fn unmute(&self) -> MeetbotResult<()> {
        self.meeting.unmute().await
    }

    pub fn get_transcript(&self) -> Transcript {
        self.transcript.clone()
    }

    /// Registers `listener` for finalized transcript segments (both
    /// participant and assistant speech). Returns a handle whose
    /// `unsubscribe()` removes it.
    pub fn add_transcription_listener<F, Fut>(&self, listener: F) -> meetbot_events::Subscription
    where
        F: Fn(TranscriptSegment) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = Arc::new(listener);
        self.events.subscribe(EventKind::Segment, move |event| {
            let listener = listener.clone();
            async move {
                if let Event::Segment(segment) = event {
                    listener(segment).await;
                }
            }
        })
    }
}

/// Builds a `MeetingSession` from its components. Kept separate from
/// `MeetingSession` itself so callers can assemble mock components in
/// tests without going through provider selection.
pub struct SessionComposer;

impl SessionComposer {
    #[allow(clippy::too_many_arguments)]
    pub fn compose(
        config: SessionConfig,
        meeting: Arc<dyn MeetingController>,
        vad_streamer: VadStreamer<impl meetbot_audio::AudioReader + 'static, impl meetbot_vad::VadDetector + 'static>,
        stt_engine: Arc<dyn SttEngine>,
        tts_engine: Arc<dyn TtsEngine>,
        writer: Box<dyn AudioWriter>,
    ) -> MeetingSession {
        let transcript = Transcript::new();
        let events = EventBus::new();
        let latch = NoSpeechLatch::new();

        let windows = vad_streamer.spawn();
        let transcription_task = TranscriptionController::spawn(
            windows,
            stt_engine,
            transcript.clone(),
            events.clone(),
            latch.clone(),
            config.transcription_controller_args.clone(),
        );

        let speech = SpeechController::new(
            tts_engine,
            transcript.clone(),
            events.clone(),
            latch,
            config.speech_controller_args.clone(),
            meetbot_foundation::clock::real_clock(),
        );

        MeetingSession {
            config,
            meeting,
            speech,
            writer: AsyncMutex::new(writer),
            transcript,
            events,
            transcription_task,
        }
    }
}
