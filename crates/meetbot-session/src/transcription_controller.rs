//! Segments a continuous stream of VAD-labelled windows into utterances
//! and drives each finished utterance through an `SttEngine`.
//!
//! State machine: `Idle` waits for a speech window; `InUtterance`
//! streams windows into a live STT task until `utterance_tail_seconds` of
//! continuous non-speech has elapsed. The STT-pool saturation check and
//! task spawn both happen at the Idle → InUtterance transition, on the
//! first speech window of the utterance — not at finalize — so a
//! saturated pool drops the utterance immediately instead of buffering it
//! only to discard it later.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use meetbot_events::{Event, EventBus};
use meetbot_foundation::config::TranscriptionControllerArgs;
use meetbot_stt::SttEngine;
use meetbot_transcript::{Role, Transcript, TranscriptSegment};
use meetbot_vad::VadWindow;
use tokio::sync::{mpsc, Notify, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::latch::NoSpeechLatch;

/// Bounded FIFO of pending windows for the in-progress utterance, shared
/// between the controller's ingestion loop (producer) and the task that
/// forwards them into the STT engine's channel as they arrive (consumer).
/// When full, the middle element is dropped rather than the oldest (which
/// anchors the utterance's absolute start time) or the newest (which
/// anchors the tail-gap calculation). `close()` lets the forwarder drain
/// what remains and stop instead of waiting on new pushes forever —
/// standing in for pushing a sentinel into the queue.
struct SharedQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

struct QueueState {
    windows: VecDeque<VadWindow>,
    capacity: usize,
    closed: bool,
}

impl SharedQueue {
    fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState {
                windows: VecDeque::with_capacity(capacity.min(1024)),
                capacity,
                closed: false,
            }),
            notify: Notify::new(),
        })
    }

    fn push(&self, window: VadWindow) {
        let mut state = self.state.lock().unwrap();
        if state.windows.len() >= state.capacity {
            let mid = state.windows.len() / 2;
            state.windows.remove(mid);
        }
        state.windows.push_back(window);
        drop(state);
        self.notify.notify_one();
    }

    fn close(&self) {
        self.state.lock().unwrap().closed = true;
        self.notify.notify_one();
    }

    /// Drains windows into `tx` as they're pushed. Returns once `close()`
    /// has been called and every pushed window has been forwarded.
    async fn forward_into(self: Arc<Self>, tx: mpsc::Sender<VadWindow>) {
        loop {
            let next = self.state.lock().unwrap().windows.pop_front();
            match next {
                Some(window) => {
                    if tx.send(window).await.is_err() {
                        return;
                    }
                }
                None => {
                    if self.state.lock().unwrap().closed {
                        return;
                    }
                    self.notify.notified().await;
                }
            }
        }
    }
}

enum State {
    Idle,
    InUtterance {
        queue: Arc<SharedQueue>,
        last_speech_ns: u64,
    },
}

/// Drives the transcription state machine. Construct with `spawn`, which
/// consumes the VAD window stream on a background task until the channel
/// closes.
pub struct TranscriptionController;

impl TranscriptionController {
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        mut windows: mpsc::Receiver<VadWindow>,
        engine: Arc<dyn SttEngine>,
        transcript: Transcript,
        events: EventBus,
        latch: NoSpeechLatch,
        args: TranscriptionControllerArgs,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let semaphore = Arc::new(Semaphore::new(args.max_stt_tasks));
            let mut state = State::Idle;

            while let Some(window) = windows.recv().await {
                state = Self::handle_window(
                    state,
                    window,
                    &args,
                    &semaphore,
                    &engine,
                    &transcript,
                    &events,
                    &latch,
                );
            }

            if let State::InUtterance { queue, .. } = state {
                queue.close();
                latch.set();
            }
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_window(
        state: State,
        window: VadWindow,
        args: &TranscriptionControllerArgs,
        semaphore: &Arc<Semaphore>,
        engine: &Arc<dyn SttEngine>,
        transcript: &Transcript,
        events: &EventBus,
        latch: &NoSpeechLatch,
    ) -> State {
        match state {
            State::Idle => {
                if !window.is_speech {
                    return State::Idle;
                }
                let permit = match semaphore.clone().try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!("stt task pool saturated, dropping utterance");
                        return State::Idle;
                    }
                };
                latch.clear();

                let queue = SharedQueue::new(args.window_queue_size);
                let last_speech_ns = window.time_ns;
                let utterance_start_s = window.time_ns as f64 / 1e9;
                let speaker = window.speaker.clone();
                queue.push(window);
                Self::spawn_stt_task(
                    queue.clone(),
                    permit,
                    engine.clone(),
                    transcript.clone(),
                    events.clone(),
                    utterance_start_s,
                    speaker,
                );
                State::InUtterance {
                    queue,
                    last_speech_ns,
                }
            }
            State::InUtterance {
                queue,
                mut last_speech_ns,
            } => {
                let time_ns = window.time_ns;
                let is_speech = window.is_speech;
                queue.push(window);

                if is_speech {
                    last_speech_ns = time_ns;
                    State::InUtterance {
                        queue,
                        last_speech_ns,
                    }
                } else {
                    let gap_seconds = time_ns.saturating_sub(last_speech_ns) as f64 / 1e9;
                    if gap_seconds >= args.utterance_tail_seconds {
                        queue.close();
                        latch.set();
                        State::Idle
                    } else {
                        State::InUtterance {
                            queue,
                            last_speech_ns,
                        }
                    }
                }
            }
        }
    }

    /// Spawned at the moment an utterance is admitted (first speech
    /// window), not at finalize: the STT engine sees windows as the
    /// forwarder drains them from `queue`, rather than all at once after
    /// the utterance has already ended.
    fn spawn_stt_task(
        queue: Arc<SharedQueue>,
        permit: OwnedSemaphorePermit,
        engine: Arc<dyn SttEngine>,
        transcript: Transcript,
        events: EventBus,
        utterance_start_s: f64,
        speaker: Option<String>,
    ) {
        tokio::spawn(async move {
            let _permit = permit;
            let (tx, rx) = mpsc::channel(16);
            let forward = tokio::spawn(queue.forward_into(tx));

            let mut segments = engine.stream(rx).await;
            let mut any = false;
            while let Some(result) = segments.recv().await {
                match result {
                    Ok(segment) => {
                        any = true;
                        let absolute = TranscriptSegment::new(
                            segment.text,
                            utterance_start_s + segment.start,
                            utterance_start_s + segment.end,
                            speaker.clone(),
                            Role::Participant,
                        );
                        transcript.append(absolute.clone());
                        events.publish(Event::Segment(absolute));
                    }
                    Err(err) => {
                        warn!(error = %err, "stt engine reported transient failure");
                    }
                }
            }
            if any {
                events.publish(Event::Utterance);
            }
            let _ = forward.await;
            debug!("utterance finalized");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meetbot_audio::AudioFormat;
    use meetbot_stt::MockSttEngine;

    fn window(time_ns: u64, is_speech: bool) -> VadWindow {
        let fmt = AudioFormat::pcm16(16_000);
        let bytes = fmt.bytes_for_samples(160);
        VadWindow::new(vec![0u8; bytes], time_ns, is_speech, None)
    }

    #[tokio::test]
    async fn silence_only_stream_produces_no_utterance() {
        let (tx, rx) = mpsc::channel(16);
        let engine: Arc<dyn SttEngine> = Arc::new(MockSttEngine::new(0.02));
        let transcript = Transcript::new();
        let events = EventBus::new();
        let latch = NoSpeechLatch::new();
        let handle = TranscriptionController::spawn(
            rx,
            engine,
            transcript.clone(),
            events,
            latch,
            TranscriptionControllerArgs::default(),
        );

        for i in 0..5 {
            tx.send(window(i * 20_000_000, false)).await.unwrap();
        }
        drop(tx);
        handle.await.unwrap();
        assert!(transcript.all().is_empty());
    }

    #[tokio::test]
    async fn speech_burst_then_tail_gap_produces_one_utterance() {
        let (tx, rx) = mpsc::channel(16);
        let engine: Arc<dyn SttEngine> = Arc::new(MockSttEngine::new(0.02));
        let transcript = Transcript::new();
        let events = EventBus::new();
        let latch = NoSpeechLatch::new();
        let args = TranscriptionControllerArgs {
            utterance_tail_seconds: 0.05,
            max_stt_tasks: 5,
            window_queue_size: 100,
        };
        let handle = TranscriptionController::spawn(
            rx,
            engine,
            transcript.clone(),
            events,
            latch.clone(),
            args,
        );

        assert!(latch.is_set());
        tx.send(window(0, true)).await.unwrap();
        tx.send(window(20_000_000, true)).await.unwrap();
        assert!(!latch.is_set(), "latch should clear once speech starts");
        // tail gap: 60ms of silence, over the 50ms threshold.
        tx.send(window(80_000_000, false)).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert!(latch.is_set());
        let all = transcript.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "word word");
    }

    #[tokio::test]
    async fn saturated_pool_drops_utterance_immediately_and_leaves_latch_set() {
        let (tx, rx) = mpsc::channel(16);
        let engine: Arc<dyn SttEngine> = Arc::new(MockSttEngine::new(0.02));
        let transcript = Transcript::new();
        let events = EventBus::new();
        let latch = NoSpeechLatch::new();
        let args = TranscriptionControllerArgs {
            utterance_tail_seconds: 0.05,
            max_stt_tasks: 0,
            window_queue_size: 100,
        };
        let handle =
            TranscriptionController::spawn(rx, engine, transcript.clone(), events, latch.clone(), args);

        tx.send(window(0, true)).await.unwrap();
        tx.send(window(80_000_000, false)).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        // The pool is saturated before the permit check, so the utterance
        // never enters InUtterance and the latch is never cleared for it:
        // the speech controller stays free to speak right through a
        // dropped utterance instead of wedging closed.
        assert!(transcript.all().is_empty());
        assert!(latch.is_set());
    }
}
