//! Framed PCM I/O contracts with wall-clock pacing guarantees.
//!
//! `AudioReader` models the paced virtual microphone feeding the pipeline
//! (meeting audio arriving from remote participants); `AudioWriter` models
//! the paced virtual speaker the bot injects synthesized speech into.
//! Both are traits so a real browser-automation backend can implement them
//! without this crate knowing about it; the implementations here are the
//! in-memory/paced reference versions used by tests and the demo binary.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use meetbot_foundation::error::MeetbotError;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;

use crate::chunk::AudioChunk;
use crate::format::AudioFormat;

/// Paced framed PCM source. Each `read()` returns the next contiguous
/// `chunk_size` bytes of the declared format, one chunk per
/// `chunk_size / (sample_rate * byte_depth)` seconds of wall clock.
#[async_trait]
pub trait AudioReader: Send {
    fn format(&self) -> AudioFormat;
    fn chunk_size(&self) -> usize;
    async fn read(&mut self) -> Result<AudioChunk, MeetbotError>;
}

/// Paced framed PCM sink. `write()` accepts any multiple of `byte_depth`
/// and the implementation paced-emits it, inserting silence if the
/// producer falls behind.
#[async_trait]
pub trait AudioWriter: Send {
    fn format(&self) -> AudioFormat;
    fn chunk_size(&self) -> usize;
    async fn write(&mut self, pcm: &[u8]) -> Result<(), MeetbotError>;
}

fn chunk_period(fmt: AudioFormat, chunk_size: usize) -> Duration {
    let secs = chunk_size as f64 / (fmt.sample_rate_hz as f64 * fmt.byte_depth as f64);
    Duration::from_secs_f64(secs.max(0.0))
}

/// Reference `AudioReader` backed by a pre-loaded buffer. Once the buffer
/// is exhausted it repeats silence indefinitely, matching a meeting whose
/// remote participants have gone quiet rather than signalling end-of-stream.
pub struct InMemoryReader {
    fmt: AudioFormat,
    chunk_size: usize,
    buffer: VecDeque<u8>,
    period: Duration,
    next_deadline: Option<Instant>,
    elapsed_ns: u64,
    started: bool,
}

impl InMemoryReader {
    pub fn new(fmt: AudioFormat, chunk_size: usize, pcm: Vec<u8>) -> Self {
        Self {
            fmt,
            chunk_size,
            buffer: pcm.into(),
            period: chunk_period(fmt, chunk_size),
            next_deadline: None,
            elapsed_ns: 0,
            started: false,
        }
    }

    pub fn start(&mut self) {
        self.started = true;
        self.next_deadline = Some(Instant::now());
    }
}

#[async_trait]
impl AudioReader for InMemoryReader {
    fn format(&self) -> AudioFormat {
        self.fmt
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    async fn read(&mut self) -> Result<AudioChunk, MeetbotError> {
        if !self.started {
            return Err(MeetbotError::ComponentNotStarted("AudioReader"));
        }
        let deadline = *self.next_deadline.get_or_insert_with(Instant::now);
        tokio::time::sleep_until(deadline).await;
        self.next_deadline = Some(deadline + self.period);

        let mut out = Vec::with_capacity(self.chunk_size);
        for _ in 0..self.chunk_size {
            out.push(self.buffer.pop_front().unwrap_or(0));
        }
        let time_ns = self.elapsed_ns;
        self.elapsed_ns += self.period.as_nanos() as u64;
        Ok(AudioChunk::new(out, time_ns, None))
    }
}

/// Reference `AudioWriter`. A background pacing task drains a bounded
/// queue of written PCM at the chunk period, appending whatever is
/// available and padding with silence when the producer has fallen behind.
/// Emitted chunks accumulate in `sink` for inspection by callers/tests.
pub struct PacedWriter {
    fmt: AudioFormat,
    chunk_size: usize,
    tx: Option<mpsc::Sender<Vec<u8>>>,
    sink: Arc<Mutex<Vec<u8>>>,
    started_notify: Arc<Notify>,
    started: bool,
}

impl PacedWriter {
    pub fn new(fmt: AudioFormat, chunk_size: usize) -> Self {
        Self {
            fmt,
            chunk_size,
            tx: None,
            sink: Arc::new(Mutex::new(Vec::new())),
            started_notify: Arc::new(Notify::new()),
            started: false,
        }
    }

    /// Bytes emitted to the device so far, for test inspection.
    pub fn emitted(&self) -> Vec<u8> {
        self.sink.lock().clone()
    }

    pub fn emitted_len(&self) -> usize {
        self.sink.lock().len()
    }

    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(64);
        self.tx = Some(tx);
        let sink = self.sink.clone();
        let period = chunk_period(self.fmt, self.chunk_size);
        let chunk_size = self.chunk_size;
        tokio::spawn(async move {
            let mut pending: VecDeque<u8> = VecDeque::new();
            let mut tick = tokio::time::interval(period);
            loop {
                tick.tick().await;
                while let Ok(more) = rx.try_recv() {
                    pending.extend(more);
                }
                let mut frame = Vec::with_capacity(chunk_size);
                for _ in 0..chunk_size {
                    frame.push(pending.pop_front().unwrap_or(0));
                }
                sink.lock().extend(frame);
                if rx.is_closed() && pending.is_empty() {
                    break;
                }
            }
        });
    }
}

#[async_trait]
impl AudioWriter for PacedWriter {
    fn format(&self) -> AudioFormat {
        self.fmt
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    async fn write(&mut self, pcm: &[u8]) -> Result<(), MeetbotError> {
        let tx = self
            .tx
            .as_ref()
            .ok_or(MeetbotError::ComponentNotStarted("AudioWriter"))?;
        tx.send(pcm.to_vec())
            .await
            .map_err(|_| MeetbotError::Fatal("writer task died".to_string()))
    }
}
