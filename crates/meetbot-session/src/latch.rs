use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// The single shared "no-speech" signal: a level-triggered latch, not an
/// edge-triggered one, so a consumer that polls `is_set()` always
/// observes the current state rather than missing a transition. Owned
/// (set/clear) by the transcription controller; observed by the speech
/// controller and external callers.
#[derive(Clone)]
pub struct NoSpeechLatch {
    inner: Arc<LatchInner>,
}

struct LatchInner {
    is_set: AtomicBool,
    notify: Notify,
}

impl NoSpeechLatch {
    /// Initially *set*, meaning "no speech", per the transcription
    /// controller's starting state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(LatchInner {
                is_set: AtomicBool::new(true),
                notify: Notify::new(),
            }),
        }
    }

    pub fn is_set(&self) -> bool {
        self.inner.is_set.load(Ordering::SeqCst)
    }

    pub fn set(&self) {
        self.inner.is_set.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn clear(&self) {
        self.inner.is_set.store(false, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Resolves once the latch is set (used by `leave_meeting` to await
    /// "no active speech").
    pub async fn wait_until_set(&self) {
        loop {
            if self.is_set() {
                return;
            }
            let notified = self.inner.notify.notified();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for NoSpeechLatch {
    fn default() -> Self {
        Self::new()
    }
}
