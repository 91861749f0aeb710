//! Typed pub/sub with event types from a closed set (`segment`,
//! `utterance`). `publish` schedules each handler as an independent
//! detached task; handler panics are swallowed and logged, never
//! propagated to the publisher. Delivery ordering between distinct
//! subscribers is unspecified; ordering of events to a single subscriber
//! is publish order (tasks for one subscriber are spawned in publish
//! order, though the runtime may interleave their completion).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use meetbot_transcript::TranscriptSegment;
use parking_lot::Mutex;

/// The closed set of notifications the pipeline publishes.
#[derive(Debug, Clone)]
pub enum Event {
    Segment(TranscriptSegment),
    Utterance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Segment,
    Utterance,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Segment(_) => EventKind::Segment,
            Event::Utterance => EventKind::Utterance,
        }
    }
}

type Handler = Arc<dyn Fn(Event) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

struct Subscriber {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct Inner {
    subscribers: HashMap<EventKind, Vec<Subscriber>>,
}

/// Shared, cloneable event bus.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Inner>>,
    next_id: Arc<AtomicU64>,
}

/// Returned by `subscribe`; dropping it does nothing, `unsubscribe()`
/// must be called explicitly to remove the handler (mirrors the
/// reference's returned-closure pattern rather than Drop-based RAII).
pub struct Subscription {
    bus: EventBus,
    kind: EventKind,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        let mut inner = self.bus.inner.lock();
        if let Some(handlers) = inner.subscribers.get_mut(&self.kind) {
            handlers.retain(|s| s.id != self.id);
            if handlers.is_empty() {
                inner.subscribers.remove(&self.kind);
            }
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `kind`. Returns a `Subscription` whose
    /// `unsubscribe()` removes it.
    pub fn subscribe<F, Fut>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let handler: Handler = Arc::new(move |event| Box::pin(handler(event)));
        self.inner
            .lock()
            .subscribers
            .entry(kind)
            .or_default()
            .push(Subscriber { id, handler });
        Subscription {
            bus: self.clone(),
            kind,
            id,
        }
    }

    /// Schedule every handler registered for `event.kind()` as an
    /// independent detached task. Never blocks on handler execution.
    pub fn publish(&self, event: Event) {
        let kind = event.kind();
        let handlers: Vec<Handler> = {
            let inner = self.inner.lock();
            inner
                .subscribers
                .get(&kind)
                .map(|v| v.iter().map(|s| s.handler.clone()).collect())
                .unwrap_or_default()
        };
        for handler in handlers {
            let event = event.clone();
            let task = tokio::spawn(async move { handler(event).await });
            tokio::spawn(async move {
                if let Err(err) = task.await {
                    tracing::warn!(error = %err, "event handler panicked");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meetbot_transcript::Role;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn publish_invokes_subscribed_handlers() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let _sub = bus.subscribe(EventKind::Utterance, move |_event| {
            let count = count2.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
            }
        });

        bus.publish(Event::Utterance);
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let sub = bus.subscribe(EventKind::Segment, move |_event| {
            let count = count2.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
            }
        });
        sub.unsubscribe();

        let seg = TranscriptSegment::new("hi", 0.0, 1.0, None, Role::Participant);
        bus.publish(Event::Segment(seg));
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panicking_handler_does_not_stop_publish() {
        let bus = EventBus::new();
        let _sub1 = bus.subscribe(EventKind::Utterance, |_event| async {
            panic!("boom");
        });
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let _sub2 = bus.subscribe(EventKind::Utterance, move |_event| {
            let count = count2.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
            }
        });

        bus.publish(Event::Utterance);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
