//! Clock abstraction for test determinism.
//!
//! The session clock exposes monotonic seconds since the bot joined a
//! meeting. A real clock anchors to `Instant::now()` at construction; a
//! test clock lets tests advance meeting time deterministically without
//! sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Monotonic meeting-time source, seconds since the clock was started.
pub trait Clock: Send + Sync {
    /// Seconds elapsed since the clock started.
    fn now_s(&self) -> f64;

    /// Sleep for the given duration (in real time, or advance virtual time).
    fn sleep(&self, duration: Duration) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>>;
}

/// Real-time clock anchored to its construction instant.
pub struct RealClock {
    start: Instant,
}

impl RealClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for RealClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for RealClock {
    fn now_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn sleep(
        &self,
        duration: Duration,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Virtual clock for deterministic tests. `advance()` moves meeting time
/// forward without actually waiting; `sleep()` does the same so that code
/// under test can `.await` it cooperatively.
pub struct TestClock {
    elapsed_ns: AtomicU64,
    // Guards callers that need to serialize advances from multiple tasks.
    lock: Mutex<()>,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            elapsed_ns: AtomicU64::new(0),
            lock: Mutex::new(()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let _guard = self.lock.lock().unwrap();
        self.elapsed_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn set_elapsed(&self, duration: Duration) {
        let _guard = self.lock.lock().unwrap();
        self.elapsed_ns
            .store(duration.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now_s(&self) -> f64 {
        self.elapsed_ns.load(Ordering::SeqCst) as f64 / 1_000_000_000.0
    }

    fn sleep(
        &self,
        duration: Duration,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>> {
        self.advance(duration);
        Box::pin(std::future::ready(()))
    }
}

/// Thread-safe, cloneable handle to a clock.
pub type SharedClock = std::sync::Arc<dyn Clock>;

pub fn real_clock() -> SharedClock {
    std::sync::Arc::new(RealClock::new())
}

pub fn test_clock() -> SharedClock {
    std::sync::Arc::new(TestClock::new())
}
