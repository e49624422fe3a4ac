//! Sliding-window throughput meter
//!
//! `RateMeter::on_message` is called once per delivered message, from any
//! number of delivery tasks at once. State is two atomics:
//! - `count`: messages seen since the current window started
//! - `window_start`: start of the current window, in clock milliseconds
//!
//! Closing a window is claimed with a compare-and-swap on `window_start`, so
//! when several callers see the window elapse together exactly one of them
//! takes the count (`swap(0)`), computes the rate and emits the observation.
//! Increments that land between the claim and the swap are attributed to the
//! closing window; none are lost.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::info;

const OBSERVATION_BUFFER: usize = 64;

/// Source of monotonic milliseconds for window accounting.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Monotonic clock counting from its creation.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Throughput of one closed window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateObservation {
    pub consumed: u64,
    pub elapsed_ms: u64,
    /// Messages per second over the window.
    pub rate: f64,
}

impl RateObservation {
    pub fn new(consumed: u64, elapsed_ms: u64) -> Self {
        let rate = if elapsed_ms == 0 {
            0.0
        } else {
            consumed as f64 * 1000.0 / elapsed_ms as f64
        };
        Self {
            consumed,
            elapsed_ms,
            rate,
        }
    }
}

pub struct RateMeter {
    count: AtomicU64,
    window_start: AtomicU64,
    window_ms: u64,
    clock: Arc<dyn Clock>,
    observations: broadcast::Sender<RateObservation>,
}

impl RateMeter {
    pub const DEFAULT_WINDOW: Duration = Duration::from_millis(5000);

    pub fn new(window: Duration) -> Self {
        Self::with_clock(window, Arc::new(SystemClock::new()))
    }

    /// A zero window is treated as one millisecond.
    pub fn with_clock(window: Duration, clock: Arc<dyn Clock>) -> Self {
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX).max(1);
        let (observations, _) = broadcast::channel(OBSERVATION_BUFFER);
        Self {
            count: AtomicU64::new(0),
            window_start: AtomicU64::new(clock.now_millis()),
            window_ms,
            clock,
            observations,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Messages counted in the current, still open, window.
    pub fn pending(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    pub fn observations(&self) -> broadcast::Receiver<RateObservation> {
        self.observations.subscribe()
    }

    /// Records one delivered message. Returns the observation if this call
    /// closed the window.
    pub fn on_message(&self) -> Option<RateObservation> {
        self.count.fetch_add(1, Ordering::AcqRel);

        let start = self.window_start.load(Ordering::Acquire);
        let now = self.clock.now_millis();
        let elapsed = now.saturating_sub(start);
        if elapsed < self.window_ms {
            return None;
        }

        // only the caller that moves window_start off `start` reports
        self.window_start
            .compare_exchange(start, now, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;

        let consumed = self.count.swap(0, Ordering::AcqRel);
        let observation = RateObservation::new(consumed, elapsed);
        info!(
            "Consumed {} messages ({:.2} msgs/sec)",
            observation.consumed, observation.rate
        );
        let _ = self.observations.send(observation);
        Some(observation)
    }
}

impl Default for RateMeter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW)
    }
}

impl std::fmt::Debug for RateMeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateMeter")
            .field("count", &self.pending())
            .field("window_start", &self.window_start.load(Ordering::Acquire))
            .field("window_ms", &self.window_ms)
            .finish()
    }
}
