//! Core clock rate requests.
//!
//! The composer core clock is shared with other consumers, so the engine
//! never sets a rate directly. It files minimum-rate requests and the clock
//! provider runs at the highest outstanding one. [`ClockRequest`] withdraws
//! its request when dropped.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Handle for one outstanding rate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

/// A clock that honors minimum-rate requests.
pub trait CoreClock: Send + Sync {
    /// File a request; the clock runs at least at `rate_hz` until the
    /// request is finished.
    fn start_request(&self, rate_hz: u64) -> RequestId;

    /// Withdraw a request.
    fn finish_request(&self, id: RequestId);

    /// The rate the clock currently runs at.
    fn effective_rate(&self) -> u64;
}

/// An outstanding rate request, withdrawn on drop.
pub struct ClockRequest {
    clock: Arc<dyn CoreClock>,
    id: Option<RequestId>,
    rate_hz: u64,
}

impl ClockRequest {
    /// File a request for at least `rate_hz`.
    pub fn start(clock: Arc<dyn CoreClock>, rate_hz: u64) -> Self {
        let id = clock.start_request(rate_hz);
        Self {
            clock,
            id: Some(id),
            rate_hz,
        }
    }

    /// The rate this request asked for.
    pub fn rate_hz(&self) -> u64 {
        self.rate_hz
    }

    /// Withdraw the request now instead of at drop time.
    pub fn finish(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.clock.finish_request(id);
        }
    }
}

impl Drop for ClockRequest {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ClockRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClockRequest")
            .field("id", &self.id)
            .field("rate_hz", &self.rate_hz)
            .finish()
    }
}

/// In-memory clock provider for tests and simulation. Tracks the rate it
/// would run at and a history of every rate change.
pub struct SoftClock {
    inner: Mutex<SoftClockInner>,
}

struct SoftClockInner {
    base_rate_hz: u64,
    next_id: u64,
    requests: HashMap<u64, u64>,
    history: Vec<u64>,
}

impl SoftClock {
    pub fn new() -> Self {
        Self::with_base_rate(0)
    }

    /// A soft clock idling at `base_rate_hz` when no requests are pending.
    pub fn with_base_rate(base_rate_hz: u64) -> Self {
        Self {
            inner: Mutex::new(SoftClockInner {
                base_rate_hz,
                next_id: 0,
                requests: HashMap::new(),
                history: vec![base_rate_hz],
            }),
        }
    }

    /// Every rate the clock has run at, oldest first.
    pub fn rate_history(&self) -> Vec<u64> {
        self.inner.lock().history.clone()
    }
}

impl Default for SoftClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftClockInner {
    fn effective(&self) -> u64 {
        self.requests
            .values()
            .copied()
            .max()
            .map_or(self.base_rate_hz, |r| r.max(self.base_rate_hz))
    }

    fn record(&mut self) {
        let rate = self.effective();
        if self.history.last() != Some(&rate) {
            self.history.push(rate);
        }
    }
}

impl CoreClock for SoftClock {
    fn start_request(&self, rate_hz: u64) -> RequestId {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.requests.insert(id, rate_hz);
        inner.record();
        trace!(id, rate_hz, "clock request started");
        RequestId(id)
    }

    fn finish_request(&self, id: RequestId) {
        let mut inner = self.inner.lock();
        inner.requests.remove(&id.0);
        inner.record();
        trace!(id = id.0, "clock request finished");
    }

    fn effective_rate(&self) -> u64 {
        self.inner.lock().effective()
    }
}
