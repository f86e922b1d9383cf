//! Graceful shutdown with in-flight request tracking.
//!
//! Health state lives in an `ArcSwap` so the request path reads it without
//! locking. In-flight requests are counted with RAII guards, and the last
//! guard to drop wakes whoever is waiting for the drain.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Server health state.
///
/// State machine: Starting -> Ready -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Starting,
    Ready,
    /// The shutdown signal fired; new requests are refused with `UNAVAILABLE`.
    Draining,
    /// Every in-flight request finished after draining.
    Stopped,
}

impl HealthState {
    /// Whether new protocol requests may be dispatched.
    #[must_use]
    pub fn is_accepting(self) -> bool {
        matches!(self, Self::Starting | Self::Ready)
    }
}

/// Coordinates shutdown of the HTTP binding.
#[derive(Debug)]
pub struct ShutdownController {
    in_flight: Arc<AtomicU64>,
    /// Signalled when the last in-flight guard is dropped.
    drained: Arc<Notify>,
    health_state: ArcSwap<HealthState>,
}

impl ShutdownController {
    /// Creates a controller in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(AtomicU64::new(0)),
            drained: Arc::new(Notify::new()),
            health_state: ArcSwap::from_pointee(HealthState::Starting),
        }
    }

    pub fn set_ready(&self) {
        self.health_state.store(Arc::new(HealthState::Ready));
    }

    /// Moves to `Draining`; from here on new requests are refused.
    pub fn trigger_shutdown(&self) {
        self.health_state.store(Arc::new(HealthState::Draining));
    }

    #[must_use]
    pub fn health_state(&self) -> HealthState {
        **self.health_state.load()
    }

    /// Counts one in-flight request until the guard is dropped, including
    /// during unwinding.
    #[must_use]
    pub fn in_flight_guard(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            drained: Arc::clone(&self.drained),
        }
    }

    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Waits for in-flight requests to finish, up to `timeout`.
    ///
    /// Returns `true` and moves to `Stopped` once none remain; returns
    /// `false` (still `Draining`) if the timeout expired first.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            // Register before reading the counter so a guard dropped in
            // between still wakes us.
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.in_flight_count() == 0 {
                self.health_state.store(Arc::new(HealthState::Stopped));
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return false;
            }
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter on drop and wakes drain waiters at zero.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
    drained: Arc<Notify>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }
}
