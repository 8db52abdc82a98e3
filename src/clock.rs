//! Scheduling clocks.

#![allow(missing_docs)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Clock interface for the cyclic scheduler.
///
/// The scheduler only polls; it never sleeps. `now` is elapsed time since some
/// fixed origin and must be monotonic.
pub trait Clock {
    /// Return the current time for scheduling.
    fn now(&self) -> Duration;
}

/// Monotonic clock based on `std::time::Instant`.
#[derive(Debug, Clone)]
pub struct StdClock {
    start: std::time::Instant,
}

impl StdClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Deterministic clock for tests and simulations.
///
/// Clones share the same time source, so a test can keep one clone and hand
/// another to the engine.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance time by the given delta.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().expect("manual clock lock poisoned");
        *now = now.saturating_add(delta);
    }

    /// Set the current time explicitly.
    pub fn set_time(&self, time: Duration) {
        *self.now.lock().expect("manual clock lock poisoned") = time;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().expect("manual clock lock poisoned")
    }
}
