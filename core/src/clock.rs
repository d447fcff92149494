//! The clock abstraction — one injected source of "now" shared by the
//! lifecycle engine and the SLA/escalation scheduler (spec §4.3).
//!
//! RULE: nothing in the engine may call `Utc::now()` directly. All
//! time-dependent logic reads the clock passed to it, so tests can drive
//! deterministic escalation scenarios with `VirtualClock`.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock: the real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock: holds a fixed instant that advances only when told to.
/// Mirrors the teacher's `SimClock::advance`, generalized from ticks to
/// arbitrary durations so scenarios like "advance to t0+8d" (spec §8,
/// scenario 4) can be expressed directly.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    inner: Arc<Mutex<DateTime<Utc>>>,
}

impl VirtualClock {
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) -> DateTime<Utc> {
        let mut guard = self.inner.lock().expect("virtual clock poisoned");
        *guard += by;
        *guard
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.inner.lock().expect("virtual clock poisoned") = to;
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.inner.lock().expect("virtual clock poisoned")
    }
}
