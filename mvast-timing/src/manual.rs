use crate::timer::Timer;
use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Deterministic clock: `sleep` advances virtual time instantly.
///
/// Clones share the same clock, so a test can hold one handle while the
/// code under test sleeps on another.
#[derive(Debug, Clone)]
pub struct ManualTimer {
    nanos: Arc<AtomicU64>,
    origin: DateTime<Local>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::starting_at(Local::now())
    }

    pub fn starting_at(origin: DateTime<Local>) -> Self {
        Self {
            nanos: Arc::new(AtomicU64::new(0)),
            origin,
        }
    }

    pub fn advance(&self, d: Duration) {
        self.nanos
            .fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for ManualTimer {
    fn now(&self) -> u64 {
        self.nanos.load(Ordering::SeqCst)
    }
    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
    fn origin(&self) -> DateTime<Local> {
        self.origin
    }
}
