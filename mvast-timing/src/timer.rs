use chrono::{DateTime, Local, TimeDelta};
use std::time::{Duration, Instant};

/// Trait for high-precision monotonic timers
pub trait Timer: Clone + Send + Sync {
    /// Nanoseconds since the timer was created. Never decreases.
    fn now(&self) -> u64;
    fn sleep(&self, d: Duration);
    /// Wall-clock time at which the timer was created.
    fn origin(&self) -> DateTime<Local>;

    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }

    /// Wall-clock time derived from the monotonic clock, so stamps taken
    /// within one run never go backwards.
    fn wall_clock(&self) -> DateTime<Local> {
        let nanos = i64::try_from(self.now()).unwrap_or(i64::MAX);
        self.origin() + TimeDelta::nanoseconds(nanos)
    }
}

#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    start: Instant,
    origin: DateTime<Local>,
}

impl Timer for HighPrecisionTimer {
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
    fn origin(&self) -> DateTime<Local> {
        self.origin
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            origin: Local::now(),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC, EINTR};

        let mut req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };
        let mut rem = timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };

        // clock_nanosleep returns the error number directly; resume after signals.
        loop {
            let rc = unsafe { clock_nanosleep(CLOCK_MONOTONIC, 0, &req, &mut rem) };
            if rc != EINTR {
                break;
            }
            req = rem;
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleeps_at_least_the_requested_time() {
        let timer = HighPrecisionTimer::new();
        let t0 = timer.now();
        timer.sleep(Duration::from_millis(3));
        assert!(timer.elapsed(t0) >= Duration::from_millis(3));
    }

    #[test]
    fn wall_clock_tracks_monotonic_time() {
        let timer = HighPrecisionTimer::new();
        let a = timer.wall_clock();
        timer.sleep(Duration::from_millis(2));
        let b = timer.wall_clock();
        assert!(b > a);
        assert!(a >= timer.origin());
    }
}
