use crate::timer::Timer;
use mvast_core::Flow;
use std::time::Duration;

/// Sleeps until `deadline` (timer nanoseconds), checking `cancelled` at least
/// once per `tick`. The check runs before every sleep, so a request raised
/// during the wait is seen within one tick.
pub fn wait_until<T, C>(timer: &T, deadline: u64, tick: Duration, cancelled: &mut C) -> Flow
where
    T: Timer,
    C: FnMut() -> bool,
{
    let tick = tick.max(Duration::from_micros(100));
    loop {
        if cancelled() {
            return Flow::Cancelled;
        }
        let now = timer.now();
        if now >= deadline {
            return Flow::Completed(());
        }
        let remaining = Duration::from_nanos(deadline - now);
        timer.sleep(remaining.min(tick));
    }
}

/// `wait_until` relative to the current time.
pub fn wait_for<T, C>(timer: &T, duration: Duration, tick: Duration, cancelled: &mut C) -> Flow
where
    T: Timer,
    C: FnMut() -> bool,
{
    let deadline = timer.now().saturating_add(duration.as_nanos() as u64);
    wait_until(timer, deadline, tick, cancelled)
}
