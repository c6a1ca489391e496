//! Two-image flicker presentation on absolute deadlines.
//!
//! Board A goes up at onset. The k-th half-period boundary falls at
//! `round(k * 1e9 / (2 * hz))` ns after onset, computed from `k` rather
//! than accumulated, so long runs cannot drift. Boundaries at or past the
//! stimulus duration are never presented: the last half-period is truncated.

use crate::stats::{FlipStats, LatenessSummary};
use crate::timer::Timer;
use crate::wait::wait_until;
use mvast_core::{Board, Flow};
use std::time::Duration;
use tracing::{debug, warn};

/// Receives flips and answers cancellation polls for a running schedule.
pub trait FlipSink {
    type Error;
    fn present(&mut self, board: Board) -> Result<(), Self::Error>;
    fn cancelled(&mut self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlickerPlan {
    duration_ns: u64,
    hz: f64,
}

impl FlickerPlan {
    pub fn new(duration: Duration, hz: f64) -> Self {
        Self {
            duration_ns: duration.as_nanos().min(u64::MAX as u128) as u64,
            hz,
        }
    }

    pub fn from_secs(duration_s: f64, hz: f64) -> Self {
        Self::new(
            Duration::try_from_secs_f64(duration_s).unwrap_or(Duration::ZERO),
            hz,
        )
    }

    pub fn duration(&self) -> Duration {
        Duration::from_nanos(self.duration_ns)
    }

    pub fn hz(&self) -> f64 {
        self.hz
    }

    /// No alternation: board A for the whole duration.
    pub fn is_static(&self) -> bool {
        !(self.hz > 0.0 && self.hz.is_finite())
    }

    pub fn half_period(&self) -> Option<Duration> {
        (!self.is_static()).then(|| Duration::from_secs_f64(0.5 / self.hz))
    }

    /// Offset of the k-th half-period boundary from onset.
    pub fn boundary_ns(&self, k: u64) -> u64 {
        if self.is_static() {
            return self.duration_ns;
        }
        ((k as f64) * 500_000_000.0 / self.hz).round() as u64
    }

    /// Board changes inside the stimulus window.
    pub fn flip_count(&self) -> u64 {
        if self.is_static() {
            return 0;
        }
        self.last_boundary(self.duration_ns, false)
    }

    /// Full A/B periods finished within `elapsed_ns` of onset.
    pub fn cycles_within(&self, elapsed_ns: u64) -> u64 {
        if self.is_static() {
            return 0;
        }
        let limit = elapsed_ns.min(self.duration_ns);
        self.last_boundary(limit, true) / 2
    }

    /// Largest `k` whose boundary falls before `limit_ns` (or on it, when
    /// `inclusive`). Starts from the analytic estimate and corrects for
    /// rounding, so the cost does not grow with duration.
    fn last_boundary(&self, limit_ns: u64, inclusive: bool) -> u64 {
        let within = |due: u64| if inclusive { due <= limit_ns } else { due < limit_ns };
        let mut k = (limit_ns as f64 * self.hz / 500_000_000.0).floor() as u64;
        while k > 0 && !within(self.boundary_ns(k)) {
            k -= 1;
        }
        while k < u64::MAX && within(self.boundary_ns(k + 1)) {
            k += 1;
        }
        k
    }

    pub fn completed_cycles(&self) -> u64 {
        self.cycles_within(self.duration_ns)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleReport {
    pub outcome: Flow,
    pub presentations: u64,
    pub flips: u64,
    pub dropped: u64,
    pub completed_cycles: u64,
    pub elapsed: Duration,
    pub lateness: LatenessSummary,
}

impl ScheduleReport {
    fn empty(outcome: Flow) -> Self {
        Self {
            outcome,
            presentations: 0,
            flips: 0,
            dropped: 0,
            completed_cycles: 0,
            elapsed: Duration::ZERO,
            lateness: LatenessSummary::default(),
        }
    }
}

pub struct FrameScheduler<T: Timer> {
    timer: T,
    poll_tick: Duration,
}

impl<T: Timer> FrameScheduler<T> {
    pub fn new(timer: T, poll_tick: Duration) -> Self {
        Self { timer, poll_tick }
    }

    pub fn poll_tick(&self) -> Duration {
        self.poll_tick
    }

    pub fn run<S: FlipSink>(
        &self,
        plan: &FlickerPlan,
        sink: &mut S,
    ) -> Result<ScheduleReport, S::Error> {
        if sink.cancelled() {
            return Ok(ScheduleReport::empty(Flow::Cancelled));
        }

        let start = self.timer.now();
        let end = start.saturating_add(plan.duration_ns);
        let mut report = ScheduleReport::empty(Flow::Completed(()));
        let mut stats = FlipStats::new();

        sink.present(Board::A)?;
        report.presentations = 1;

        let mut k = 1;
        while !plan.is_static() {
            let due = plan.boundary_ns(k);
            if due >= plan.duration_ns {
                break;
            }
            let flow = wait_until(&self.timer, start + due, self.poll_tick, &mut || {
                sink.cancelled()
            });
            if flow.is_cancelled() {
                report.outcome = Flow::Cancelled;
                break;
            }

            // Skip boundaries that are already past, keeping board parity.
            let now_rel = self.timer.now().saturating_sub(start);
            let mut latest = k;
            loop {
                let next = plan.boundary_ns(latest + 1);
                if next >= plan.duration_ns || next > now_rel {
                    break;
                }
                latest += 1;
            }
            if latest > k {
                report.dropped += latest - k;
                warn!(
                    "flicker fell behind: skipped {} boundaries before flip {}",
                    latest - k,
                    latest
                );
            }

            stats.record(Duration::from_nanos(
                now_rel.saturating_sub(plan.boundary_ns(latest)),
            ));
            sink.present(Board::for_boundary(latest))?;
            report.presentations += 1;
            report.flips += 1;
            k = latest + 1;
        }

        if !report.outcome.is_cancelled() {
            report.outcome = wait_until(&self.timer, end, self.poll_tick, &mut || {
                sink.cancelled()
            });
        }

        let elapsed = self.timer.now().saturating_sub(start);
        report.elapsed = Duration::from_nanos(elapsed);
        report.completed_cycles = plan.cycles_within(elapsed);
        report.lateness = stats.summary();

        debug!(
            "flicker {:?}: {} presentations, {} dropped, mean lateness {:.3} ms, jitter {:.3} ms",
            report.outcome,
            report.presentations,
            report.dropped,
            report.lateness.mean_ns / 1_000_000.0,
            report.lateness.jitter_ns / 1_000_000.0,
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualTimer;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::convert::Infallible;

    const TICK: Duration = Duration::from_millis(10);

    struct Recorder {
        timer: ManualTimer,
        shown: Vec<(Board, u64)>,
        cancel_at: Option<u64>,
        present_cost: Duration,
    }

    impl Recorder {
        fn new(timer: &ManualTimer) -> Self {
            Self {
                timer: timer.clone(),
                shown: Vec::new(),
                cancel_at: None,
                present_cost: Duration::ZERO,
            }
        }
    }

    impl FlipSink for Recorder {
        type Error = Infallible;

        fn present(&mut self, board: Board) -> Result<(), Infallible> {
            self.shown.push((board, self.timer.now()));
            self.timer.advance(self.present_cost);
            Ok(())
        }

        fn cancelled(&mut self) -> bool {
            self.cancel_at.is_some_and(|t| self.timer.now() >= t)
        }
    }

    fn run(plan: FlickerPlan, sink: &mut Recorder) -> ScheduleReport {
        let scheduler = FrameScheduler::new(sink.timer.clone(), TICK);
        match scheduler.run(&plan, sink) {
            Ok(report) => report,
            Err(never) => match never {},
        }
    }

    #[test]
    fn zero_hz_shows_board_a_for_the_full_duration() {
        let timer = ManualTimer::new();
        let mut sink = Recorder::new(&timer);
        let report = run(FlickerPlan::from_secs(2.5, 0.0), &mut sink);
        assert_eq!(sink.shown, vec![(Board::A, 0)]);
        assert_eq!(report.outcome, Flow::Completed(()));
        assert_eq!(report.flips, 0);
        assert_eq!(report.elapsed, Duration::from_millis(2500));
    }

    #[test]
    fn five_hz_alternates_on_exact_half_periods() {
        let timer = ManualTimer::new();
        let mut sink = Recorder::new(&timer);
        let plan = FlickerPlan::from_secs(2.0, 5.0);
        let report = run(plan, &mut sink);

        assert_eq!(report.presentations, 20);
        assert_eq!(report.flips, 19);
        assert_eq!(report.dropped, 0);
        assert_eq!(report.completed_cycles, 10);
        assert_eq!(report.elapsed, Duration::from_secs(2));
        for (k, (board, at)) in sink.shown.iter().enumerate() {
            assert_eq!(*board, Board::for_boundary(k as u64));
            assert_eq!(*at, k as u64 * 100_000_000);
        }
        assert_eq!(report.lateness.max_ns, 0.0);
    }

    #[test]
    fn fractional_frequencies_do_not_drift() {
        let plan = FlickerPlan::from_secs(10.0, 7.5);
        assert_eq!(plan.boundary_ns(150), 10_000_000_000);
        assert_eq!(plan.completed_cycles(), 75);
        assert_eq!(plan.flip_count(), 149);
    }

    #[test]
    fn completed_cycles_equal_floor_of_duration_times_hz() {
        let fixed = [(2.0, 5.0), (10.0, 7.5), (1.05, 5.0), (3.3, 4.0), (1.0, 7.5)];
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let sampled: Vec<(f64, f64)> = (0..200)
            .map(|_| (rng.random_range(0.2..12.0), rng.random_range(0.5..30.0)))
            .collect();

        for (duration, hz) in fixed.into_iter().chain(sampled) {
            let timer = ManualTimer::new();
            let mut sink = Recorder::new(&timer);
            let plan = FlickerPlan::from_secs(duration, hz);
            let report = run(plan, &mut sink);

            let expected = (duration * hz).floor() as u64;
            assert_eq!(report.completed_cycles, expected, "{duration} s @ {hz} Hz");
            assert_eq!(report.flips, plan.flip_count());
            assert!(report.elapsed <= plan.duration() + TICK);
            assert!(sink.shown.iter().all(|(_, at)| *at < plan.duration().as_nanos() as u64));
        }
    }

    #[test]
    fn counts_agree_with_walking_every_boundary() {
        let walk_flips = |plan: &FlickerPlan| {
            let mut k = 1;
            while plan.boundary_ns(k) < plan.duration_ns {
                k += 1;
            }
            k - 1
        };
        let walk_cycles = |plan: &FlickerPlan, limit: u64| {
            let mut c = 0;
            while plan.boundary_ns(2 * (c + 1)) <= limit {
                c += 1;
            }
            c
        };
        let mut rng = StdRng::seed_from_u64(0xc0de);
        let grid = [(2.8, 22.5), (10.0, 7.5), (0.1, 30.0), (20.0, 0.1), (1.0, 7.5)];
        let sampled: Vec<(f64, f64)> = (0..300)
            .map(|_| (rng.random_range(0.1..20.0), rng.random_range(0.1..30.0)))
            .collect();
        for (duration, hz) in grid.into_iter().chain(sampled) {
            let plan = FlickerPlan::from_secs(duration, hz);
            assert_eq!(plan.flip_count(), walk_flips(&plan), "{duration} s @ {hz} Hz");
            assert_eq!(
                plan.completed_cycles(),
                walk_cycles(&plan, plan.duration_ns),
                "{duration} s @ {hz} Hz"
            );
            let half = plan.duration_ns / 2;
            assert_eq!(plan.cycles_within(half), walk_cycles(&plan, half));
        }
    }

    #[test]
    fn hour_long_stimulus_counts_without_walking() {
        let plan = FlickerPlan::from_secs(3600.0, 7.5);
        assert_eq!(plan.completed_cycles(), 27_000);
        assert_eq!(plan.flip_count(), 53_999);
    }

    #[test]
    fn cancellation_stops_within_one_tick() {
        let timer = ManualTimer::new();
        let mut sink = Recorder::new(&timer);
        sink.cancel_at = Some(1_234_000_000);
        let report = run(FlickerPlan::from_secs(4.0, 7.5), &mut sink);

        assert_eq!(report.outcome, Flow::Cancelled);
        assert!(timer.now() >= 1_234_000_000);
        assert!(timer.now() < 1_234_000_000 + TICK.as_nanos() as u64);
        assert!(sink.shown.iter().all(|(_, at)| *at < 1_234_000_000));
        // periods of 133.3 ms: nine fit before 1.234 s
        assert_eq!(report.completed_cycles, 9);
    }

    #[test]
    fn cancelled_before_onset_presents_nothing() {
        let timer = ManualTimer::new();
        let mut sink = Recorder::new(&timer);
        sink.cancel_at = Some(0);
        let report = run(FlickerPlan::from_secs(1.0, 5.0), &mut sink);
        assert_eq!(report.outcome, Flow::Cancelled);
        assert!(sink.shown.is_empty());
    }

    #[test]
    fn slow_presentation_skips_boundaries_but_keeps_parity() {
        let timer = ManualTimer::new();
        let mut sink = Recorder::new(&timer);
        sink.present_cost = Duration::from_millis(120);
        let plan = FlickerPlan::from_secs(0.5, 10.0);
        let report = run(plan, &mut sink);

        assert_eq!(report.presentations, 5);
        assert_eq!(report.dropped, 5);
        assert_eq!(report.flips + report.dropped, plan.flip_count());
        let boards: Vec<Board> = sink.shown.iter().map(|(b, _)| *b).collect();
        assert_eq!(
            boards,
            vec![Board::A, Board::A, Board::A, Board::B, Board::B]
        );
    }
}
