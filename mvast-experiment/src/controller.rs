//! One trial: fixation, flicker, two ratings, commit.

use crate::config::TimingConfig;
use crate::error::ExperimentError;
use crate::rating::{capture_rating, RatingInput};
use chrono::SubsecRound;
use mvast_core::{
    Board, Display, Flow, PresentationError, PresentationFrame, ScaleKind, ScaleLayout,
    TrialPhase, TrialResult, TrialSpec,
};
use mvast_render::StimulusAssets;
use mvast_timing::{wait_for, CancelToken, FlickerPlan, FlipSink, FrameScheduler, Timer};
use tracing::{debug, info};

/// Drains pending input; a quit event sets the token. Returns whether the
/// run has been cancelled.
pub(crate) fn poll_quit<D: Display + ?Sized>(display: &mut D, cancel: &CancelToken) -> bool {
    if display.poll_input().iter().any(|e| e.is_quit()) {
        cancel.cancel();
    }
    cancel.is_cancelled()
}

/// Feeds scheduler flips to the display.
struct StimulusSink<'a, D: Display + ?Sized> {
    display: &'a mut D,
    cancel: &'a CancelToken,
    frames: [PresentationFrame; 2],
}

impl<D: Display + ?Sized> FlipSink for StimulusSink<'_, D> {
    type Error = PresentationError;

    fn present(&mut self, board: Board) -> Result<(), PresentationError> {
        let frame = match board {
            Board::A => &self.frames[0],
            Board::B => &self.frames[1],
        };
        self.display.show_frame(frame)
    }

    fn cancelled(&mut self) -> bool {
        poll_quit(&mut *self.display, self.cancel)
    }
}

/// Per-phase data carried between transitions.
#[derive(Debug, Clone, PartialEq)]
enum State {
    Fixation,
    Stimulus,
    RatingDiscomfort,
    RatingBrightness { discomfort: i32 },
    Committed(TrialResult),
    Cancelled,
}

impl State {
    fn phase(&self) -> TrialPhase {
        match self {
            State::Fixation => TrialPhase::Fixation,
            State::Stimulus => TrialPhase::Stimulus,
            State::RatingDiscomfort => TrialPhase::RatingDiscomfort,
            State::RatingBrightness { .. } => TrialPhase::RatingBrightness,
            State::Committed(_) => TrialPhase::Committed,
            State::Cancelled => TrialPhase::Cancelled,
        }
    }
}

/// Drives a single trial through its phases against a display.
pub struct TrialPhaseController<'a, D: Display + ?Sized, T: Timer> {
    display: &'a mut D,
    assets: &'a mut StimulusAssets,
    timer: &'a T,
    cancel: &'a CancelToken,
    timing: &'a TimingConfig,
    state: State,
}

impl<'a, D: Display + ?Sized, T: Timer> TrialPhaseController<'a, D, T> {
    pub fn new(
        display: &'a mut D,
        assets: &'a mut StimulusAssets,
        timer: &'a T,
        cancel: &'a CancelToken,
        timing: &'a TimingConfig,
    ) -> Self {
        Self {
            display,
            assets,
            timer,
            cancel,
            timing,
            state: State::Fixation,
        }
    }

    pub fn phase(&self) -> TrialPhase {
        self.state.phase()
    }

    /// Runs `spec` to `Committed` or `Cancelled`. Brightness variants made
    /// for the trial are released on every exit.
    pub fn run(&mut self, spec: &TrialSpec) -> Result<Flow<TrialResult>, ExperimentError> {
        self.state = State::Fixation;
        let outcome = self.drive(spec);
        self.assets.release_variants();
        outcome
    }

    fn drive(&mut self, spec: &TrialSpec) -> Result<Flow<TrialResult>, ExperimentError> {
        loop {
            let next = match self.state.clone() {
                State::Fixation => self.fixation(spec)?.map(|_| State::Stimulus),
                State::Stimulus => self.stimulus(spec)?.map(|_| State::RatingDiscomfort),
                State::RatingDiscomfort => self
                    .rate(ScaleKind::Unpleasantness)?
                    .map(|discomfort| State::RatingBrightness { discomfort }),
                State::RatingBrightness { discomfort } => {
                    self.rate(ScaleKind::Brightness)?.map(|brightness| {
                        // Stamped at the second confirmation.
                        let stamp = self.timer.wall_clock().trunc_subsecs(3);
                        State::Committed(TrialResult {
                            spec: spec.clone(),
                            discomfort_rating: discomfort,
                            brightness_rating: brightness,
                            response_timestamp: stamp,
                        })
                    })
                }
                State::Committed(result) => {
                    info!(
                        "trial {} committed: discomfort {}, brightness {}",
                        result.spec.trial_number, result.discomfort_rating, result.brightness_rating
                    );
                    return Ok(Flow::Completed(result));
                }
                State::Cancelled => {
                    info!("trial {} cancelled", spec.trial_number);
                    return Ok(Flow::Cancelled);
                }
            };
            let next = match next {
                Flow::Completed(state) => state,
                Flow::Cancelled => State::Cancelled,
            };
            debug!(
                "trial {}: {:?} -> {:?}",
                spec.trial_number,
                self.state.phase(),
                next.phase()
            );
            self.state = next;
        }
    }

    fn fixation(&mut self, spec: &TrialSpec) -> Result<Flow, ExperimentError> {
        self.display.set_pointer_visible(false);
        self.display.show_fixation()?;
        let display = &mut *self.display;
        let cancel = self.cancel;
        Ok(wait_for(
            self.timer,
            spec.fixation_duration(),
            self.timing.poll_tick(),
            &mut || poll_quit(display, cancel),
        ))
    }

    fn stimulus(&mut self, spec: &TrialSpec) -> Result<Flow, ExperimentError> {
        self.display.set_pointer_visible(false);
        let factor = spec.brightness_factor;
        let (a, b) = self.assets.pair(factor);
        let mut sink = StimulusSink {
            display: &mut *self.display,
            cancel: self.cancel,
            frames: [
                PresentationFrame {
                    board: Board::A,
                    brightness: factor,
                    buffer: a,
                },
                PresentationFrame {
                    board: Board::B,
                    brightness: factor,
                    buffer: b,
                },
            ],
        };
        let plan = FlickerPlan::new(spec.stimulus_duration(), spec.checkerboard_hz);
        let scheduler = FrameScheduler::new(self.timer.clone(), self.timing.poll_tick());
        let report = scheduler.run(&plan, &mut sink)?;
        debug!(
            "trial {}: {} flips, {} cycles, {} dropped, max lateness {:.3} ms",
            spec.trial_number,
            report.flips,
            report.completed_cycles,
            report.dropped,
            report.lateness.max_ns / 1_000_000.0
        );
        Ok(report.outcome)
    }

    fn rate(&mut self, kind: ScaleKind) -> Result<Flow<i32>, ExperimentError> {
        let (w, h) = self.display.size();
        let input = RatingInput::new(kind, ScaleLayout::for_screen(w, h));
        Ok(capture_rating(
            &mut *self.display,
            self.timer,
            self.cancel,
            input,
            self.timing.rating_refresh(),
        )?)
    }
}
