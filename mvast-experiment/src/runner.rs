use crate::config::{RunConfig, TimingConfig};
use crate::controller::{poll_quit, TrialPhaseController};
use crate::error::{ExperimentError, PersistenceError};
use crate::instructions;
use crate::persist::{RunMetadata, RunRecorder, RunReport, ScoreSink, ScoreSummary};
use chrono::SubsecRound;
use mvast_core::{
    validate_sequence, Board, Display, Flow, InputError, InputEvent, PresentationError, RunOutcome,
    TrialResult, TrialSpec,
};
use mvast_render::StimulusAssets;
use mvast_timing::{wait_for, CancelToken, Timer};
use std::time::Duration;
use tracing::{error, info, warn};

/// Per-run settings fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub participant_id: String,
    pub schedule_name: String,
    pub timing: TimingConfig,
    pub show_instructions: bool,
}

impl RunSettings {
    pub fn new(participant_id: impl Into<String>, schedule_name: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            schedule_name: schedule_name.into(),
            timing: TimingConfig::default(),
            show_instructions: true,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            participant_id: config.participant().to_string(),
            schedule_name: config.schedule_name(),
            timing: config.timing.clone(),
            show_instructions: config.show_instructions,
        }
    }
}

/// Hands results to the persistence collaborators exactly once, including
/// when the run unwinds.
struct Finalizer<'a, R: RunRecorder, S: ScoreSink, T: Timer> {
    recorder: &'a mut R,
    scores: &'a mut S,
    timer: &'a T,
    participant: &'a str,
    results: Vec<TrialResult>,
    finished: bool,
}

impl<'a, R: RunRecorder, S: ScoreSink, T: Timer> Finalizer<'a, R, S, T> {
    fn new(recorder: &'a mut R, scores: &'a mut S, timer: &'a T, participant: &'a str) -> Self {
        Self {
            recorder,
            scores,
            timer,
            participant,
            results: Vec::new(),
            finished: false,
        }
    }

    /// Commits a result; it is kept even if the record stream rejects it.
    fn commit(&mut self, result: TrialResult) -> Result<(), PersistenceError> {
        self.results.push(result);
        match self.results.last() {
            Some(r) => self.recorder.record(r),
            None => Ok(()),
        }
    }

    fn finish(&mut self, outcome: &'static str) -> Result<(), PersistenceError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let ended_at = self.timer.wall_clock();
        let logged = self.recorder.finish(&RunReport {
            outcome,
            results: &self.results,
            ended_at,
        });
        let saved = match ScoreSummary::from_results(self.participant, &self.results, ended_at) {
            Some(summary) => {
                let (d, b) = summary.rounded();
                info!(
                    "average scores over {} trials: discomfort {:.2}, brightness {:.2}",
                    summary.rated_trials, d, b
                );
                self.scores.save(&summary)
            }
            None => {
                info!("no ratings collected; score summary skipped");
                Ok(())
            }
        };
        logged.and(saved)
    }

    fn into_results(mut self) -> Vec<TrialResult> {
        std::mem::take(&mut self.results)
    }
}

impl<R: RunRecorder, S: ScoreSink, T: Timer> Drop for Finalizer<'_, R, S, T> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("run ended without finalisation; closing data log");
            if let Err(e) = self.finish("failed") {
                error!("failed to finalise data log: {e}");
            }
        }
    }
}

/// Runs an ordered trial list and reports how the run ended.
pub struct TrialRunner<D, T, R, S>
where
    D: Display,
    T: Timer,
    R: RunRecorder,
    S: ScoreSink,
{
    display: D,
    timer: T,
    assets: StimulusAssets,
    recorder: R,
    scores: S,
    settings: RunSettings,
    cancel: CancelToken,
}

impl<D, T, R, S> TrialRunner<D, T, R, S>
where
    D: Display,
    T: Timer,
    R: RunRecorder,
    S: ScoreSink,
{
    pub fn new(
        display: D,
        timer: T,
        assets: StimulusAssets,
        recorder: R,
        scores: S,
        settings: RunSettings,
    ) -> Self {
        Self {
            display,
            timer,
            assets,
            recorder,
            scores,
            settings,
            cancel: CancelToken::new(),
        }
    }

    /// Setting the returned token stops the run at its next check.
    ///
    /// The token is never reset, so a runner is single-use: once a run has
    /// been stopped, every later `run` ends as aborted before its first trial.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    pub fn scores(&self) -> &S {
        &self.scores
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Runs every trial in order.
    ///
    /// Malformed specs are rejected before anything is shown or written.
    /// Otherwise the record stream is finalised exactly once whatever the
    /// outcome, then the closing message is shown.
    pub fn run(&mut self, specs: &[TrialSpec]) -> Result<RunOutcome, InputError> {
        validate_sequence(specs)?;

        let Self {
            display,
            timer,
            assets,
            recorder,
            scores,
            settings,
            cancel,
        } = self;

        let meta = RunMetadata::new(
            &settings.participant_id,
            &settings.schedule_name,
            assets.name(Board::A),
            assets.name(Board::B),
            timer.wall_clock().trunc_subsecs(0),
        );
        info!(
            "run started: participant {}, {} trials from {}",
            meta.participant_id,
            specs.len(),
            meta.schedule_name
        );

        let mut finalizer = Finalizer::new(recorder, scores, timer, &settings.participant_id);
        let ended = execute(display, assets, timer, cancel, settings, &meta, &mut finalizer, specs);

        let (failure, aborted) = match ended {
            Ok(()) => (None, false),
            Err(ExperimentError::UserCancelled) => {
                cancel.cancel();
                (None, true)
            }
            Err(e) => {
                error!("run failed: {e}");
                (Some(e.to_string()), false)
            }
        };
        let label = match (&failure, aborted) {
            (Some(_), _) => "failed",
            (None, true) => "aborted",
            (None, false) => "completed",
        };

        let finished = finalizer.finish(label);
        let results = finalizer.into_results();
        let outcome = match (failure, finished) {
            (Some(reason), Err(e)) => {
                error!("failed to finalise data log: {e}");
                RunOutcome::Failed { reason, results }
            }
            (Some(reason), Ok(())) => RunOutcome::Failed { reason, results },
            (None, Err(e)) => {
                error!("failed to finalise data log: {e}");
                RunOutcome::Failed {
                    reason: e.to_string(),
                    results,
                }
            }
            (None, Ok(())) if aborted => RunOutcome::Aborted(results),
            (None, Ok(())) => RunOutcome::Completed(results),
        };
        info!(
            "run {} with {} of {} trials",
            outcome.label(),
            outcome.results().len(),
            specs.len()
        );

        show_closing(display, timer, &settings.timing, &outcome);
        Ok(outcome)
    }
}

/// Begins the record stream and runs the trials; a quit surfaces as
/// `ExperimentError::UserCancelled`.
#[allow(clippy::too_many_arguments)]
fn execute<D, T, R, S>(
    display: &mut D,
    assets: &mut StimulusAssets,
    timer: &T,
    cancel: &CancelToken,
    settings: &RunSettings,
    meta: &RunMetadata,
    finalizer: &mut Finalizer<'_, R, S, T>,
    specs: &[TrialSpec],
) -> Result<(), ExperimentError>
where
    D: Display,
    T: Timer,
    R: RunRecorder,
    S: ScoreSink,
{
    finalizer.recorder.begin(meta)?;

    if settings.show_instructions {
        let text = instructions(&settings.participant_id);
        if wait_for_key(display, timer, cancel, &settings.timing, &text)?.is_cancelled() {
            info!("run stopped at the instruction screen");
            return Err(ExperimentError::UserCancelled);
        }
    }

    let mut controller = TrialPhaseController::new(display, assets, timer, cancel, &settings.timing);
    for spec in specs {
        match controller.run(spec)? {
            Flow::Completed(result) => finalizer.commit(result)?,
            Flow::Cancelled => return Err(ExperimentError::UserCancelled),
        }
    }
    Ok(())
}

/// Shows `text` until any key is pressed.
fn wait_for_key<D: Display, T: Timer>(
    display: &mut D,
    timer: &T,
    cancel: &CancelToken,
    timing: &TimingConfig,
    text: &str,
) -> Result<Flow, PresentationError> {
    display.set_pointer_visible(false);
    display.show_message(text)?;
    loop {
        for event in display.poll_input() {
            match event {
                InputEvent::Quit => {
                    cancel.cancel();
                    return Ok(Flow::Cancelled);
                }
                InputEvent::KeyPressed => return Ok(Flow::Completed(())),
                _ => {}
            }
        }
        if cancel.is_cancelled() {
            return Ok(Flow::Cancelled);
        }
        timer.sleep(timing.input_wait());
    }
}

fn closing_message(outcome: &RunOutcome, timing: &TimingConfig) -> (String, u64) {
    match outcome {
        RunOutcome::Completed(_) => (
            "Experiment complete. Thank you!\nWindow will close shortly.".to_string(),
            timing.complete_hold_ms,
        ),
        RunOutcome::Aborted(_) => ("Experiment stopped.".to_string(), timing.stopped_hold_ms),
        RunOutcome::Failed { reason, .. } => {
            (format!("Error:\n{reason}\nStopped."), timing.error_hold_ms)
        }
    }
}

/// Holds the closing message; a fresh quit event cuts the hold short.
fn show_closing<D: Display, T: Timer>(
    display: &mut D,
    timer: &T,
    timing: &TimingConfig,
    outcome: &RunOutcome,
) {
    let (text, hold_ms) = closing_message(outcome, timing);
    if let Err(e) = display.show_message(&text) {
        warn!("cannot show closing message: {e}");
        return;
    }
    if hold_ms == 0 {
        return;
    }
    let skip = CancelToken::new();
    wait_for(
        timer,
        Duration::from_millis(hold_ms),
        timing.poll_tick(),
        &mut || poll_quit(&mut *display, &skip),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::{MemoryLog, MemoryScores};
    use mvast_core::{FrameBuffer, PresentationFrame, RatingView};
    use mvast_timing::ManualTimer;

    #[derive(Default)]
    struct Screen {
        messages: Vec<String>,
        pending: Vec<InputEvent>,
    }

    impl Display for Screen {
        fn size(&self) -> (u32, u32) {
            (1920, 1080)
        }
        fn show_fixation(&mut self) -> Result<(), PresentationError> {
            Ok(())
        }
        fn show_frame(&mut self, _frame: &PresentationFrame) -> Result<(), PresentationError> {
            Ok(())
        }
        fn show_rating(&mut self, _view: &RatingView<'_>) -> Result<(), PresentationError> {
            Ok(())
        }
        fn show_message(&mut self, text: &str) -> Result<(), PresentationError> {
            self.messages.push(text.to_string());
            Ok(())
        }
        fn set_pointer_visible(&mut self, _visible: bool) {}
        fn poll_input(&mut self) -> Vec<InputEvent> {
            std::mem::take(&mut self.pending)
        }
    }

    fn assets() -> StimulusAssets {
        StimulusAssets::from_frames(
            "a.png",
            FrameBuffer::solid(2, 2, [255; 4]),
            "b.png",
            FrameBuffer::solid(2, 2, [0, 0, 0, 255]),
        )
        .unwrap()
    }

    fn spec(n: u32) -> TrialSpec {
        TrialSpec {
            trial_number: n,
            block_number: 0,
            trial_in_block: n,
            brightness_factor: 0.5,
            stimulus_duration_s: 0.5,
            fixation_duration_s: 0.5,
            checkerboard_hz: 5.0,
        }
    }

    #[test]
    fn closing_messages_follow_the_outcome() {
        let timing = TimingConfig::default();
        assert_eq!(
            closing_message(&RunOutcome::Completed(vec![]), &timing),
            (
                "Experiment complete. Thank you!\nWindow will close shortly.".to_string(),
                4000
            )
        );
        assert_eq!(
            closing_message(&RunOutcome::Aborted(vec![]), &timing).1,
            2000
        );
        let failed = RunOutcome::Failed {
            reason: "display surface lost: gone".into(),
            results: vec![],
        };
        assert_eq!(
            closing_message(&failed, &timing),
            ("Error:\ndisplay surface lost: gone\nStopped.".to_string(), 5000)
        );
    }

    #[test]
    fn closing_hold_uses_the_configured_duration() {
        let timer = ManualTimer::new();
        let mut screen = Screen::default();
        show_closing(
            &mut screen,
            &timer,
            &TimingConfig::default(),
            &RunOutcome::Aborted(vec![]),
        );
        assert_eq!(screen.messages, vec!["Experiment stopped."]);
        assert_eq!(timer.now(), 2_000_000_000);
    }

    #[test]
    fn instruction_screen_waits_for_a_key() {
        let timer = ManualTimer::new();
        let cancel = CancelToken::new();
        let mut screen = Screen {
            pending: vec![
                InputEvent::PointerMoved { x: 1.0, y: 1.0 },
                InputEvent::KeyPressed,
            ],
            ..Screen::default()
        };
        let flow = wait_for_key(&mut screen, &timer, &cancel, &TimingConfig::default(), "hi");
        assert_eq!(flow.unwrap(), Flow::Completed(()));
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn quitting_at_the_instructions_finalises_with_no_scores() {
        let log = MemoryLog::new();
        let scores = MemoryScores::new();
        let mut screen = Screen {
            pending: vec![InputEvent::Quit],
            ..Screen::default()
        };
        let settings = RunSettings {
            timing: TimingConfig::without_holds(),
            ..RunSettings::new("P1", "EXP1_master_trials.csv")
        };
        let mut runner = TrialRunner::new(
            &mut screen,
            ManualTimer::new(),
            assets(),
            log.clone(),
            scores.clone(),
            settings,
        );
        let outcome = runner.run(&[spec(1), spec(2)]).unwrap();
        assert_eq!(outcome, RunOutcome::Aborted(vec![]));
        assert!(runner.cancel_token().is_cancelled());

        let state = log.state();
        assert_eq!((state.begin_calls, state.finish_calls), (1, 1));
        assert_eq!(state.final_outcome, Some("aborted"));
        assert!(scores.saved().is_empty());
        assert!(screen.messages[0].starts_with("Welcome, Participant P1."));
        assert_eq!(screen.messages.last().unwrap(), "Experiment stopped.");
    }

    #[test]
    fn a_stopped_runner_does_not_start_again() {
        let log = MemoryLog::new();
        let mut screen = Screen {
            pending: vec![InputEvent::Quit],
            ..Screen::default()
        };
        let settings = RunSettings {
            timing: TimingConfig::without_holds(),
            show_instructions: false,
            ..RunSettings::new("P1", "x.csv")
        };
        let mut runner = TrialRunner::new(
            &mut screen,
            ManualTimer::new(),
            assets(),
            log.clone(),
            MemoryScores::new(),
            settings,
        );
        assert_eq!(runner.run(&[spec(1)]).unwrap(), RunOutcome::Aborted(vec![]));
        assert_eq!(runner.run(&[spec(1)]).unwrap(), RunOutcome::Aborted(vec![]));
        assert!(log.state().records.is_empty());
    }

    #[test]
    fn malformed_specs_are_rejected_before_anything_is_written() {
        let log = MemoryLog::new();
        let mut screen = Screen::default();
        let mut runner = TrialRunner::new(
            &mut screen,
            ManualTimer::new(),
            assets(),
            log.clone(),
            MemoryScores::new(),
            RunSettings::new("P1", "x.csv"),
        );
        assert!(matches!(runner.run(&[]), Err(InputError::Empty)));
        assert!(matches!(
            runner.run(&[spec(2), spec(1)]),
            Err(InputError::NotIncreasing { .. })
        ));
        assert_eq!(log.state().begin_calls, 0);
        assert!(screen.messages.is_empty());
    }

    struct Exploding;

    impl RunRecorder for Exploding {
        fn begin(&mut self, _meta: &RunMetadata) -> Result<(), PersistenceError> {
            Ok(())
        }
        fn record(&mut self, _result: &TrialResult) -> Result<(), PersistenceError> {
            Ok(())
        }
        fn finish(&mut self, _report: &RunReport<'_>) -> Result<(), PersistenceError> {
            Err(PersistenceError::NotStarted)
        }
    }

    #[test]
    fn a_failed_finalisation_turns_the_outcome_into_a_failure() {
        let mut screen = Screen {
            pending: vec![InputEvent::Quit],
            ..Screen::default()
        };
        let settings = RunSettings {
            timing: TimingConfig::without_holds(),
            ..RunSettings::new("P1", "x.csv")
        };
        let mut runner = TrialRunner::new(
            &mut screen,
            ManualTimer::new(),
            assets(),
            Exploding,
            MemoryScores::new(),
            settings,
        );
        match runner.run(&[spec(1)]).unwrap() {
            RunOutcome::Failed { reason, results } => {
                assert_eq!(reason, PersistenceError::NotStarted.to_string());
                assert!(results.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
