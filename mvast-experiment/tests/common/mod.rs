#![allow(dead_code)]

use chrono::{Local, TimeZone};
use mvast_core::{
    Board, Display, FrameBuffer, InputEvent, PresentationError, PresentationFrame, RatingView,
    TrialSpec,
};
use mvast_experiment::{RunSettings, TimingConfig};
use mvast_render::StimulusAssets;
use mvast_timing::ManualTimer;
use std::collections::VecDeque;

/// What the headless display was asked to draw.
#[derive(Debug, Clone, PartialEq)]
pub enum Shown {
    Fixation,
    Frame(Board, f64),
    Rating,
    Message(String),
}

/// Headless display that plays a participant from a script.
///
/// Keys are pressed on every message screen that expects one, each rating
/// screen is answered by dragging to the next scripted value and pressing
/// confirm, and a quit can be injected at the n-th stimulus frame or the
/// n-th trial's fixation.
#[derive(Default)]
pub struct ScriptedDisplay {
    pub answers: VecDeque<i32>,
    pub shown: Vec<Shown>,
    pub quit_at_fixation: Option<usize>,
    pub quit_at_frame: Option<usize>,
    pub fail_at_frame: Option<usize>,
    pub quit_on_instructions: bool,
    pub(crate) pending: Vec<InputEvent>,
    pub(crate) fixations: usize,
    pub(crate) frames: usize,
}

impl ScriptedDisplay {
    pub fn answering(answers: &[i32]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn fixations(&self) -> usize {
        self.fixations
    }

    pub fn messages(&self) -> Vec<&str> {
        self.shown
            .iter()
            .filter_map(|s| match s {
                Shown::Message(m) => Some(m.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Display for ScriptedDisplay {
    fn size(&self) -> (u32, u32) {
        (1920, 1080)
    }

    fn show_fixation(&mut self) -> Result<(), PresentationError> {
        self.fixations += 1;
        self.shown.push(Shown::Fixation);
        if self.quit_at_fixation == Some(self.fixations) {
            self.pending.push(InputEvent::Quit);
        }
        Ok(())
    }

    fn show_frame(&mut self, frame: &PresentationFrame) -> Result<(), PresentationError> {
        self.frames += 1;
        if self.fail_at_frame == Some(self.frames) {
            return Err(PresentationError::Surface("device lost".into()));
        }
        self.shown.push(Shown::Frame(frame.board, frame.brightness));
        if self.quit_at_frame == Some(self.frames) {
            self.pending.push(InputEvent::Quit);
        }
        Ok(())
    }

    fn show_rating(&mut self, view: &RatingView<'_>) -> Result<(), PresentationError> {
        if self.shown.last() != Some(&Shown::Rating) {
            self.shown.push(Shown::Rating);
        }
        if !self.pending.is_empty() {
            return Ok(());
        }
        let Some(value) = self.answers.pop_front() else {
            self.pending.push(InputEvent::Quit);
            return Ok(());
        };
        let x = view.layout.slider_x(value, view.min, view.max);
        let y = view.layout.bar.center().1;
        let (cx, cy) = view.layout.confirm.center();
        self.pending.extend([
            InputEvent::PointerMoved { x, y },
            InputEvent::PointerPressed { x, y },
            InputEvent::PointerReleased { x, y },
            InputEvent::PointerMoved { x: cx, y: cy },
            InputEvent::PointerPressed { x: cx, y: cy },
        ]);
        Ok(())
    }

    fn show_message(&mut self, text: &str) -> Result<(), PresentationError> {
        self.shown.push(Shown::Message(text.to_string()));
        if text.ends_with("Press any key to begin...") {
            self.pending.push(if self.quit_on_instructions {
                InputEvent::Quit
            } else {
                InputEvent::KeyPressed
            });
        }
        Ok(())
    }

    fn set_pointer_visible(&mut self, _visible: bool) {}

    fn poll_input(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.pending)
    }
}

pub fn timer() -> ManualTimer {
    ManualTimer::starting_at(Local.with_ymd_and_hms(2025, 6, 18, 9, 30, 0).unwrap())
}

pub fn assets() -> StimulusAssets {
    StimulusAssets::from_frames(
        "checker_a.png",
        FrameBuffer::solid(8, 8, [240, 240, 240, 255]),
        "checker_b.png",
        FrameBuffer::solid(8, 8, [16, 16, 16, 255]),
    )
    .unwrap()
}

pub fn settings() -> RunSettings {
    RunSettings {
        timing: TimingConfig::without_holds(),
        ..RunSettings::new("P07", "EXP1_master_trials.csv")
    }
}

pub fn spec(n: u32, factor: f64) -> TrialSpec {
    TrialSpec {
        trial_number: n,
        block_number: 0,
        trial_in_block: n,
        brightness_factor: factor,
        stimulus_duration_s: 2.0,
        fixation_duration_s: 1.0,
        checkerboard_hz: 5.0,
    }
}

pub fn ramp() -> Vec<TrialSpec> {
    vec![spec(1, 0.1), spec(2, 0.5), spec(3, 1.0)]
}
