use mvast_core::{Display, Flow, InputEvent, PresentationError, RatingView, ScaleKind, ScaleLayout};
use mvast_timing::{CancelToken, Timer};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_MIN: i32 = 0;
pub const DEFAULT_MAX: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingSignal {
    Confirmed(i32),
    Quit,
}

/// Drag-to-set slider state for one rating screen.
///
/// The value moves only while the button is held after a press inside the
/// interaction region. A press on the confirm button emits the current value
/// and never changes it.
#[derive(Debug, Clone)]
pub struct RatingInput {
    kind: ScaleKind,
    layout: ScaleLayout,
    min: i32,
    max: i32,
    value: i32,
    dragging: bool,
    pointer: (f32, f32),
}

impl RatingInput {
    pub fn new(kind: ScaleKind, layout: ScaleLayout) -> Self {
        Self::with_range(kind, layout, DEFAULT_MIN, DEFAULT_MAX)
    }

    pub fn with_range(kind: ScaleKind, layout: ScaleLayout, min: i32, max: i32) -> Self {
        let (min, max) = (min.min(max), max.max(min));
        Self {
            kind,
            layout,
            min,
            max,
            value: min,
            dragging: false,
            pointer: (-1.0, -1.0),
        }
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn handle(&mut self, event: &InputEvent) -> Option<RatingSignal> {
        match *event {
            InputEvent::Quit => return Some(RatingSignal::Quit),
            InputEvent::KeyPressed => {}
            InputEvent::PointerPressed { x, y } => {
                self.pointer = (x, y);
                if self.layout.confirm.contains(x, y) {
                    return Some(RatingSignal::Confirmed(self.value));
                }
                if self.layout.interaction_region().contains(x, y) {
                    self.dragging = true;
                    self.set_from_pointer(x);
                }
            }
            InputEvent::PointerReleased { x, y } => {
                self.pointer = (x, y);
                self.dragging = false;
            }
            InputEvent::PointerMoved { x, y } => {
                self.pointer = (x, y);
                if self.dragging {
                    self.set_from_pointer(x);
                }
            }
        }
        None
    }

    fn set_from_pointer(&mut self, x: f32) {
        self.value = self.layout.value_at(x, self.min, self.max);
    }

    pub fn view(&self) -> RatingView<'_> {
        RatingView {
            kind: self.kind,
            layout: &self.layout,
            min: self.min,
            max: self.max,
            value: self.value,
            pointer: self.pointer,
        }
    }
}

/// Shows a rating screen until the participant confirms or the run is cancelled.
///
/// Redraws every `refresh`; input is drained before each redraw, so a quit
/// request is acted on within one refresh interval.
pub fn capture_rating<D, T>(
    display: &mut D,
    timer: &T,
    cancel: &CancelToken,
    mut input: RatingInput,
    refresh: Duration,
) -> Result<Flow<i32>, PresentationError>
where
    D: Display + ?Sized,
    T: Timer,
{
    display.set_pointer_visible(true);
    let outcome = 'capture: loop {
        if cancel.is_cancelled() {
            break Ok(Flow::Cancelled);
        }
        for event in display.poll_input() {
            match input.handle(&event) {
                Some(RatingSignal::Confirmed(v)) => {
                    debug!("{} rating confirmed: {}", input.kind.label(), v);
                    break 'capture Ok(Flow::Completed(v));
                }
                Some(RatingSignal::Quit) => {
                    cancel.cancel();
                    break 'capture Ok(Flow::Cancelled);
                }
                None => {}
            }
        }
        if let Err(e) = display.show_rating(&input.view()) {
            break Err(e);
        }
        timer.sleep(refresh);
    };
    display.set_pointer_visible(false);
    outcome
}
