/// Operator input, already translated from the windowing system.
///
/// Window close and the Escape key both arrive as `Quit`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Quit,
    KeyPressed,
    PointerMoved { x: f32, y: f32 },
    PointerPressed { x: f32, y: f32 },
    PointerReleased { x: f32, y: f32 },
}

impl InputEvent {
    pub fn is_quit(&self) -> bool {
        matches!(self, InputEvent::Quit)
    }

    pub fn position(&self) -> Option<(f32, f32)> {
        match *self {
            InputEvent::PointerMoved { x, y }
            | InputEvent::PointerPressed { x, y }
            | InputEvent::PointerReleased { x, y } => Some((x, y)),
            _ => None,
        }
    }
}
