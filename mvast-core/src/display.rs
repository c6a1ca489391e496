use crate::error::PresentationError;
use crate::frame::PresentationFrame;
use crate::input::InputEvent;
use crate::rating::RatingView;

/// Full-screen presentation surface plus the input source attached to it.
///
/// Every `show_*` call replaces the whole screen. `poll_input` never blocks.
pub trait Display {
    fn size(&self) -> (u32, u32);
    fn show_fixation(&mut self) -> Result<(), PresentationError>;
    fn show_frame(&mut self, frame: &PresentationFrame) -> Result<(), PresentationError>;
    fn show_rating(&mut self, view: &RatingView<'_>) -> Result<(), PresentationError>;
    fn show_message(&mut self, text: &str) -> Result<(), PresentationError>;
    fn set_pointer_visible(&mut self, visible: bool);
    fn poll_input(&mut self) -> Vec<InputEvent>;
}

impl<D: Display + ?Sized> Display for &mut D {
    fn size(&self) -> (u32, u32) {
        (**self).size()
    }
    fn show_fixation(&mut self) -> Result<(), PresentationError> {
        (**self).show_fixation()
    }
    fn show_frame(&mut self, frame: &PresentationFrame) -> Result<(), PresentationError> {
        (**self).show_frame(frame)
    }
    fn show_rating(&mut self, view: &RatingView<'_>) -> Result<(), PresentationError> {
        (**self).show_rating(view)
    }
    fn show_message(&mut self, text: &str) -> Result<(), PresentationError> {
        (**self).show_message(text)
    }
    fn set_pointer_visible(&mut self, visible: bool) {
        (**self).set_pointer_visible(visible)
    }
    fn poll_input(&mut self) -> Vec<InputEvent> {
        (**self).poll_input()
    }
}
