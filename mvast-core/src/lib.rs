pub mod display;
pub mod error;
pub mod flow;
pub mod frame;
pub mod input;
pub mod outcome;
pub mod phase;
pub mod rating;
pub mod trial;

pub use display::Display;
pub use error::{AssetError, InputError, PresentationError};
pub use flow::Flow;
pub use frame::{Board, FrameBuffer, PresentationFrame};
pub use input::InputEvent;
pub use outcome::RunOutcome;
pub use phase::TrialPhase;
pub use rating::{Region, RatingView, ScaleKind, ScaleLayout};
pub use trial::{validate_sequence, TrialResult, TrialSpec};
