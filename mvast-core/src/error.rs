use std::path::PathBuf;
use thiserror::Error;

/// Malformed trial data. Always raised before a run starts.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("trial list is empty")]
    Empty,
    #[error("trial {trial}: {field} = {value} is out of range")]
    OutOfRange {
        trial: u32,
        field: &'static str,
        value: f64,
    },
    #[error("trial numbers must be positive (found {0})")]
    TrialNumber(u32),
    #[error("trial numbers must increase: {found} follows {previous}")]
    NotIncreasing { previous: u32, found: u32 },
    #[error("trial {trial}: trial_in_block must be 1-based")]
    TrialInBlock { trial: u32 },
    #[error("schedule is missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("schedule row {row}: {message}")]
    Row { row: usize, message: String },
    #[error("cannot read schedule {path}: {message}")]
    Unreadable { path: PathBuf, message: String },
}

/// Stimulus image missing or undecodable. Fatal before the first trial.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("stimulus image not found: {0}")]
    Missing(PathBuf),
    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("stimulus frames differ in size: {a:?} vs {b:?}")]
    SizeMismatch { a: (u32, u32), b: (u32, u32) },
    #[error("invalid target size {0}x{1}")]
    EmptyTarget(u32, u32),
}

/// Rendering or display failure while a run is in progress.
#[derive(Debug, Error)]
pub enum PresentationError {
    #[error("frame is {frame:?} but the surface is {surface:?}")]
    FrameSize { frame: (u32, u32), surface: (u32, u32) },
    #[error("render failed: {0}")]
    Render(String),
    #[error("display surface lost: {0}")]
    Surface(String),
}
