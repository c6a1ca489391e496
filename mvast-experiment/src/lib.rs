pub mod config;
pub mod controller;
pub mod csv_log;
pub mod error;
pub mod persist;
pub mod rating;
pub mod runner;
pub mod schedule;

pub use config::{RunConfig, TimingConfig};
pub use controller::TrialPhaseController;
pub use csv_log::{CsvDataLog, CsvScoreSummary};
pub use error::{ConfigError, ExperimentError, PersistenceError};
pub use persist::{
    MemoryLog, MemoryScores, RunMetadata, RunRecorder, RunReport, ScoreSink, ScoreSummary,
};
pub use rating::{capture_rating, RatingInput, RatingSignal};
pub use runner::{RunSettings, TrialRunner};
pub use schedule::{derive_block, load_schedule};

/// Written to the first row of every data log.
pub const APP_VERSION: &str = "v1.0_2025_06_18";

/// Text of the screen shown before the first trial.
pub fn instructions(participant_id: &str) -> String {
    format!(
        "Welcome, Participant {participant_id}.\n\n\
         In this experiment you will be shown a series of visual stimuli.\n\n\
         Please keep your eyes focused on the center of the screen.\n\n\
         You will be asked to rate the unpleasantness and the brightness of each stimulus.\n\n\
         After the stimulus, use the mouse to adjust the slider bar to give your ratings\n\
         and then click CONFIRM.\n\n\n\
         Press the ESC key at any time to stop the experiment.\n\n\n\
         Press any key to begin..."
    )
}
