use mvast_core::{AssetError, InputError, PresentationError};
use std::path::PathBuf;
use thiserror::Error;

/// Failure writing the data log or score summary.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("cannot create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("data log was not started")]
    NotStarted,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("participant id {0:?} is empty or contains one of / \\ : * ? \" < > |")]
    Participant(String),
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// Everything that can end a run early.
#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("run cancelled by the operator")]
    UserCancelled,
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Presentation(#[from] PresentationError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
