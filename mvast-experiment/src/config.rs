use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

const FORBIDDEN_ID_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Polling and hold intervals used throughout a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub poll_tick_ms: u64,
    pub rating_refresh_ms: u64,
    pub input_wait_ms: u64,
    pub complete_hold_ms: u64,
    pub stopped_hold_ms: u64,
    pub error_hold_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_tick_ms: 10,
            rating_refresh_ms: 16,
            input_wait_ms: 10,
            complete_hold_ms: 4000,
            stopped_hold_ms: 2000,
            error_hold_ms: 5000,
        }
    }
}

impl TimingConfig {
    /// Same ticks, no closing-message holds.
    pub fn without_holds() -> Self {
        Self {
            complete_hold_ms: 0,
            stopped_hold_ms: 0,
            error_hold_ms: 0,
            ..Self::default()
        }
    }

    pub fn poll_tick(&self) -> Duration {
        Duration::from_millis(self.poll_tick_ms.clamp(1, 10))
    }

    /// Redraw interval of a rating screen. Capped at the poll tick so the
    /// cancel token is checked as often there as in the timed phases.
    pub fn rating_refresh(&self) -> Duration {
        Duration::from_millis(self.rating_refresh_ms.max(1)).min(self.poll_tick())
    }

    pub fn input_wait(&self) -> Duration {
        Duration::from_millis(self.input_wait_ms.max(1)).min(self.poll_tick())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub participant_id: String,
    pub schedule: PathBuf,
    pub image_a: PathBuf,
    pub image_b: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub font: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub show_instructions: bool,
    #[serde(default)]
    pub timing: TimingConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_true() -> bool {
    true
}

impl RunConfig {
    pub fn new(
        participant_id: impl Into<String>,
        schedule: impl Into<PathBuf>,
        image_a: impl Into<PathBuf>,
        image_b: impl Into<PathBuf>,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            schedule: schedule.into(),
            image_a: image_a.into(),
            image_b: image_b.into(),
            output_dir: default_output_dir(),
            font: None,
            show_instructions: true,
            timing: TimingConfig::default(),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let id = self.participant_id.trim();
        if id.is_empty() || id.contains(FORBIDDEN_ID_CHARS) {
            return Err(ConfigError::Participant(self.participant_id.clone()));
        }
        for (name, path) in [
            ("schedule", &self.schedule),
            ("image_a", &self.image_a),
            ("image_b", &self.image_b),
            ("output_dir", &self.output_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }
        if self.image_a == self.image_b {
            warn!(
                "both stimulus boards use {}; the flicker will be invisible",
                self.image_a.display()
            );
        }
        Ok(())
    }

    pub fn participant(&self) -> &str {
        self.participant_id.trim()
    }

    /// Schedule file name without its directory.
    pub fn schedule_name(&self) -> String {
        self.schedule
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.schedule.display().to_string())
    }
}
