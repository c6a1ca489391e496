use crate::error::InputError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One row of the externally supplied trial schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSpec {
    pub trial_number: u32,
    pub block_number: u32,
    pub trial_in_block: u32,
    pub brightness_factor: f64,
    pub stimulus_duration_s: f64,
    pub fixation_duration_s: f64,
    pub checkerboard_hz: f64,
}

impl TrialSpec {
    pub fn validate(&self) -> Result<(), InputError> {
        let trial = self.trial_number;
        if trial == 0 {
            return Err(InputError::TrialNumber(trial));
        }
        if self.trial_in_block == 0 {
            return Err(InputError::TrialInBlock { trial });
        }
        let checks: [(&'static str, f64, bool); 4] = [
            (
                "brightness_factor",
                self.brightness_factor,
                (0.0..=1.0).contains(&self.brightness_factor),
            ),
            (
                "stimulus_duration",
                self.stimulus_duration_s,
                representable(self.stimulus_duration_s),
            ),
            (
                "fixation_duration",
                self.fixation_duration_s,
                representable(self.fixation_duration_s),
            ),
            (
                "checkerboard_hz",
                self.checkerboard_hz,
                self.checkerboard_hz.is_finite() && self.checkerboard_hz >= 0.0,
            ),
        ];
        for (field, value, ok) in checks {
            if !ok {
                return Err(InputError::OutOfRange {
                    trial,
                    field,
                    value,
                });
            }
        }
        Ok(())
    }

    /// Exact for any spec that passed `validate`.
    pub fn stimulus_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.stimulus_duration_s).unwrap_or(Duration::ZERO)
    }

    /// Exact for any spec that passed `validate`.
    pub fn fixation_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.fixation_duration_s).unwrap_or(Duration::ZERO)
    }
}

/// Positive and small enough to fit both `Duration` and a u64 nanosecond count.
fn representable(secs: f64) -> bool {
    secs > 0.0
        && Duration::try_from_secs_f64(secs).is_ok_and(|d| d.as_nanos() <= u64::MAX as u128)
}

/// Checks every spec and the ordering of the whole sequence.
pub fn validate_sequence(specs: &[TrialSpec]) -> Result<(), InputError> {
    if specs.is_empty() {
        return Err(InputError::Empty);
    }
    let mut previous: Option<u32> = None;
    for spec in specs {
        spec.validate()?;
        if let Some(prev) = previous {
            if spec.trial_number <= prev {
                return Err(InputError::NotIncreasing {
                    previous: prev,
                    found: spec.trial_number,
                });
            }
        }
        previous = Some(spec.trial_number);
    }
    Ok(())
}

/// Recorded result per committed trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    #[serde(flatten)]
    pub spec: TrialSpec,
    pub discomfort_rating: i32,
    pub brightness_rating: i32,
    pub response_timestamp: DateTime<Local>,
}
