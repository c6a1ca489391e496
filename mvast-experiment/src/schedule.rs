//! Reader for the master trial CSV produced by the setup tool.

use csv::{ReaderBuilder, StringRecord, Trim};
use mvast_core::{validate_sequence, InputError, TrialSpec};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

const REQUIRED: [&str; 5] = [
    "trial_number",
    "brightness_factor",
    "stimulus_duration",
    "fixation_duration",
    "checkerboard_hz",
];

/// Trials in the ramp-up block, and in each randomised block after it.
pub const TRIALS_PER_BLOCK: u32 = 6;

struct Columns {
    trial_number: usize,
    brightness_factor: usize,
    stimulus_duration: usize,
    fixation_duration: usize,
    checkerboard_hz: usize,
    block: Option<(usize, usize)>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, InputError> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let missing: Vec<String> = REQUIRED
            .iter()
            .filter(|&&c| find(c).is_none())
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(InputError::MissingColumns(missing));
        }
        let required = |name: &str| find(name).ok_or_else(|| InputError::MissingColumns(vec![name.into()]));
        Ok(Self {
            trial_number: required("trial_number")?,
            brightness_factor: required("brightness_factor")?,
            stimulus_duration: required("stimulus_duration")?,
            fixation_duration: required("fixation_duration")?,
            checkerboard_hz: required("checkerboard_hz")?,
            block: find("block_number").zip(find("trial_in_block")),
        })
    }
}

/// Block and position for a trial when the schedule leaves them out:
/// the first block is the ramp-up, then fixed-size randomised blocks.
pub fn derive_block(trial_number: u32) -> (u32, u32) {
    let idx = trial_number.saturating_sub(1);
    if idx < TRIALS_PER_BLOCK {
        (0, idx + 1)
    } else {
        let r = idx - TRIALS_PER_BLOCK;
        (r / TRIALS_PER_BLOCK + 1, r % TRIALS_PER_BLOCK + 1)
    }
}

fn field<T: FromStr>(record: &StringRecord, idx: usize, name: &str, row: usize) -> Result<T, InputError> {
    let raw = record.get(idx).unwrap_or("");
    raw.parse().map_err(|_| InputError::Row {
        row,
        message: format!("{name}: cannot parse {raw:?}"),
    })
}

/// Loads and validates a schedule. Row numbers in errors count the header as row 1.
pub fn load_schedule(path: &Path) -> Result<Vec<TrialSpec>, InputError> {
    let unreadable = |e: csv::Error| InputError::Unreadable {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .map_err(unreadable)?;
    let columns = Columns::locate(reader.headers().map_err(unreadable)?)?;

    let mut specs = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let row = i + 2;
        let record = record.map_err(|e| InputError::Row {
            row,
            message: e.to_string(),
        })?;
        let trial_number: u32 = field(&record, columns.trial_number, "trial_number", row)?;
        let (block_number, trial_in_block) = match columns.block {
            Some((b, t)) => (
                field(&record, b, "block_number", row)?,
                field(&record, t, "trial_in_block", row)?,
            ),
            None => derive_block(trial_number),
        };
        let spec = TrialSpec {
            trial_number,
            block_number,
            trial_in_block,
            brightness_factor: field(&record, columns.brightness_factor, "brightness_factor", row)?,
            stimulus_duration_s: field(&record, columns.stimulus_duration, "stimulus_duration", row)?,
            fixation_duration_s: field(&record, columns.fixation_duration, "fixation_duration", row)?,
            checkerboard_hz: field(&record, columns.checkerboard_hz, "checkerboard_hz", row)?,
        };
        spec.validate().map_err(|e| InputError::Row {
            row,
            message: e.to_string(),
        })?;
        specs.push(spec);
    }

    validate_sequence(&specs)?;
    info!("loaded {} trials from {}", specs.len(), path.display());
    Ok(specs)
}
