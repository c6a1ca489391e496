use crate::error::PersistenceError;
use crate::persist::{RunMetadata, RunRecorder, RunReport, ScoreSink, ScoreSummary};
use chrono::{DateTime, Local};
use csv::{Terminator, Writer, WriterBuilder};
use mvast_core::TrialResult;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const FILE_STAMP: &str = "%Y%m%d_%H%M%S";
const SECONDS: &str = "%Y-%m-%d %H:%M:%S";
const MILLIS: &str = "%Y-%m-%d %H:%M:%S%.3f";

const COLUMNS: [&str; 10] = [
    "Trial_Number_Overall",
    "Block_Number",
    "Trial_In_Block",
    "Brightness_Factor",
    "Stimulus_Duration_s",
    "Fixation_Duration_s",
    "Checkerboard_Hz",
    "Discomfort_Rating_0_100",
    "Brightness_Rating_0_100",
    "Response_Timestamp",
];

fn create_writer(dir: &Path, file_name: String) -> Result<(PathBuf, Writer<File>), PersistenceError> {
    std::fs::create_dir_all(dir).map_err(|source| PersistenceError::Create {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(file_name);
    let file = File::create(&path).map_err(|source| PersistenceError::Create {
        path: path.clone(),
        source,
    })?;
    let writer = WriterBuilder::new()
        .flexible(true)
        .terminator(Terminator::CRLF)
        .from_writer(file);
    Ok((path, writer))
}

fn blank_row(writer: &mut Writer<File>) -> Result<(), PersistenceError> {
    writer.flush()?;
    let mut file: &File = writer.get_ref();
    file.write_all(b"\r\n")?;
    Ok(())
}

/// Renders a duration or frequency as a float literal: `10.0`, `7.5`.
fn number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

/// Per-participant data log, `data_P{id}_{YYYYmmdd_HHMMSS}.csv`.
pub struct CsvDataLog {
    dir: PathBuf,
    path: Option<PathBuf>,
    writer: Option<Writer<File>>,
}

impl CsvDataLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            path: None,
            writer: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn writer(&mut self) -> Result<&mut Writer<File>, PersistenceError> {
        self.writer.as_mut().ok_or(PersistenceError::NotStarted)
    }
}

impl RunRecorder for CsvDataLog {
    fn begin(&mut self, meta: &RunMetadata) -> Result<(), PersistenceError> {
        let name = format!(
            "data_P{}_{}.csv",
            meta.participant_id,
            meta.started_at.format(FILE_STAMP)
        );
        let (path, mut w) = create_writer(&self.dir, name)?;
        let started = meta.started_at.format(SECONDS).to_string();
        for row in [
            ["App_Version", meta.app_version.as_str()],
            ["Experiment_ID", meta.experiment_id.as_str()],
            ["Participant_ID", meta.participant_id.as_str()],
            ["Timestamp_Start_Run", started.as_str()],
            ["Master_CSV_Used", meta.schedule_name.as_str()],
            ["Image1_File", meta.image_a_name.as_str()],
            ["Image2_File", meta.image_b_name.as_str()],
        ] {
            w.write_record(row)?;
        }
        blank_row(&mut w)?;
        w.write_record(COLUMNS)?;
        w.flush()?;

        info!("logging data to {}", path.display());
        self.path = Some(path);
        self.writer = Some(w);
        Ok(())
    }

    fn record(&mut self, r: &TrialResult) -> Result<(), PersistenceError> {
        let spec = &r.spec;
        let w = self.writer()?;
        w.write_record([
            spec.trial_number.to_string(),
            spec.block_number.to_string(),
            spec.trial_in_block.to_string(),
            format!("{:.2}", spec.brightness_factor),
            number(spec.stimulus_duration_s),
            number(spec.fixation_duration_s),
            number(spec.checkerboard_hz),
            r.discomfort_rating.to_string(),
            r.brightness_rating.to_string(),
            r.response_timestamp.format(MILLIS).to_string(),
        ])?;
        w.flush()?;
        Ok(())
    }

    fn finish(&mut self, report: &RunReport<'_>) -> Result<(), PersistenceError> {
        let Some(mut w) = self.writer.take() else {
            warn!("data log finished without being started");
            return Ok(());
        };
        let ended = report.ended_at.format(SECONDS).to_string();
        w.write_record(["Timestamp_End_Run", ended.as_str()])?;
        w.flush()?;
        info!(
            "data log closed after {} trials ({})",
            report.results.len(),
            report.outcome
        );
        Ok(())
    }
}

/// Average-score file, `summary_P{id}_avg_scores_{YYYYmmdd_HHMMSS}.csv`.
pub struct CsvScoreSummary {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl CsvScoreSummary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ScoreSink for CsvScoreSummary {
    fn save(&mut self, s: &ScoreSummary) -> Result<(), PersistenceError> {
        let stamp: DateTime<Local> = s.created_at;
        let name = format!(
            "summary_P{}_avg_scores_{}.csv",
            s.participant_id,
            stamp.format(FILE_STAMP)
        );
        let (path, mut w) = create_writer(&self.dir, name)?;
        let (d, b) = (
            format!("{:.2}", s.average_discomfort),
            format!("{:.2}", s.average_brightness),
        );
        let written_at = stamp.format(SECONDS).to_string();
        let count = s.rated_trials.to_string();
        w.write_record(["Participant_ID", s.participant_id.as_str()])?;
        w.write_record(["Timestamp_Summary", written_at.as_str()])?;
        w.write_record(["Number_Of_Rated_Trials", count.as_str()])?;
        blank_row(&mut w)?;
        w.write_record(["Metric", "Average_Score_0_100"])?;
        w.write_record(["Average_Discomfort", d.as_str()])?;
        w.write_record(["Average_Brightness", b.as_str()])?;
        w.flush()?;

        info!("average scores saved to {}", path.display());
        self.written.push(path);
        Ok(())
    }
}
