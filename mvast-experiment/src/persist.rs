//! Persistence collaborators: the per-run record stream and the score summary.

use crate::error::PersistenceError;
use crate::APP_VERSION;
use chrono::{DateTime, Local};
use mvast_core::TrialResult;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const MASTER_SUFFIX: &str = "_master_trials.csv";

/// Identifies a run in the data log header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    pub app_version: String,
    pub experiment_id: String,
    pub participant_id: String,
    pub schedule_name: String,
    pub image_a_name: String,
    pub image_b_name: String,
    pub started_at: DateTime<Local>,
}

impl RunMetadata {
    pub fn new(
        participant_id: &str,
        schedule_name: &str,
        image_a_name: &str,
        image_b_name: &str,
        started_at: DateTime<Local>,
    ) -> Self {
        Self {
            app_version: APP_VERSION.to_string(),
            experiment_id: experiment_id(schedule_name),
            participant_id: participant_id.to_string(),
            schedule_name: schedule_name.to_string(),
            image_a_name: image_a_name.to_string(),
            image_b_name: image_b_name.to_string(),
            started_at,
        }
    }
}

/// `EXP1_master_trials.csv` → `EXP1`; anything else is `UnknownExpID`.
pub fn experiment_id(schedule_name: &str) -> String {
    let name = Path::new(schedule_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.find(MASTER_SUFFIX) {
        Some(i) => name[..i].to_string(),
        None => "UnknownExpID".to_string(),
    }
}

/// What the record stream learns when a run ends.
#[derive(Debug, Clone, Copy)]
pub struct RunReport<'a> {
    pub outcome: &'static str,
    pub results: &'a [TrialResult],
    pub ended_at: DateTime<Local>,
}

/// Append-only record stream for one run.
///
/// `begin` is called once before the first trial, `record` once per
/// committed trial, and `finish` exactly once on every exit path.
pub trait RunRecorder {
    fn begin(&mut self, meta: &RunMetadata) -> Result<(), PersistenceError>;
    fn record(&mut self, result: &TrialResult) -> Result<(), PersistenceError>;
    fn finish(&mut self, report: &RunReport<'_>) -> Result<(), PersistenceError>;
}

/// Receives average ratings at the end of a run with at least one result.
pub trait ScoreSink {
    fn save(&mut self, summary: &ScoreSummary) -> Result<(), PersistenceError>;
}

impl<R: RunRecorder + ?Sized> RunRecorder for &mut R {
    fn begin(&mut self, meta: &RunMetadata) -> Result<(), PersistenceError> {
        (**self).begin(meta)
    }
    fn record(&mut self, result: &TrialResult) -> Result<(), PersistenceError> {
        (**self).record(result)
    }
    fn finish(&mut self, report: &RunReport<'_>) -> Result<(), PersistenceError> {
        (**self).finish(report)
    }
}

impl<S: ScoreSink + ?Sized> ScoreSink for &mut S {
    fn save(&mut self, summary: &ScoreSummary) -> Result<(), PersistenceError> {
        (**self).save(summary)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub participant_id: String,
    pub rated_trials: usize,
    pub average_discomfort: f64,
    pub average_brightness: f64,
    pub created_at: DateTime<Local>,
}

impl ScoreSummary {
    /// `None` when there is nothing to average.
    pub fn from_results(
        participant_id: &str,
        results: &[TrialResult],
        created_at: DateTime<Local>,
    ) -> Option<Self> {
        if results.is_empty() {
            return None;
        }
        let n = results.len() as f64;
        let sum = |f: fn(&TrialResult) -> i32| results.iter().map(|r| f(r) as f64).sum::<f64>();
        Some(Self {
            participant_id: participant_id.to_string(),
            rated_trials: results.len(),
            average_discomfort: sum(|r| r.discomfort_rating) / n,
            average_brightness: sum(|r| r.brightness_rating) / n,
            created_at,
        })
    }

    /// Averages rounded to two decimals, as reported.
    pub fn rounded(&self) -> (f64, f64) {
        let r2 = |v: f64| (v * 100.0).round() / 100.0;
        (r2(self.average_discomfort), r2(self.average_brightness))
    }
}

#[derive(Debug, Default)]
pub struct MemoryLogState {
    pub meta: Option<RunMetadata>,
    pub records: Vec<TrialResult>,
    pub begin_calls: usize,
    pub finish_calls: usize,
    pub final_outcome: Option<&'static str>,
    pub final_results: Vec<TrialResult>,
}

/// In-memory record stream. Clones share state, so a caller can keep a
/// handle while the runner owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    state: Arc<Mutex<MemoryLogState>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MemoryLogState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RunRecorder for MemoryLog {
    fn begin(&mut self, meta: &RunMetadata) -> Result<(), PersistenceError> {
        let mut s = self.state();
        s.meta = Some(meta.clone());
        s.begin_calls += 1;
        Ok(())
    }

    fn record(&mut self, result: &TrialResult) -> Result<(), PersistenceError> {
        self.state().records.push(result.clone());
        Ok(())
    }

    fn finish(&mut self, report: &RunReport<'_>) -> Result<(), PersistenceError> {
        let mut s = self.state();
        s.finish_calls += 1;
        s.final_outcome = Some(report.outcome);
        s.final_results = report.results.to_vec();
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryScores {
    saved: Arc<Mutex<Vec<ScoreSummary>>>,
}

impl MemoryScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<ScoreSummary> {
        self.saved.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ScoreSink for MemoryScores {
    fn save(&mut self, summary: &ScoreSummary) -> Result<(), PersistenceError> {
        self.saved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(summary.clone());
        Ok(())
    }
}
