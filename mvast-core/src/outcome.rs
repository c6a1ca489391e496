use crate::trial::TrialResult;

/// How a run ended, with every result committed before it ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(Vec<TrialResult>),
    Aborted(Vec<TrialResult>),
    Failed {
        reason: String,
        results: Vec<TrialResult>,
    },
}

impl RunOutcome {
    pub fn results(&self) -> &[TrialResult] {
        match self {
            RunOutcome::Completed(r) | RunOutcome::Aborted(r) => r,
            RunOutcome::Failed { results, .. } => results,
        }
    }

    pub fn into_results(self) -> Vec<TrialResult> {
        match self {
            RunOutcome::Completed(r) | RunOutcome::Aborted(r) => r,
            RunOutcome::Failed { results, .. } => results,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, RunOutcome::Aborted(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Completed(_) => "completed",
            RunOutcome::Aborted(_) => "aborted",
            RunOutcome::Failed { .. } => "failed",
        }
    }
}
