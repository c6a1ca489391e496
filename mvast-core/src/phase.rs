/// Phases a single trial moves through, in order.
///
/// `Committed` and `Cancelled` are terminal; every other phase can fall
/// through to `Cancelled` when the operator quits.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum TrialPhase {
    #[default]
    Fixation,
    Stimulus,
    RatingDiscomfort,
    RatingBrightness,
    Committed,
    Cancelled,
}
