pub mod cancel;
pub mod manual;
pub mod scheduler;
pub mod stats;
pub mod timer;
pub mod wait;

pub use cancel::CancelToken;
pub use manual::ManualTimer;
pub use scheduler::{FlickerPlan, FlipSink, FrameScheduler, ScheduleReport};
pub use stats::{FlipStats, LatenessSummary};
pub use timer::{HighPrecisionTimer, Timer};
pub use wait::{wait_for, wait_until};
