use anyhow::{bail, Context, Result};
use mvast_core::{Display, RunOutcome};
use mvast_experiment::{
    load_schedule, CsvDataLog, CsvScoreSummary, RunConfig, RunSettings, TrialRunner,
};
use mvast_render::{load_font, StimulusAssets};
use mvast_timing::{HighPrecisionTimer, Timer};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod display;

use display::WinitDisplay;

/// Raises the Windows scheduler resolution to 1 ms for the life of the run.
#[cfg(windows)]
struct TimerResolution;

#[cfg(windows)]
impl TimerResolution {
    fn raise() -> Self {
        unsafe {
            let _ = windows::Win32::Media::timeBeginPeriod(1);
        }
        Self
    }
}

#[cfg(windows)]
impl Drop for TimerResolution {
    fn drop(&mut self) {
        unsafe {
            let _ = windows::Win32::Media::timeEndPeriod(1);
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Shows a fatal start-up error on the participant screen before exiting.
fn show_fatal(display: &mut WinitDisplay, config: &RunConfig, message: &str) {
    if let Err(e) = display.show_message(&format!("Error:\n{message}\nStopped.")) {
        warn!("cannot show error message: {e}");
        return;
    }
    HighPrecisionTimer::new().sleep(Duration::from_millis(config.timing.error_hold_ms));
}

fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        cli::usage();
    }
    let config = match cli::parse_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}\n");
            cli::usage();
        }
    };
    config.validate()?;

    info!("mvast {}", mvast_experiment::APP_VERSION);
    info!(
        "platform: {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );

    let specs = load_schedule(&config.schedule)
        .with_context(|| format!("loading schedule {}", config.schedule.display()))?;

    #[cfg(windows)]
    let _resolution = TimerResolution::raise();

    let font = load_font(config.font.as_deref());
    let mut display = WinitDisplay::open(font)?;

    let assets = match StimulusAssets::load(&config.image_a, &config.image_b, display.size()) {
        Ok(assets) => assets,
        Err(e) => {
            error!("{e}");
            show_fatal(&mut display, &config, &e.to_string());
            return Err(e).context("loading stimulus images");
        }
    };

    let mut runner = TrialRunner::new(
        &mut display,
        HighPrecisionTimer::new(),
        assets,
        CsvDataLog::new(&config.output_dir),
        CsvScoreSummary::new(&config.output_dir),
        RunSettings::from_config(&config),
    );
    let outcome = runner.run(&specs)?;
    if let Some(path) = runner.recorder().path() {
        info!("data written to {}", path.display());
    }

    match outcome {
        RunOutcome::Completed(results) => {
            info!("experiment complete: {} trials", results.len());
        }
        RunOutcome::Aborted(results) => {
            info!("experiment stopped after {} trials", results.len());
        }
        RunOutcome::Failed { reason, results } => {
            bail!("experiment failed after {} trials: {reason}", results.len());
        }
    }
    Ok(())
}
