pub mod adaptive;
pub mod automation;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod schedule;
pub mod timer;
pub mod utils;

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, Local};

pub use adaptive::AdaptiveCalculator;
pub use automation::{AutomatorController, AutomatorPhase, ProgramAutomator};
pub use clock::{ClockSource, ManualClock, SharedClock, SystemClock};
pub use config::EngineConfig;
pub use error::{AutomatorError, ScheduleError};
pub use models::{AdaptiveMode, OperatingMode, ProgramType, Segment, SegmentDefinition, SegmentKind};
pub use schedule::ScheduleModel;
pub use timer::{SegmentTimer, TimerController, TimerEvent, TimerStatus};
pub use utils::init_logging;

/// A program that has not finished after this long is stuck.
const SIMULATION_LIMIT_HOURS: i64 = 4;

/// Run one fully automatic program against a simulated clock and log the outcome.
///
/// `MEETING_PACER_PROGRAM=weekend` selects the weekend program; `RUST_LOG` controls
/// verbosity.
pub fn run() -> Result<()> {
    init_logging();

    let program_type = match std::env::var("MEETING_PACER_PROGRAM") {
        Ok(value) if value.eq_ignore_ascii_case("weekend") => ProgramType::Weekend,
        _ => ProgramType::Midweek,
    };
    let config = EngineConfig::automatic(program_type).with_env_overrides();

    let start = Local::now()
        .date_naive()
        .and_hms_opt(18, 59, 0)
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .context("simulation start time does not exist in the local timezone")?;
    let clock = ManualClock::new(start);

    log::info!(
        "meeting-pacer simulating the {} program from {}",
        program_type.as_str(),
        start.format("%H:%M")
    );

    let mut automator =
        ProgramAutomator::new(clock.shared(), ScheduleModel::for_program(program_type), &config);

    // One simulated step per automator decision period.
    let step = Duration::milliseconds(config.automator_tick_ms as i64);
    let deadline = start + Duration::hours(SIMULATION_LIMIT_HOURS);
    while automator.tick()? != AutomatorPhase::Done {
        if clock.now() > deadline {
            return Err(anyhow!("simulated program did not finish by {}", deadline));
        }
        clock.advance(step);
        automator.timer_mut().tick();
    }

    let meeting_start = automator.calculator().meeting_start_time();
    let model = automator.into_model();
    for segment in model.items().iter().filter(|segment| segment.is_configured()) {
        log::info!(
            "{:<28} planned {:>5}s  target {:>5}s  used {:>5}s",
            segment.name,
            segment.planned_duration_secs(),
            segment.target_duration().num_seconds(),
            segment
                .completed_time()
                .map(|used| used.num_seconds())
                .unwrap_or_default()
        );
    }

    if let (Some(meeting_start), Some(end_offset)) = (meeting_start, model.planned_end_offset()) {
        let overrun = clock.now() - (meeting_start + end_offset);
        log::info!(
            "program finished at {} ({}s against the planned end)",
            clock.now().format("%H:%M:%S"),
            overrun.num_seconds()
        );
    }

    Ok(())
}
