use chrono::{DateTime, Duration, Local, Timelike};
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;

use crate::adaptive::AdaptiveCalculator;
use crate::clock::SharedClock;
use crate::config::EngineConfig;
use crate::error::AutomatorError;
use crate::models::OperatingMode;
use crate::schedule::ScheduleModel;
use crate::timer::SegmentTimer;
use crate::utils::time::round_down_to_quarter_hour;

use super::heuristics::{gap_after, jittered, song_preceding_segment};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AutomatorPhase {
    NotStarted,
    /// Waiting for the first segment's start time.
    Armed,
    Running,
    Done,
}

/// Runs a whole program without an operator.
///
/// Tracks one pending start or stop time at a time and is advanced by [`tick`]
/// (every few seconds in production).
///
/// [`tick`]: ProgramAutomator::tick
pub struct ProgramAutomator {
    clock: SharedClock,
    model: ScheduleModel,
    calculator: AdaptiveCalculator,
    timer: SegmentTimer,
    rng: StdRng,
    jitter_fraction: f64,
    first_start_delay: Duration,
    phase: AutomatorPhase,
    current: Option<u32>,
    next_start: Option<DateTime<Local>>,
    next_stop: Option<DateTime<Local>>,
    song_preceding: Option<u32>,
}

impl ProgramAutomator {
    pub fn new(clock: SharedClock, model: ScheduleModel, config: &EngineConfig) -> Self {
        Self::with_rng(clock, model, config, StdRng::from_entropy())
    }

    pub fn with_rng(
        clock: SharedClock,
        model: ScheduleModel,
        config: &EngineConfig,
        rng: StdRng,
    ) -> Self {
        let automatic = EngineConfig {
            operating_mode: OperatingMode::Automatic,
            ..config.clone()
        }
        .sanitized();
        let song_preceding = song_preceding_segment(&model);

        Self {
            calculator: AdaptiveCalculator::new(clock.clone(), &automatic),
            timer: SegmentTimer::new(clock.clone()),
            clock,
            model,
            rng,
            jitter_fraction: automatic.jitter_fraction,
            first_start_delay: Duration::seconds(automatic.first_start_delay_secs as i64),
            phase: AutomatorPhase::NotStarted,
            current: None,
            next_start: None,
            next_stop: None,
            song_preceding,
        }
    }

    pub fn phase(&self) -> AutomatorPhase {
        self.phase
    }

    pub fn current_segment(&self) -> Option<u32> {
        self.current
    }

    pub fn next_start_time(&self) -> Option<DateTime<Local>> {
        self.next_start
    }

    pub fn next_stop_time(&self) -> Option<DateTime<Local>> {
        self.next_stop
    }

    pub fn model(&self) -> &ScheduleModel {
        &self.model
    }

    pub fn into_model(self) -> ScheduleModel {
        self.model
    }

    pub fn calculator(&self) -> &AdaptiveCalculator {
        &self.calculator
    }

    pub fn calculator_mut(&mut self) -> &mut AdaptiveCalculator {
        &mut self.calculator
    }

    pub fn timer(&self) -> &SegmentTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut SegmentTimer {
        &mut self.timer
    }

    /// Advance the state machine to the current clock reading.
    ///
    /// An error means the timer and the schedule disagree; the run must not continue.
    pub fn tick(&mut self) -> Result<AutomatorPhase, AutomatorError> {
        let now = self.clock.now();

        match self.phase {
            AutomatorPhase::Done => return Ok(self.phase),
            AutomatorPhase::NotStarted => {
                if now.minute() % 15 == 0 {
                    self.arm(now);
                }
                return Ok(self.phase);
            }
            AutomatorPhase::Armed | AutomatorPhase::Running => {}
        }

        if let Some(start_at) = self.next_start {
            if now >= start_at {
                self.start_current(now)?;
            }
        } else if let Some(stop_at) = self.next_stop {
            if now >= stop_at {
                self.stop_current(now)?;
            }
        }

        Ok(self.phase)
    }

    fn arm(&mut self, now: DateTime<Local>) {
        let Some(first) = self.model.first_configured() else {
            log_warn!("program {} has no configured segments", self.model.instance_id());
            self.phase = AutomatorPhase::Done;
            return;
        };

        let delay = jittered(self.first_start_delay, self.jitter_fraction, &mut self.rng);
        let start_at = round_down_to_quarter_hour(&now) + delay;

        self.phase = AutomatorPhase::Armed;
        self.current = Some(first);
        self.next_start = Some(start_at);
        log_info!(
            "program {} armed; segment {} starts at {}",
            self.model.instance_id(),
            first,
            start_at.format("%H:%M:%S")
        );
    }

    fn start_current(&mut self, now: DateTime<Local>) -> Result<(), AutomatorError> {
        let id = self.current.ok_or(AutomatorError::NoCurrentSegment)?;

        if self.timer.is_running() {
            log_error!("segment {} due to start but the timer is already running", id);
            return Err(AutomatorError::TimerAlreadyRunning { segment_id: id });
        }

        let adapted = self.calculator.calculate_adapted_duration(&self.model, id);
        self.model
            .set_adapted_duration(id, adapted)
            .map_err(|_| AutomatorError::MissingSegment(id))?;
        let target = self
            .model
            .item(id)
            .ok_or(AutomatorError::MissingSegment(id))?
            .target_duration();

        self.timer.start(target);
        self.next_start = None;
        self.next_stop = Some(now + target);
        self.phase = AutomatorPhase::Running;

        if let Some(overrun) = self.calculator.calculate_meeting_overrun(&self.model, id) {
            log_warn!("meeting projected to end {}s off plan", overrun.num_seconds());
        }
        log_info!(
            "segment {} started, target {}s{}",
            id,
            target.num_seconds(),
            if adapted.is_some() { " (adapted)" } else { "" }
        );
        Ok(())
    }

    fn stop_current(&mut self, now: DateTime<Local>) -> Result<(), AutomatorError> {
        let id = self.current.ok_or(AutomatorError::NoCurrentSegment)?;

        if !self.timer.is_running() {
            log_error!("segment {} due to stop but the timer is not running", id);
            return Err(AutomatorError::TimerNotRunning { segment_id: id });
        }

        let elapsed = self.timer.stop();
        self.model
            .set_completed_time(id, elapsed)
            .map_err(|_| AutomatorError::MissingSegment(id))?;
        self.next_stop = None;
        log_info!("segment {} stopped after {}s", id, elapsed.num_seconds());

        let segment = self
            .model
            .item(id)
            .ok_or(AutomatorError::MissingSegment(id))?;
        let base_gap = gap_after(segment, self.song_preceding).base_secs();

        match (base_gap, self.model.next(Some(id))) {
            (Some(base_secs), Some(next_id)) => {
                let gap = jittered(
                    Duration::seconds(base_secs as i64),
                    self.jitter_fraction,
                    &mut self.rng,
                );
                self.current = Some(next_id);
                self.next_start = Some(now + gap);
                log_info!("segment {} starts in {}s", next_id, gap.num_seconds());
            }
            _ => {
                self.current = None;
                self.phase = AutomatorPhase::Done;
                log_info!("program {} complete", self.model.instance_id());
            }
        }
        Ok(())
    }
}
