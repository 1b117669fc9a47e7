use chrono::{DateTime, Duration, Local};

use crate::clock::SharedClock;
use crate::config::EngineConfig;
use crate::models::{AdaptiveMode, OperatingMode, Segment};
use crate::schedule::ScheduleModel;
use crate::utils::time::{duration_from_secs_f64, duration_secs_f64, round_down_to_quarter_hour};

use super::meeting_start::MeetingStartTime;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Deviations at or below this are noise.
const ADAPT_MIN_DEVIATION_SECS: i64 = 15;
/// Deviations above this point at a bad start time rather than real drift.
const ADAPT_MAX_DEVIATION_SECS: i64 = 15 * 60;

const OVERRUN_MIN_DEVIATION_SECS: i64 = 2 * 60;
const OVERRUN_MAX_DEVIATION_SECS: i64 = 20 * 60;

/// Time reserved for an interval song the program does not model as a gap.
const INTERVAL_SONG_ALLOWANCE_SECS: i64 = 5 * 60;

/// Remaining wall-clock time against remaining program time, measured at one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drift {
    pub total_time_remaining: Duration,
    pub remaining_required: Duration,
}

impl Drift {
    /// Positive when there is slack, negative when running late.
    pub fn deviation(&self) -> Duration {
        self.total_time_remaining - self.remaining_required
    }
}

/// Recomputes segment targets from live drift against the planned meeting end.
///
/// Apart from resolving the meeting start once, calculations only read the model and
/// the clock, so repeated calls with the same inputs agree.
pub struct AdaptiveCalculator {
    clock: SharedClock,
    adaptive_mode: AdaptiveMode,
    operating_mode: OperatingMode,
    meeting_start: MeetingStartTime,
}

impl AdaptiveCalculator {
    pub fn new(clock: SharedClock, config: &EngineConfig) -> Self {
        Self {
            clock,
            adaptive_mode: config.adaptive_mode,
            operating_mode: config.operating_mode,
            meeting_start: MeetingStartTime::new(),
        }
    }

    pub fn adaptive_mode(&self) -> AdaptiveMode {
        self.adaptive_mode
    }

    pub fn meeting_start_time(&self) -> Option<DateTime<Local>> {
        self.meeting_start.resolved()
    }

    /// Pin the meeting start, bypassing inference.
    pub fn set_meeting_start_time(&mut self, value: Option<DateTime<Local>>) {
        self.meeting_start.override_with(value);
    }

    /// Feed the estimate produced when the pre-program countdown completes.
    pub fn on_countdown_finished(&mut self, estimated_start: DateTime<Local>) {
        self.meeting_start.record_countdown_estimate(estimated_start);
    }

    /// Target duration for `segment_id` that absorbs its proportional share of the
    /// current drift, or `None` when no adaptation applies.
    pub fn calculate_adapted_duration(
        &mut self,
        model: &ScheduleModel,
        segment_id: u32,
    ) -> Option<Duration> {
        let segment = model.item(segment_id)?;
        let meeting_start = self.ensure_meeting_start_time(segment)?;

        if self.adaptive_mode == AdaptiveMode::None || !segment.allow_adaptive {
            return None;
        }

        let drift = self.measure_drift(model, segment_id, meeting_start, false)?;
        let deviation = drift.deviation();
        let magnitude = deviation.abs();

        if magnitude <= Duration::seconds(ADAPT_MIN_DEVIATION_SECS)
            || magnitude > Duration::seconds(ADAPT_MAX_DEVIATION_SECS)
        {
            log_debug!(
                "segment {}: deviation {}s outside adaptation range",
                segment_id,
                deviation.num_seconds()
            );
            return None;
        }

        if self.adaptive_mode == AdaptiveMode::OneWay
            && drift.total_time_remaining >= drift.remaining_required
        {
            return None;
        }

        let remaining_adaptive_total: Duration = model
            .remaining_from(segment_id)
            .iter()
            .filter(|item| item.allow_adaptive)
            .fold(Duration::zero(), |total, item| total + item.actual_duration());

        if remaining_adaptive_total <= Duration::zero() {
            return None;
        }

        let fraction = duration_secs_f64(segment.actual_duration())
            / duration_secs_f64(remaining_adaptive_total);
        let secs_to_apply = duration_secs_f64(deviation) * fraction;
        let adapted = (segment.actual_duration() + duration_from_secs_f64(secs_to_apply))
            .max(Duration::zero());

        log_debug!(
            "segment {}: deviation {}s, share {:.3}, target {}s -> {}s",
            segment_id,
            deviation.num_seconds(),
            fraction,
            segment.actual_duration().num_seconds(),
            adapted.num_seconds()
        );

        Some(adapted)
    }

    /// How far the program is projected to run past (positive) or short of (negative) its
    /// planned end, reported only inside the warning band.
    pub fn calculate_meeting_overrun(
        &mut self,
        model: &ScheduleModel,
        segment_id: u32,
    ) -> Option<Duration> {
        let segment = model.item(segment_id)?;
        let meeting_start = self.ensure_meeting_start_time(segment)?;

        let drift = self.measure_drift(model, segment_id, meeting_start, true)?;
        let deviation = drift.deviation();
        let magnitude = deviation.abs();

        if magnitude >= Duration::seconds(OVERRUN_MIN_DEVIATION_SECS)
            && magnitude <= Duration::seconds(OVERRUN_MAX_DEVIATION_SECS)
        {
            Some(-deviation)
        } else {
            None
        }
    }

    fn ensure_meeting_start_time(&mut self, segment: &Segment) -> Option<DateTime<Local>> {
        let is_anchor = segment.kind.map(|kind| kind.is_anchor()).unwrap_or(false);
        let heuristic = if self.operating_mode == OperatingMode::Automatic && is_anchor {
            Some(round_down_to_quarter_hour(&self.clock.now()))
        } else {
            None
        };

        self.meeting_start.ensure(heuristic)
    }

    fn measure_drift(
        &self,
        model: &ScheduleModel,
        segment_id: u32,
        meeting_start: DateTime<Local>,
        with_song_allowance: bool,
    ) -> Option<Drift> {
        let planned_end = meeting_start + model.planned_end_offset()?;
        let total_time_remaining = planned_end - self.clock.now();

        let remaining_required = model
            .remaining_from(segment_id)
            .iter()
            .fold(Duration::zero(), |total, item| {
                let mut required = item.actual_duration() + item.changeover_gap();
                if with_song_allowance && needs_song_allowance(item) {
                    required = required + Duration::seconds(INTERVAL_SONG_ALLOWANCE_SECS);
                }
                total + required
            });

        Some(Drift {
            total_time_remaining,
            remaining_required,
        })
    }
}

fn needs_song_allowance(segment: &Segment) -> bool {
    let precedes_song = segment
        .kind
        .map(|kind| kind.precedes_interval_song())
        .unwrap_or(false);
    precedes_song && segment.changeover_gap_ms == 0
}
