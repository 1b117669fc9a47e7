use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::clock::SharedClock;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
}

/// Elapsed/remaining notification. `remaining_ms` goes negative in overtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerEvent {
    pub status: TimerStatus,
    pub target_ms: i64,
    pub elapsed_ms: i64,
    pub remaining_ms: i64,
}

impl TimerEvent {
    pub fn elapsed_secs(&self) -> i64 {
        self.elapsed_ms / 1000
    }

    pub fn remaining_secs(&self) -> i64 {
        self.remaining_ms / 1000
    }

    pub fn is_overtime(&self) -> bool {
        self.remaining_ms < 0
    }
}

/// Stopwatch for the segment currently on stage.
///
/// Idle -> Running -> Idle, once per segment. Elapsed time is read from the injected
/// clock, so it only advances when the clock does.
pub struct SegmentTimer {
    clock: SharedClock,
    status: TimerStatus,
    target_ms: i64,
    active_ms: i64,
    running_anchor: Option<DateTime<Utc>>,
    last_emitted_secs: Option<i64>,
    events: broadcast::Sender<TimerEvent>,
}

impl SegmentTimer {
    pub fn new(clock: SharedClock) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            clock,
            status: TimerStatus::Idle,
            target_ms: 0,
            active_ms: 0,
            running_anchor: None,
            last_emitted_secs: None,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    pub(crate) fn sender(&self) -> broadcast::Sender<TimerEvent> {
        self.events.clone()
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn target(&self) -> Duration {
        Duration::milliseconds(self.target_ms)
    }

    pub fn elapsed(&self) -> Duration {
        Duration::milliseconds(self.current_active_ms())
    }

    pub fn remaining(&self) -> Duration {
        Duration::milliseconds(self.target_ms - self.current_active_ms())
    }

    pub fn snapshot(&self) -> TimerEvent {
        let elapsed_ms = self.current_active_ms();
        TimerEvent {
            status: self.status,
            target_ms: self.target_ms,
            elapsed_ms,
            remaining_ms: self.target_ms - elapsed_ms,
        }
    }

    /// Begin timing against `target`. Callers own the "not already running" check.
    pub fn start(&mut self, target: Duration) -> TimerEvent {
        if self.is_running() {
            log_warn!(
                "timer restarted while running ({}ms elapsed discarded)",
                self.current_active_ms()
            );
        }

        self.status = TimerStatus::Running;
        self.target_ms = target.num_milliseconds();
        self.active_ms = 0;
        self.running_anchor = Some(self.clock.utc_now());
        self.last_emitted_secs = Some(0);

        let event = self.snapshot();
        let _ = self.events.send(event);
        event
    }

    /// Recompute elapsed time; emits when the whole-second value changed.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if !self.is_running() {
            return None;
        }

        self.sync_active_from_anchor();
        let event = self.snapshot();
        if self.last_emitted_secs == Some(event.elapsed_secs()) {
            return None;
        }

        self.last_emitted_secs = Some(event.elapsed_secs());
        let _ = self.events.send(event);
        Some(event)
    }

    /// Halt timing, emit the final value and reset for the next segment.
    pub fn stop(&mut self) -> Duration {
        self.sync_active_from_anchor();
        let final_event = TimerEvent {
            status: TimerStatus::Idle,
            ..self.snapshot()
        };
        let elapsed = Duration::milliseconds(self.active_ms);

        self.status = TimerStatus::Idle;
        self.running_anchor = None;
        self.active_ms = 0;
        self.last_emitted_secs = None;

        let _ = self.events.send(final_event);
        elapsed
    }

    fn current_active_ms(&self) -> i64 {
        match (self.status, self.running_anchor) {
            (TimerStatus::Running, Some(anchor)) => {
                (self.clock.utc_now() - anchor).num_milliseconds().max(0)
            }
            _ => self.active_ms,
        }
    }

    fn sync_active_from_anchor(&mut self) {
        self.active_ms = self.current_active_ms();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Local, TimeZone};

    fn timer() -> (ManualClock, SegmentTimer) {
        let clock = ManualClock::new(Local.with_ymd_and_hms(2019, 1, 7, 19, 8, 0).unwrap());
        let timer = SegmentTimer::new(clock.shared());
        (clock, timer)
    }

    #[test]
    fn start_emits_zero_immediately() {
        let (_clock, mut timer) = timer();
        let mut rx = timer.subscribe();

        let event = timer.start(Duration::minutes(10));

        assert_eq!(event.elapsed_ms, 0);
        assert_eq!(event.remaining_ms, 600_000);
        assert_eq!(rx.try_recv().unwrap(), event);
        assert!(timer.is_running());
    }

    #[test]
    fn tick_only_reports_whole_second_changes() {
        let (clock, mut timer) = timer();
        timer.start(Duration::seconds(5));

        assert_eq!(timer.tick(), None);
        clock.advance(Duration::milliseconds(400));
        assert_eq!(timer.tick(), None);
        clock.advance(Duration::milliseconds(700));

        let event = timer.tick().unwrap();
        assert_eq!(event.elapsed_secs(), 1);
        assert_eq!(event.remaining_ms, 3_900);
    }

    #[test]
    fn remaining_goes_negative_in_overtime() {
        let (clock, mut timer) = timer();
        timer.start(Duration::seconds(30));
        clock.advance(Duration::seconds(45));

        let event = timer.tick().unwrap();
        assert!(event.is_overtime());
        assert_eq!(event.remaining_secs(), -15);
        assert_eq!(timer.remaining(), Duration::seconds(-15));
    }

    #[test]
    fn stop_reports_final_value_and_resets() {
        let (clock, mut timer) = timer();
        let mut rx = timer.subscribe();
        timer.start(Duration::minutes(4));
        clock.advance(Duration::seconds(242));

        let elapsed = timer.stop();

        assert_eq!(elapsed, Duration::seconds(242));
        assert_eq!(timer.status(), TimerStatus::Idle);
        assert_eq!(timer.elapsed(), Duration::zero());
        assert_eq!(timer.tick(), None);

        let _started = rx.try_recv().unwrap();
        let stopped = rx.try_recv().unwrap();
        assert_eq!(stopped.status, TimerStatus::Idle);
        assert_eq!(stopped.elapsed_ms, 242_000);
    }

    #[test]
    fn next_segment_starts_from_zero() {
        let (clock, mut timer) = timer();
        timer.start(Duration::minutes(2));
        clock.advance(Duration::seconds(100));
        timer.stop();

        clock.advance(Duration::seconds(20));
        timer.start(Duration::minutes(3));
        clock.advance(Duration::seconds(3));

        assert_eq!(timer.elapsed(), Duration::seconds(3));
        assert_eq!(timer.target(), Duration::minutes(3));
    }
}
