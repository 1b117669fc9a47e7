use std::{sync::Arc, time::Duration as StdDuration};

use anyhow::{bail, Result};
use chrono::Duration;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time,
};

use crate::clock::SharedClock;
use crate::config::EngineConfig;
use crate::utils::time::millis_to_next_second;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

use super::{SegmentTimer, TimerEvent};

/// Operator-facing async wrapper around [`SegmentTimer`]: aligns starts to the clock
/// second and keeps the periodic tick running while a segment is on.
#[derive(Clone)]
pub struct TimerController {
    timer: Arc<Mutex<SegmentTimer>>,
    clock: SharedClock,
    events: broadcast::Sender<TimerEvent>,
    ticker: Arc<Mutex<TickerSlot>>,
    tick_interval: StdDuration,
}

/// Aborts the ticker task once the last controller handle is dropped.
#[derive(Default)]
struct TickerSlot(Option<JoinHandle<()>>);

impl TickerSlot {
    fn replace(&mut self, handle: Option<JoinHandle<()>>) {
        if let Some(previous) = std::mem::replace(&mut self.0, handle) {
            previous.abort();
        }
    }
}

impl Drop for TickerSlot {
    fn drop(&mut self) {
        self.replace(None);
    }
}

impl TimerController {
    pub fn new(clock: SharedClock, config: &EngineConfig) -> Self {
        let timer = SegmentTimer::new(clock.clone());
        let events = timer.sender();

        Self {
            timer: Arc::new(Mutex::new(timer)),
            clock,
            events,
            ticker: Arc::new(Mutex::new(TickerSlot::default())),
            tick_interval: StdDuration::from_millis(config.clone().sanitized().timer_tick_ms),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    pub async fn get_snapshot(&self) -> TimerEvent {
        let mut guard = self.timer.lock().await;
        guard.tick();
        guard.snapshot()
    }

    pub async fn start_segment(&self, target: Duration) -> Result<TimerEvent> {
        if target < Duration::zero() {
            bail!("segment target must not be negative");
        }

        {
            let timer = self.timer.lock().await;
            if timer.is_running() {
                bail!("timer already active");
            }
        }

        // Line the stopwatch up with the displayed clock second.
        let delay_ms = millis_to_next_second(&self.clock.utc_now());
        if delay_ms > 0 {
            time::sleep(StdDuration::from_millis(delay_ms)).await;
        }

        let event = {
            let mut timer = self.timer.lock().await;
            if timer.is_running() {
                bail!("timer already active");
            }
            timer.start(target)
        };

        self.spawn_ticker().await;
        log_info!("segment timer started, target {}s", target.num_seconds());

        Ok(event)
    }

    pub async fn stop_segment(&self) -> Result<Duration> {
        let elapsed = {
            let mut timer = self.timer.lock().await;
            if !timer.is_running() {
                bail!("no active segment to stop");
            }
            timer.stop()
        };

        self.cancel_ticker().await;
        log_info!("segment timer stopped after {}s", elapsed.num_seconds());

        Ok(elapsed)
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        ticker_guard.replace(None);

        let timer = self.timer.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;

                let mut guard = timer.lock().await;
                if !guard.is_running() {
                    break;
                }
                guard.tick();
            }
        });

        ticker_guard.replace(Some(handle));
    }

    async fn cancel_ticker(&self) {
        self.ticker.lock().await.replace(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::timer::TimerStatus;
    use chrono::{DateTime, Local, TimeZone};

    fn controller() -> (ManualClock, TimerController) {
        controller_at(Local.with_ymd_and_hms(2019, 1, 7, 19, 8, 0).unwrap())
    }

    fn controller_at(now: DateTime<Local>) -> (ManualClock, TimerController) {
        let clock = ManualClock::new(now);
        let config = EngineConfig {
            timer_tick_ms: 10,
            ..EngineConfig::default()
        };
        let controller = TimerController::new(clock.shared(), &config);
        (clock, controller)
    }

    async fn next_event(rx: &mut broadcast::Receiver<TimerEvent>) -> TimerEvent {
        time::timeout(StdDuration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for timer event")
            .expect("timer event channel closed")
    }

    #[tokio::test]
    async fn ticker_reports_clock_progress() {
        let (clock, controller) = controller();
        let mut rx = controller.subscribe();

        let started = controller.start_segment(Duration::minutes(10)).await.unwrap();
        assert_eq!(started.elapsed_ms, 0);
        assert_eq!(next_event(&mut rx).await, started);

        clock.advance(Duration::seconds(2));
        let progressed = next_event(&mut rx).await;
        assert_eq!(progressed.status, TimerStatus::Running);
        assert_eq!(progressed.elapsed_secs(), 2);
        assert_eq!(progressed.remaining_secs(), 598);

        let elapsed = controller.stop_segment().await.unwrap();
        assert_eq!(elapsed, Duration::seconds(2));
        let stopped = next_event(&mut rx).await;
        assert_eq!(stopped.status, TimerStatus::Idle);
    }

    #[tokio::test]
    async fn start_and_stop_preconditions_are_enforced() {
        let (_clock, controller) = controller();

        assert!(controller.stop_segment().await.is_err());

        controller.start_segment(Duration::minutes(1)).await.unwrap();
        let err = controller
            .start_segment(Duration::minutes(1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already active"));

        controller.stop_segment().await.unwrap();
        let snapshot = controller.get_snapshot().await;
        assert_eq!(snapshot.status, TimerStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn start_waits_for_the_next_clock_second() {
        let mid_second =
            Local.with_ymd_and_hms(2019, 1, 7, 19, 8, 0).unwrap() + Duration::milliseconds(300);
        let (_clock, controller) = controller_at(mid_second);
        let mut rx = controller.subscribe();

        let before = time::Instant::now();
        let started = controller.start_segment(Duration::minutes(5)).await.unwrap();
        let waited = time::Instant::now() - before;

        assert!(waited >= StdDuration::from_millis(700), "{waited:?}");
        assert!(waited < StdDuration::from_millis(800), "{waited:?}");
        assert_eq!(started.status, TimerStatus::Running);
        assert_eq!(rx.try_recv().unwrap(), started);

        controller.stop_segment().await.unwrap();
    }

    #[tokio::test]
    async fn dropping_the_controller_stops_the_ticker() {
        let (_clock, controller) = controller();
        let timer = Arc::downgrade(&controller.timer);

        controller.start_segment(Duration::minutes(1)).await.unwrap();
        drop(controller);
        time::sleep(StdDuration::from_millis(50)).await;

        assert!(timer.upgrade().is_none());
    }
}
