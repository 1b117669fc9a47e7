use std::{sync::Arc, time::Duration as StdDuration};

use anyhow::{bail, Context, Result};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::error::AutomatorError;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

use super::{AutomatorPhase, ProgramAutomator};

/// Drives a [`ProgramAutomator`] on the tokio runtime: a fast tick for the segment timer
/// and a coarse tick for start/stop decisions.
pub struct AutomatorController {
    automator: Arc<Mutex<ProgramAutomator>>,
    timer_tick: StdDuration,
    automator_tick: StdDuration,
    handle: Option<JoinHandle<Result<(), AutomatorError>>>,
    cancel_token: Option<CancellationToken>,
}

impl AutomatorController {
    pub fn new(automator: ProgramAutomator, config: &EngineConfig) -> Self {
        let config = config.clone().sanitized();
        Self {
            automator: Arc::new(Mutex::new(automator)),
            timer_tick: StdDuration::from_millis(config.timer_tick_ms),
            automator_tick: StdDuration::from_millis(config.automator_tick_ms),
            handle: None,
            cancel_token: None,
        }
    }

    pub fn automator(&self) -> Arc<Mutex<ProgramAutomator>> {
        self.automator.clone()
    }

    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            bail!("automator already started");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(automation_loop(
            self.automator.clone(),
            self.timer_tick,
            self.automator_tick,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Halt the automator's tick source. A running segment timer is left as is.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.join().await
    }

    /// Wait for the program to finish, surfacing a fatal desync if one occurred.
    pub async fn wait(&mut self) -> Result<()> {
        self.join().await
    }

    async fn join(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        handle
            .await
            .context("automator task failed to join")?
            .context("automated program aborted")
    }
}

impl Drop for AutomatorController {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}

async fn automation_loop(
    automator: Arc<Mutex<ProgramAutomator>>,
    timer_tick: StdDuration,
    automator_tick: StdDuration,
    cancel_token: CancellationToken,
) -> Result<(), AutomatorError> {
    let mut timer_ticker = time::interval(timer_tick);
    timer_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut decision_ticker = time::interval(automator_tick);
    decision_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = timer_ticker.tick() => {
                automator.lock().await.timer_mut().tick();
            }
            _ = decision_ticker.tick() => {
                let phase = automator.lock().await.tick();
                match phase {
                    Ok(AutomatorPhase::Done) => {
                        log_info!("automated program finished");
                        return Ok(());
                    }
                    Ok(_) => {}
                    Err(err) => {
                        log_error!("automated program aborted: {err}");
                        return Err(err);
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("automator shutting down");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::ProgramType;
    use crate::schedule::ScheduleModel;
    use chrono::{Duration, Local, TimeZone};
    use rand::{rngs::StdRng, SeedableRng};

    fn controller() -> (ManualClock, AutomatorController) {
        let clock = ManualClock::new(Local.with_ymd_and_hms(2019, 1, 7, 19, 0, 0).unwrap());
        let config = EngineConfig {
            timer_tick_ms: 5,
            automator_tick_ms: 10,
            ..EngineConfig::automatic(ProgramType::Midweek)
        };
        let automator = ProgramAutomator::with_rng(
            clock.shared(),
            ScheduleModel::for_program(ProgramType::Midweek),
            &config,
            StdRng::seed_from_u64(3),
        );
        (clock, AutomatorController::new(automator, &config))
    }

    async fn settle() {
        time::sleep(StdDuration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn drives_the_program_from_the_clock() {
        let (clock, mut controller) = controller();
        let automator = controller.automator();
        let mut events = automator.lock().await.timer().subscribe();

        controller.start().unwrap();
        assert!(controller.start().is_err());
        settle().await;
        assert_eq!(automator.lock().await.phase(), AutomatorPhase::Armed);

        clock.advance(Duration::minutes(6));
        settle().await;
        {
            let guard = automator.lock().await;
            assert_eq!(guard.phase(), AutomatorPhase::Running);
            assert!(guard.timer().is_running());
        }
        let started = events.try_recv().unwrap();
        assert_eq!(started.elapsed_ms, 0);

        controller.stop().await.unwrap();
        assert!(!controller.is_active());
    }

    #[tokio::test]
    async fn dropping_the_controller_cancels_the_loop() {
        let (_clock, mut controller) = controller();
        let automator = controller.automator();

        controller.start().unwrap();
        settle().await;
        assert_eq!(Arc::strong_count(&automator), 3);

        drop(controller);
        settle().await;
        assert_eq!(Arc::strong_count(&automator), 1);
    }

    #[tokio::test]
    async fn desync_aborts_the_run() {
        let (clock, mut controller) = controller();
        let automator = controller.automator();

        controller.start().unwrap();
        settle().await;
        automator
            .lock()
            .await
            .timer_mut()
            .start(Duration::minutes(1));

        clock.advance(Duration::minutes(6));
        let err = controller.wait().await.unwrap_err();
        assert!(format!("{err:#}").contains("already running"));
    }
}
