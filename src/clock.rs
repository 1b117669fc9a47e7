//! Injectable time sources.
//!
//! Every component reads "now" through [`ClockSource`] so tests and the simulation can
//! drive time forward without sleeping.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Local, Utc};

pub trait ClockSource: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    fn utc_now(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }
}

pub type SharedClock = Arc<dyn ClockSource>;

/// Wall clock of the host machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same reading.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Local>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    pub fn set(&self, value: DateTime<Local>) {
        let mut guard = match self.now.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = value;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = match self.now.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = *guard + by;
    }

    pub fn shared(&self) -> SharedClock {
        Arc::new(self.clone())
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> DateTime<Local> {
        match self.now.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
