use chrono::{DateTime, Duration, Local};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

/// How far a countdown-derived start may sit from the quarter-hour guess and still win.
pub const COUNTDOWN_TOLERANCE_MINS: i64 = 10;

/// The meeting start instant, resolved at most once per program.
#[derive(Debug, Clone, Default)]
pub struct MeetingStartTime {
    resolved: Option<DateTime<Local>>,
    countdown_estimate: Option<DateTime<Local>>,
}

impl MeetingStartTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolved(&self) -> Option<DateTime<Local>> {
        self.resolved
    }

    pub fn countdown_estimate(&self) -> Option<DateTime<Local>> {
        self.countdown_estimate
    }

    /// Estimate reported when the pre-program countdown finished. Ignored once resolved.
    pub fn record_countdown_estimate(&mut self, estimate: DateTime<Local>) {
        if self.resolved.is_none() {
            self.countdown_estimate = Some(estimate);
        }
    }

    /// Force the start time (or clear it with `None`).
    pub fn override_with(&mut self, value: Option<DateTime<Local>>) {
        self.resolved = value;
    }

    /// Resolve and freeze the start time from the quarter-hour `heuristic` (only anchor
    /// segments supply one) and any countdown estimate.
    pub fn ensure(&mut self, heuristic: Option<DateTime<Local>>) -> Option<DateTime<Local>> {
        if let Some(resolved) = self.resolved {
            return Some(resolved);
        }

        let chosen = choose_start(heuristic, self.countdown_estimate)?;
        log_info!(
            "meeting start resolved to {} (heuristic: {:?}, countdown: {:?})",
            chosen.format("%H:%M:%S"),
            heuristic.map(|value| value.format("%H:%M:%S").to_string()),
            self.countdown_estimate
                .map(|value| value.format("%H:%M:%S").to_string()),
        );
        self.resolved = Some(chosen);
        Some(chosen)
    }
}

fn choose_start(
    heuristic: Option<DateTime<Local>>,
    countdown: Option<DateTime<Local>>,
) -> Option<DateTime<Local>> {
    match (heuristic, countdown) {
        (Some(heuristic), Some(countdown)) => {
            let distance = (countdown - heuristic).abs();
            if distance <= Duration::minutes(COUNTDOWN_TOLERANCE_MINS) {
                Some(countdown)
            } else {
                Some(heuristic)
            }
        }
        (Some(heuristic), None) => Some(heuristic),
        (None, countdown) => countdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2019, 1, 7, h, m, 0).unwrap()
    }

    #[test]
    fn countdown_within_tolerance_wins() {
        let mut start = MeetingStartTime::new();
        start.record_countdown_estimate(at(19, 2));

        assert_eq!(start.ensure(Some(at(19, 0))), Some(at(19, 2)));
    }

    #[test]
    fn distant_countdown_loses_to_heuristic() {
        let mut start = MeetingStartTime::new();
        start.record_countdown_estimate(at(19, 12));

        assert_eq!(start.ensure(Some(at(19, 0))), Some(at(19, 0)));
    }

    #[test]
    fn tolerance_edge_is_not_truncated() {
        let mut start = MeetingStartTime::new();
        start.record_countdown_estimate(at(19, 10) + Duration::milliseconds(500));

        assert_eq!(start.ensure(Some(at(19, 0))), Some(at(19, 0)));
    }

    #[test]
    fn nothing_to_go_on_stays_unresolved() {
        let mut start = MeetingStartTime::new();

        assert_eq!(start.ensure(None), None);
        assert_eq!(start.resolved(), None);
    }

    #[test]
    fn resolution_is_frozen() {
        let mut start = MeetingStartTime::new();
        assert_eq!(start.ensure(Some(at(19, 0))), Some(at(19, 0)));

        start.record_countdown_estimate(at(19, 3));
        assert_eq!(start.ensure(Some(at(19, 15))), Some(at(19, 0)));
        assert_eq!(start.countdown_estimate(), None);
    }
}
