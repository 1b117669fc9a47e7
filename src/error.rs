use thiserror::Error;

/// Rejected mutations of a [`crate::schedule::ScheduleModel`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("unknown segment {0}")]
    UnknownSegment(u32),
    #[error("segment {0} does not allow its duration to be changed")]
    NotEditable(u32),
}

/// Fatal state desynchronisation between the automator, the model and the timer.
///
/// These end the automated run; they are never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AutomatorError {
    #[error("segment {segment_id} was due to start but the timer is already running")]
    TimerAlreadyRunning { segment_id: u32 },
    #[error("segment {segment_id} was due to stop but the timer is not running")]
    TimerNotRunning { segment_id: u32 },
    #[error("segment {0} is missing from the schedule")]
    MissingSegment(u32),
    #[error("a start or stop was due with no current segment")]
    NoCurrentSegment,
}
