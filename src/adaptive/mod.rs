pub mod calculator;
pub mod meeting_start;

pub use calculator::{AdaptiveCalculator, Drift};
pub use meeting_start::MeetingStartTime;
