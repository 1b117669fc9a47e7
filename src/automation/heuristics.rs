//! Timing policy for automatic operation: how long the automator waits after a segment
//! before starting the next one.

use chrono::Duration;
use rand::Rng;

use crate::models::{Segment, SegmentKind};
use crate::schedule::ScheduleModel;
use crate::utils::time::duration_from_secs_f64;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapPolicy {
    /// Next speaker walks up after brief comments.
    Comment,
    /// Counsel for the student follows the part.
    Counsel,
    /// An interval song follows.
    IntervalSong,
    EndOfProgram,
}

impl GapPolicy {
    pub fn base_secs(&self) -> Option<u32> {
        match self {
            GapPolicy::Comment => Some(20),
            GapPolicy::Counsel => Some(80),
            GapPolicy::IntervalSong => Some(360),
            GapPolicy::EndOfProgram => None,
        }
    }
}

const GAP_TABLE: &[(SegmentKind, GapPolicy)] = &[
    (SegmentKind::OpeningComments, GapPolicy::Comment),
    (SegmentKind::TreasuresTalk, GapPolicy::Comment),
    (SegmentKind::DiggingForGems, GapPolicy::Comment),
    (SegmentKind::BibleReading, GapPolicy::Counsel),
    (SegmentKind::Ministry1, GapPolicy::Counsel),
    (SegmentKind::Ministry2, GapPolicy::Counsel),
    (SegmentKind::Ministry3, GapPolicy::Counsel),
    (SegmentKind::Ministry4, GapPolicy::Counsel),
    (SegmentKind::LivingPart1, GapPolicy::Comment),
    (SegmentKind::LivingPart2, GapPolicy::Comment),
    (SegmentKind::CongregationBibleStudy, GapPolicy::Comment),
    (SegmentKind::ConcludingComments, GapPolicy::EndOfProgram),
    (SegmentKind::PublicTalk, GapPolicy::IntervalSong),
    (SegmentKind::WatchtowerStudy, GapPolicy::EndOfProgram),
];

/// Latest ministry slots first; the first configured one is followed by the song.
const SONG_PRECEDING_CANDIDATES: [SegmentKind; 4] = [
    SegmentKind::Ministry4,
    SegmentKind::Ministry3,
    SegmentKind::Ministry2,
    SegmentKind::Ministry1,
];

/// Free-form items without a kind get the comment gap.
pub fn gap_policy_for(kind: Option<SegmentKind>) -> GapPolicy {
    kind.and_then(|kind| {
        GAP_TABLE
            .iter()
            .find(|(candidate, _)| *candidate == kind)
            .map(|(_, policy)| *policy)
    })
    .unwrap_or(GapPolicy::Comment)
}

/// The ministry item the interval song follows, if the program has a ministry section.
///
/// When every ministry slot is empty the song position is unknown; this is logged and
/// no item is chosen.
pub fn song_preceding_segment(model: &ScheduleModel) -> Option<u32> {
    let has_ministry_slots = model
        .items()
        .iter()
        .any(|segment| segment.kind.map(|kind| kind.is_ministry()).unwrap_or(false));
    if !has_ministry_slots {
        return None;
    }

    let found = SONG_PRECEDING_CANDIDATES.iter().find_map(|wanted| {
        model
            .items()
            .iter()
            .find(|segment| segment.kind == Some(*wanted) && segment.is_configured())
            .map(|segment| segment.id)
    });

    if found.is_none() {
        log_warn!(
            "program {} has no configured ministry items; interval song gap not scheduled",
            model.instance_id()
        );
    }
    found
}

pub fn gap_after(segment: &Segment, song_preceding: Option<u32>) -> GapPolicy {
    if song_preceding == Some(segment.id) {
        GapPolicy::IntervalSong
    } else {
        gap_policy_for(segment.kind)
    }
}

/// `base` scaled by a uniform factor in `[1 - fraction, 1 + fraction]`.
/// A fraction that is not a positive number leaves `base` unchanged.
pub fn jittered<R: Rng + ?Sized>(base: Duration, fraction: f64, rng: &mut R) -> Duration {
    if !(fraction > 0.0 && fraction.is_finite()) {
        return base;
    }
    let factor = 1.0 + rng.gen_range(-fraction..=fraction);
    duration_from_secs_f64(base.num_milliseconds() as f64 / 1000.0 * factor)
}
