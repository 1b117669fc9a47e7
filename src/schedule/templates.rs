//! Static program definitions: nominal start offsets and default lengths per slot.

use chrono::Duration;

use crate::models::{ProgramType, SegmentDefinition, SegmentKind};

/// Bell warning used for student parts.
const STUDENT_CLOSING_SECS: u32 = 30;

pub fn definitions_for(program: ProgramType) -> Vec<SegmentDefinition> {
    match program {
        ProgramType::Midweek => midweek(),
        ProgramType::Weekend => weekend(),
    }
}

fn slot(id: u32, kind: SegmentKind, start_mins: i64, duration_mins: i64) -> SegmentDefinition {
    SegmentDefinition::for_kind(id, kind, Duration::minutes(duration_mins))
        .starting_at(Duration::minutes(start_mins))
}

// Offsets are from the meeting start; the opening song and prayer fill the first five
// minutes and the interval song sits between the ministry section and Living Part 1.
fn midweek() -> Vec<SegmentDefinition> {
    vec![
        slot(1, SegmentKind::OpeningComments, 5, 3),
        slot(2, SegmentKind::TreasuresTalk, 8, 10).adaptive(true),
        slot(3, SegmentKind::DiggingForGems, 18, 8).adaptive(true),
        slot(4, SegmentKind::BibleReading, 26, 4).with_bell(STUDENT_CLOSING_SECS),
        slot(5, SegmentKind::Ministry1, 31, 2).with_bell(STUDENT_CLOSING_SECS),
        slot(6, SegmentKind::Ministry2, 34, 4).with_bell(STUDENT_CLOSING_SECS),
        slot(7, SegmentKind::Ministry3, 39, 6).with_bell(STUDENT_CLOSING_SECS),
        slot(8, SegmentKind::Ministry4, 46, 0).with_bell(STUDENT_CLOSING_SECS),
        slot(9, SegmentKind::LivingPart1, 51, 15).adaptive(true),
        slot(10, SegmentKind::LivingPart2, 66, 0).adaptive(true),
        slot(11, SegmentKind::CongregationBibleStudy, 66, 30).adaptive(true),
        slot(12, SegmentKind::ConcludingComments, 96, 3).adaptive(true),
    ]
}

fn weekend() -> Vec<SegmentDefinition> {
    vec![
        slot(101, SegmentKind::PublicTalk, 5, 30).editable(false),
        slot(102, SegmentKind::WatchtowerStudy, 40, 60)
            .adaptive(true)
            .with_bell(0),
    ]
}
