use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Well-known slots of the midweek and weekend programs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SegmentKind {
    OpeningComments,
    TreasuresTalk,
    DiggingForGems,
    BibleReading,
    Ministry1,
    Ministry2,
    Ministry3,
    Ministry4,
    LivingPart1,
    LivingPart2,
    CongregationBibleStudy,
    ConcludingComments,
    PublicTalk,
    WatchtowerStudy,
}

impl SegmentKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            SegmentKind::OpeningComments => "Opening Comments",
            SegmentKind::TreasuresTalk => "Treasures",
            SegmentKind::DiggingForGems => "Digging for Spiritual Gems",
            SegmentKind::BibleReading => "Bible Reading",
            SegmentKind::Ministry1 => "Ministry 1",
            SegmentKind::Ministry2 => "Ministry 2",
            SegmentKind::Ministry3 => "Ministry 3",
            SegmentKind::Ministry4 => "Ministry 4",
            SegmentKind::LivingPart1 => "Living Part 1",
            SegmentKind::LivingPart2 => "Living Part 2",
            SegmentKind::CongregationBibleStudy => "Congregation Bible Study",
            SegmentKind::ConcludingComments => "Concluding Comments",
            SegmentKind::PublicTalk => "Public Talk",
            SegmentKind::WatchtowerStudy => "Watchtower Study",
        }
    }

    /// First item of a program; starting it pins down the meeting start time.
    pub fn is_anchor(&self) -> bool {
        matches!(self, SegmentKind::OpeningComments | SegmentKind::PublicTalk)
    }

    pub fn is_ministry(&self) -> bool {
        matches!(
            self,
            SegmentKind::Ministry1
                | SegmentKind::Ministry2
                | SegmentKind::Ministry3
                | SegmentKind::Ministry4
        )
    }

    /// Kinds that are always followed by an interval song.
    ///
    /// The midweek song follows whichever ministry item is last; see
    /// [`crate::automation::heuristics::song_preceding_segment`].
    pub fn precedes_interval_song(&self) -> bool {
        matches!(self, SegmentKind::PublicTalk)
    }
}

/// One timed item of a program, plus the durations accumulated while it runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: u32,
    pub name: String,
    pub kind: Option<SegmentKind>,
    pub original_ms: i64,
    pub modified_ms: Option<i64>,
    pub adapted_ms: Option<i64>,
    pub completed_ms: Option<i64>,
    pub editable: bool,
    pub allow_adaptive: bool,
    pub bell_applicable: bool,
    pub closing_secs: u32,
    /// Idle time after this segment until the next one's nominal start.
    pub changeover_gap_ms: i64,
    pub start_offset_ms: i64,
}

impl Segment {
    pub fn original_duration(&self) -> Duration {
        Duration::milliseconds(self.original_ms)
    }

    pub fn modified_duration(&self) -> Option<Duration> {
        self.modified_ms.map(Duration::milliseconds)
    }

    pub fn adapted_duration(&self) -> Option<Duration> {
        self.adapted_ms.map(Duration::milliseconds)
    }

    /// Basis for remaining-time math: the operator override if any, else the plan.
    pub fn actual_duration(&self) -> Duration {
        self.modified_duration()
            .unwrap_or_else(|| self.original_duration())
    }

    /// What a timer should count down against once adaptation has been applied.
    pub fn target_duration(&self) -> Duration {
        self.adapted_duration()
            .unwrap_or_else(|| self.actual_duration())
    }

    pub fn completed_time(&self) -> Option<Duration> {
        self.completed_ms.map(Duration::milliseconds)
    }

    pub fn changeover_gap(&self) -> Duration {
        Duration::milliseconds(self.changeover_gap_ms)
    }

    pub fn start_offset_into_meeting(&self) -> Duration {
        Duration::milliseconds(self.start_offset_ms)
    }

    pub fn planned_duration_secs(&self) -> i64 {
        self.original_duration().num_seconds()
    }

    /// Zero-duration items are holes in the program.
    pub fn is_configured(&self) -> bool {
        self.actual_duration() > Duration::zero()
    }

    pub fn has_run(&self) -> bool {
        self.completed_ms.is_some()
    }
}

/// Static description of one program slot, used to build a schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDefinition {
    pub id: u32,
    pub name: String,
    pub kind: Option<SegmentKind>,
    /// Offset from the meeting start at which the slot nominally begins.
    pub nominal_start_ms: Option<i64>,
    pub duration_ms: i64,
    pub editable: bool,
    pub allow_adaptive: bool,
    pub bell_applicable: bool,
    pub closing_secs: u32,
}

impl SegmentDefinition {
    pub fn new(id: u32, name: impl Into<String>, duration: Duration) -> Self {
        Self {
            id,
            name: name.into(),
            kind: None,
            nominal_start_ms: None,
            duration_ms: duration.num_milliseconds(),
            editable: true,
            allow_adaptive: false,
            bell_applicable: false,
            closing_secs: 0,
        }
    }

    pub fn for_kind(id: u32, kind: SegmentKind, duration: Duration) -> Self {
        Self {
            kind: Some(kind),
            ..Self::new(id, kind.display_name(), duration)
        }
    }

    pub fn starting_at(mut self, offset: Duration) -> Self {
        self.nominal_start_ms = Some(offset.num_milliseconds());
        self
    }

    pub fn adaptive(mut self, allow: bool) -> Self {
        self.allow_adaptive = allow;
        self
    }

    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn with_bell(mut self, closing_secs: u32) -> Self {
        self.bell_applicable = true;
        self.closing_secs = closing_secs;
        self
    }

    pub fn duration(&self) -> Duration {
        Duration::milliseconds(self.duration_ms)
    }
}
