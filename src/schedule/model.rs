use chrono::Duration;
use uuid::Uuid;

use crate::error::ScheduleError;
use crate::models::{ProgramType, Segment, SegmentDefinition};

use super::templates;

/// Ordered segments of one program instance.
///
/// Built once and then only touched through the narrow setters below; switching program
/// type means building a new model.
#[derive(Debug, Clone)]
pub struct ScheduleModel {
    instance_id: Uuid,
    program_type: Option<ProgramType>,
    segments: Vec<Segment>,
}

impl ScheduleModel {
    pub fn for_program(program_type: ProgramType) -> Self {
        Self::build(Some(program_type), templates::definitions_for(program_type))
    }

    /// Manual or file-based programs. Definitions without nominal offsets get no
    /// changeover gap.
    pub fn from_definitions(definitions: Vec<SegmentDefinition>) -> Self {
        Self::build(None, definitions)
    }

    fn build(program_type: Option<ProgramType>, definitions: Vec<SegmentDefinition>) -> Self {
        let mut segments = Vec::with_capacity(definitions.len());
        let mut offset_ms = definitions
            .first()
            .and_then(|def| def.nominal_start_ms)
            .unwrap_or(0);

        for (index, def) in definitions.iter().enumerate() {
            let next_nominal = definitions
                .get(index + 1)
                .and_then(|next| next.nominal_start_ms);
            let changeover_gap_ms = match (def.nominal_start_ms, next_nominal) {
                (Some(start), Some(next_start)) => (next_start - (start + def.duration_ms)).max(0),
                _ => 0,
            };

            segments.push(Segment {
                id: def.id,
                name: def.name.clone(),
                kind: def.kind,
                original_ms: def.duration_ms,
                modified_ms: None,
                adapted_ms: None,
                completed_ms: None,
                editable: def.editable,
                allow_adaptive: def.allow_adaptive,
                bell_applicable: def.bell_applicable,
                closing_secs: def.closing_secs,
                changeover_gap_ms,
                start_offset_ms: offset_ms,
            });

            offset_ms += def.duration_ms + changeover_gap_ms;
        }

        Self {
            instance_id: Uuid::new_v4(),
            program_type,
            segments,
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn program_type(&self) -> Option<ProgramType> {
        self.program_type
    }

    pub fn items(&self) -> &[Segment] {
        &self.segments
    }

    pub fn item(&self, id: u32) -> Option<&Segment> {
        self.segments.iter().find(|segment| segment.id == id)
    }

    pub fn position(&self, id: u32) -> Option<usize> {
        self.segments.iter().position(|segment| segment.id == id)
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// `None` yields the first item; otherwise the following item with a non-zero
    /// duration.
    pub fn next(&self, current: Option<u32>) -> Option<u32> {
        let Some(current) = current else {
            return self.segments.first().map(|segment| segment.id);
        };

        let index = self.position(current)?;
        self.segments[index + 1..]
            .iter()
            .find(|segment| segment.is_configured())
            .map(|segment| segment.id)
    }

    pub fn first_configured(&self) -> Option<u32> {
        self.segments
            .iter()
            .find(|segment| segment.is_configured())
            .map(|segment| segment.id)
    }

    pub fn is_configured(&self, id: u32) -> bool {
        self.item(id).map(Segment::is_configured).unwrap_or(false)
    }

    /// The given segment and everything after it.
    pub fn remaining_from(&self, id: u32) -> &[Segment] {
        match self.position(id) {
            Some(index) => &self.segments[index..],
            None => &[],
        }
    }

    /// Offset from the meeting start at which the program is planned to finish.
    pub fn planned_end_offset(&self) -> Option<Duration> {
        self.last()
            .map(|last| last.start_offset_into_meeting() + last.original_duration())
    }

    pub fn set_modified_duration(
        &mut self,
        id: u32,
        duration: Option<Duration>,
    ) -> Result<(), ScheduleError> {
        let segment = self.item_mut(id)?;
        if !segment.editable {
            return Err(ScheduleError::NotEditable(id));
        }
        segment.modified_ms = duration.map(|value| value.num_milliseconds());
        Ok(())
    }

    pub fn set_adapted_duration(
        &mut self,
        id: u32,
        duration: Option<Duration>,
    ) -> Result<(), ScheduleError> {
        self.item_mut(id)?.adapted_ms = duration.map(|value| value.num_milliseconds());
        Ok(())
    }

    pub fn set_completed_time(&mut self, id: u32, elapsed: Duration) -> Result<(), ScheduleError> {
        self.item_mut(id)?.completed_ms = Some(elapsed.num_milliseconds());
        Ok(())
    }

    fn item_mut(&mut self, id: u32) -> Result<&mut Segment, ScheduleError> {
        self.segments
            .iter_mut()
            .find(|segment| segment.id == id)
            .ok_or(ScheduleError::UnknownSegment(id))
    }
}
