pub mod program;
pub mod segment;

pub use program::{AdaptiveMode, OperatingMode, ProgramType};
pub use segment::{Segment, SegmentDefinition, SegmentKind};
