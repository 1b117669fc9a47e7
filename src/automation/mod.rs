pub mod automator;
pub mod driver;
pub mod heuristics;

pub use automator::{AutomatorPhase, ProgramAutomator};
pub use driver::AutomatorController;
pub use heuristics::GapPolicy;
