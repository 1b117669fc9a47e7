pub mod model;
pub mod templates;

pub use model::ScheduleModel;
