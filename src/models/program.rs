use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ProgramType {
    #[default]
    Midweek,
    Weekend,
}

impl ProgramType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramType::Midweek => "midweek",
            ProgramType::Weekend => "weekend",
        }
    }
}

/// Where the schedule came from and who drives it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum OperatingMode {
    #[default]
    Manual,
    File,
    Automatic,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum AdaptiveMode {
    #[default]
    None,
    /// Only ever shortens segments.
    OneWay,
    TwoWay,
}
