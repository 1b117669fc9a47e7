use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{AdaptiveMode, OperatingMode, ProgramType};

/// Tunables for the engine. Unknown keys are rejected, missing keys fall back to
/// [`EngineConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EngineConfig {
    pub adaptive_mode: AdaptiveMode,
    pub operating_mode: OperatingMode,
    pub program_type: ProgramType,

    /// Segment timer refresh period
    pub timer_tick_ms: u64,

    /// Automator decision period
    pub automator_tick_ms: u64,

    /// Uniform jitter applied to automator gaps, as a fraction of the base gap
    pub jitter_fraction: f64,

    /// Delay between arming on a quarter-hour and starting the first segment
    pub first_start_delay_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            adaptive_mode: AdaptiveMode::None,
            operating_mode: OperatingMode::Manual,
            program_type: ProgramType::Midweek,
            timer_tick_ms: 100,
            automator_tick_ms: 3_000,
            jitter_fraction: 0.10,
            first_start_delay_secs: 5 * 60,
        }
    }
}

impl EngineConfig {
    /// Defaults for fully automatic operation.
    pub fn automatic(program_type: ProgramType) -> Self {
        Self {
            adaptive_mode: AdaptiveMode::TwoWay,
            operating_mode: OperatingMode::Automatic,
            program_type,
            ..Self::default()
        }
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(contents).context("failed to parse engine configuration")?;
        Ok(config.sanitized())
    }

    /// `MEETING_PACER_DEBUG=1` makes the automator decide every half second.
    pub fn with_env_overrides(mut self) -> Self {
        let debug_mode = std::env::var("MEETING_PACER_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        if debug_mode {
            self.automator_tick_ms = 500;
        }
        self
    }

    /// Bring every tunable into the range the engine can run with. Applied by each
    /// consumer, so hand-built configs are covered too.
    pub fn sanitized(mut self) -> Self {
        self.jitter_fraction = if self.jitter_fraction.is_finite() {
            self.jitter_fraction.clamp(0.0, 0.5)
        } else {
            0.0
        };
        self.timer_tick_ms = self.timer_tick_ms.max(10);
        self.automator_tick_ms = self.automator_tick_ms.max(10);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            EngineConfig::from_json(r#"{ "adaptiveMode": "oneWay", "programType": "weekend" }"#)
                .unwrap();

        assert_eq!(config.adaptive_mode, AdaptiveMode::OneWay);
        assert_eq!(config.program_type, ProgramType::Weekend);
        assert_eq!(config.operating_mode, OperatingMode::Manual);
        assert_eq!(config.timer_tick_ms, 100);
        assert_eq!(config.automator_tick_ms, 3_000);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = EngineConfig::from_json(r#"{ "jitterFraction": 3.0, "timerTickMs": 0 }"#)
            .unwrap();

        assert_eq!(config.jitter_fraction, 0.5);
        assert_eq!(config.timer_tick_ms, 10);
    }

    #[test]
    fn hand_built_values_are_sanitized() {
        let config = EngineConfig {
            jitter_fraction: f64::NAN,
            timer_tick_ms: 0,
            automator_tick_ms: 0,
            ..EngineConfig::default()
        }
        .sanitized();
        assert_eq!(config.jitter_fraction, 0.0);
        assert_eq!(config.timer_tick_ms, 10);
        assert_eq!(config.automator_tick_ms, 10);

        let negative = EngineConfig {
            jitter_fraction: -0.2,
            ..EngineConfig::default()
        }
        .sanitized();
        assert_eq!(negative.jitter_fraction, 0.0);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EngineConfig::from_json(r#"{ "bellVolume": 3 }"#).unwrap_err();
        assert!(err.to_string().contains("engine configuration"));
    }
}
