// src/config.rs
//
// Aggregate runtime configuration. Every section is optional in the
// YAML file; omitted sections and fields fall back to the calibrated
// defaults each detector declares.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::analysis::{
    CollapseConfig, ContactConfig, GroundConfig, HyperextensionConfig, JumpConfig,
    StillnessConfig, VelocityConfig,
};
use crate::tracking::TrackerConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub jumps: JumpConfig,
    pub velocity: VelocityConfig,
    pub contacts: ContactConfig,
    pub collapse: CollapseConfig,
    pub stillness: StillnessConfig,
    pub hyperextension: HyperextensionConfig,
    pub ground: GroundConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config file {path}"))?;
        let config: Config =
            serde_yaml::from_str(&contents).with_context(|| format!("parsing {path}"))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(config.contacts.std_multiplier > 0.0);
    }

    #[test]
    fn test_partial_section_overrides_one_field() {
        let config: Config = serde_yaml::from_str("contacts:\n  std_multiplier: 3.0\n").unwrap();
        assert_eq!(config.contacts.std_multiplier, 3.0);
        // Untouched fields in the same section keep their defaults.
        assert_eq!(config.contacts.min_jerk_threshold, 8.0);
    }
}
