//! Kernel configuration with documented constants
//!
//! All tunable numbers are collected here with explanations of their purpose.
//! Configuration is plain data; hosts either take the defaults or load a TOML
//! file with any subset of the sections below.

use crate::core::error::{KernelError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the simulation kernel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Day/night cycle used by time-of-day conditions
    pub calendar: CalendarConfig,

    /// Bundled spatial index parameters
    pub spatial: SpatialConfig,

    /// Rule engine switches
    pub rules: RuleConfig,

    /// Signal bus diagnostics
    pub bus: BusConfig,
}

impl KernelConfig {
    /// Parses configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(KernelError::from)
    }

    /// Loads configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// Day length and starting hour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Simulated seconds in one full day
    ///
    /// At the default (1440), one simulated minute of game time passes per
    /// second, so a 24-hour cycle takes 24 real minutes at 1x speed.
    pub seconds_per_day: f64,

    /// Hour of day at simulation time zero
    ///
    /// Default 8.0 starts the world in the morning so daytime-gated content
    /// is reachable without waiting a night out.
    pub start_hour: f32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            seconds_per_day: 1440.0,
            start_hour: 8.0,
        }
    }
}

/// Parameters for the bundled grid spatial index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Size of each cell in the sparse hash grid (world units)
    ///
    /// Should be on the order of typical action ranges. Smaller = more cells
    /// to visit for large radii, larger = more entities to filter per cell.
    pub cell_size: f32,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self { cell_size: 10.0 }
    }
}

/// Rule engine switches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Global enable; when false no rule fires, periodic or reactive
    pub enabled: bool,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Signal bus diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Emit a `trace!` line for every dispatched signal
    pub trace_signals: bool,

    /// Queue length at which a single drain logs a warning
    ///
    /// A drain this long usually means content is publishing in a cycle
    /// (effect -> signal -> rule -> same effect). Delivery continues; this
    /// is only a diagnostic.
    pub queue_warn_threshold: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            trace_signals: false,
            queue_warn_threshold: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KernelConfig::default();
        assert_eq!(config.calendar.seconds_per_day, 1440.0);
        assert!(config.rules.enabled);
        assert!(!config.bus.trace_signals);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = KernelConfig::from_toml_str(
            r#"
            [calendar]
            seconds_per_day = 600.0

            [rules]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.calendar.seconds_per_day, 600.0);
        assert_eq!(config.calendar.start_hour, 8.0);
        assert!(!config.rules.enabled);
        assert_eq!(config.spatial.cell_size, 10.0);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let result = KernelConfig::from_toml_str("[calendar\nseconds_per_day = 1");
        assert!(matches!(result, Err(KernelError::Toml(_))));
    }
}
