//! Configuration management for Surplus Charge
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files. Every section falls back to its defaults so
//! a partial file is enough.

use crate::error::{Result, SurplusError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Highest charging current the vehicle API accepts
pub const PROTOCOL_MAX_AMPS: u32 = 32;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// HTTP client timeouts
    pub http: HttpConfig,

    /// Vehicle API state location
    pub tesla: TeslaConfig,

    /// Charge control policy
    pub controls: ControlsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Directory (or file path whose parent is used) for rolling log files
    pub file: Option<String>,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to the console (stderr)
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// Socket read timeout in seconds
    pub read_timeout_secs: u64,
}

/// Vehicle API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeslaConfig {
    /// JSON file holding tokens, vehicle identity and the home location
    pub state_file: String,
}

/// How the surplus-derived current is turned into whole amps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoundingMode {
    /// Round to the nearest amp
    #[default]
    Nearest,
    /// Drop the fractional part
    Truncate,
}

/// Charge control policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Lowest current worth charging with. Below this the car is stopped.
    pub min_amps: u32,

    /// Upper bound for the requested current, never above 32
    pub max_amps: u32,

    /// Margin below `min_amps` still accepted before stopping
    pub stop_margin_amps: f64,

    /// Rounding applied to surplus / power-per-amp
    pub rounding: RoundingMode,

    /// Maximum distance from home, in miles, at which charging is adapted
    pub home_radius_miles: f64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: None,
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            read_timeout_secs: 30,
        }
    }
}

impl Default for TeslaConfig {
    fn default() -> Self {
        Self {
            state_file: "tesla_state.json".to_string(),
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            min_amps: 4,
            max_amps: PROTOCOL_MAX_AMPS,
            stop_margin_amps: 0.5,
            rounding: RoundingMode::Nearest,
            home_radius_miles: 5.0,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first default location that exists
    pub fn load() -> Result<Self> {
        let default_paths = ["surplus_charge.yaml", "/etc/surplus-charge/config.yaml"];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.tesla.state_file.trim().is_empty() {
            return Err(SurplusError::validation(
                "tesla.state_file",
                "State file path cannot be empty",
            ));
        }

        if self.http.connect_timeout_secs == 0 {
            return Err(SurplusError::validation(
                "http.connect_timeout_secs",
                "Must be greater than 0",
            ));
        }

        if self.http.read_timeout_secs == 0 {
            return Err(SurplusError::validation(
                "http.read_timeout_secs",
                "Must be greater than 0",
            ));
        }

        let controls = &self.controls;
        if controls.min_amps == 0 || controls.min_amps > PROTOCOL_MAX_AMPS {
            return Err(SurplusError::validation(
                "controls.min_amps",
                "Must be between 1 and 32",
            ));
        }

        if controls.max_amps < controls.min_amps || controls.max_amps > PROTOCOL_MAX_AMPS {
            return Err(SurplusError::validation(
                "controls.max_amps",
                "Must be between min_amps and 32",
            ));
        }

        if !(0.0..1.0).contains(&controls.stop_margin_amps) {
            return Err(SurplusError::validation(
                "controls.stop_margin_amps",
                "Must be within [0, 1)",
            ));
        }

        if !(controls.home_radius_miles > 0.0) {
            return Err(SurplusError::validation(
                "controls.home_radius_miles",
                "Must be positive",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.controls.min_amps, 4);
        assert_eq!(config.controls.max_amps, 32);
        assert_eq!(config.controls.rounding, RoundingMode::Nearest);
        assert_eq!(config.http.connect_timeout_secs, 15);
        assert_eq!(config.http.read_timeout_secs, 30);
        assert_eq!(config.tesla.state_file, "tesla_state.json");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.controls.min_amps = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.controls.max_amps = 40;
        assert!(config.validate().is_err());

        config = Config::default();
        config.controls.min_amps = 10;
        config.controls.max_amps = 8;
        assert!(config.validate().is_err());

        config = Config::default();
        config.http.read_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "controls:\n  min_amps: 1\n  rounding: truncate\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.controls.min_amps, 1);
        assert_eq!(config.controls.rounding, RoundingMode::Truncate);
        assert_eq!(config.controls.max_amps, 32);
        assert_eq!(config.logging.level, "INFO");
    }
}
