//! Configuration management.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Poll loop interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Web API configuration
    #[serde(default)]
    pub web: WebConfig,

    /// Sensor stack configuration
    #[serde(default)]
    pub sensors: SensorsConfig,
}

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Whether to serve the JSON API
    #[serde(default = "default_web_enable")]
    pub enable: bool,

    /// Listen address (e.g., "0.0.0.0:8080")
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enable: default_web_enable(),
            listen: default_listen(),
        }
    }
}

/// Sensor stack configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorsConfig {
    /// GPIO line the wheel pulse signal is wired to
    #[serde(default = "default_hall_pin")]
    pub hall_pin: u32,

    /// Wheel circumference in meters
    #[serde(default = "default_wheel_circumference")]
    pub wheel_circumference_m: f64,

    /// Sea-level reference pressure in hPa
    #[serde(default = "default_sea_level")]
    pub sea_level_hpa: f64,

    /// Session statistics file path
    #[serde(default = "default_statistics_file")]
    pub statistics_file: String,
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            hall_pin: default_hall_pin(),
            wheel_circumference_m: default_wheel_circumference(),
            sea_level_hpa: default_sea_level(),
            statistics_file: default_statistics_file(),
        }
    }
}

// Default value functions
fn default_poll_interval() -> u64 {
    200
}

fn default_web_enable() -> bool {
    true
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_hall_pin() -> u32 {
    24
}

fn default_wheel_circumference() -> f64 {
    0.1397 // Stock 44.5 mm diameter wheel
}

fn default_sea_level() -> f64 {
    1013.25
}

fn default_statistics_file() -> String {
    "data/statistics.json".to_string()
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            web: WebConfig::default(),
            sensors: SensorsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.poll_interval_ms, 200);
        assert!(config.web.enable);
        assert_eq!(config.web.listen, "0.0.0.0:8080");
        assert_eq!(config.sensors.hall_pin, 24);
        assert!((config.sensors.wheel_circumference_m - 0.1397).abs() < 1e-9);
        assert_eq!(config.sensors.statistics_file, "data/statistics.json");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.poll_interval_ms, 200);
        assert_eq!(config.sensors.hall_pin, 24);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config: Config = toml::from_str(
            r#"
            poll_interval_ms = 100

            [web]
            listen = "127.0.0.1:9000"

            [sensors]
            hall_pin = 18
            wheel_circumference_m = 1.0
            "#,
        )
        .unwrap();
        assert_eq!(config.poll_interval_ms, 100);
        assert!(config.web.enable);
        assert_eq!(config.web.listen, "127.0.0.1:9000");
        assert_eq!(config.sensors.hall_pin, 18);
        assert!((config.sensors.wheel_circumference_m - 1.0).abs() < 1e-9);
        assert!((config.sensors.sea_level_hpa - 1013.25).abs() < 1e-9);
    }
}
