//! Application state management.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;

use soapbox_sensors::{
    epoch_secs, HardwareProbe, SensorConfig, SensorCoordinator, SensorStatus, StatisticsSnapshot,
};

/// One polled frame of telemetry, served as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySnapshot {
    /// Speed in km/h
    pub speed_kmh: f64,

    /// Altitude above sea level in meters
    pub altitude_m: f64,

    /// Ambient temperature in °C
    pub temperature_c: f64,

    /// Acceleration in g on (x, y, z)
    pub acceleration_g: [f64; 3],

    /// Wheel pulses seen since startup
    pub pulse_count: u64,

    /// "Real Sensors" or "Demo Mode"
    pub data_source: &'static str,

    /// Unix timestamp of the poll
    pub timestamp: f64,
}

/// Shared application state.
pub struct AppState {
    /// Sensor stack
    coordinator: SensorCoordinator,

    /// Most recent poll result
    latest: RwLock<TelemetrySnapshot>,
}

impl AppState {
    /// Builds the sensor stack and takes the first frame.
    pub fn new(probe: HardwareProbe, config: SensorConfig) -> Self {
        let coordinator = SensorCoordinator::with_probe(probe, config);
        let data_source = coordinator.get_data_source().as_str();

        let state = Self {
            coordinator,
            latest: RwLock::new(TelemetrySnapshot {
                speed_kmh: 0.0,
                altitude_m: 0.0,
                temperature_c: 0.0,
                acceleration_g: [0.0, 0.0, 1.0],
                pulse_count: 0,
                data_source,
                timestamp: 0.0,
            }),
        };

        // First frame is ready before the API starts answering.
        state.poll();
        state
    }

    /// Polls every channel once and stores the frame for the handlers.
    ///
    /// This polling cadence is also what drives the statistics
    /// aggregates, so the loop must keep running even with no API
    /// clients connected.
    pub fn poll(&self) {
        let (x, y, z) = self.coordinator.get_acceleration_g();
        let snapshot = TelemetrySnapshot {
            speed_kmh: self.coordinator.get_speed_kmh(),
            altitude_m: self.coordinator.get_altitude_m(),
            temperature_c: self.coordinator.get_temperature_c(),
            acceleration_g: [x, y, z],
            pulse_count: self.coordinator.pulse_count(),
            data_source: self.coordinator.get_data_source().as_str(),
            timestamp: epoch_secs(),
        };
        *self.latest.write().unwrap() = snapshot;
    }

    /// Returns the most recent telemetry frame.
    pub fn latest(&self) -> TelemetrySnapshot {
        self.latest.read().unwrap().clone()
    }

    /// Returns current per-channel health.
    pub fn sensor_status(&self) -> HashMap<&'static str, SensorStatus> {
        self.coordinator.get_sensor_status()
    }

    /// Returns the data source label.
    pub fn data_source(&self) -> &'static str {
        self.coordinator.get_data_source().as_str()
    }

    /// Returns current session statistics.
    pub fn statistics(&self) -> StatisticsSnapshot {
        self.coordinator.get_statistics()
    }

    /// Clears session statistics and returns the zeroed snapshot.
    pub fn reset_statistics(&self) -> StatisticsSnapshot {
        self.coordinator.reset_statistics();
        self.coordinator.get_statistics()
    }

    /// Releases sensor hardware before exit.
    pub fn cleanup(&self) {
        self.coordinator.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn temp_stats_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("soapbox-state-{}-{}.json", tag, std::process::id()))
    }

    fn demo_state(tag: &str) -> AppState {
        let path = temp_stats_path(tag);
        let _ = std::fs::remove_file(&path);
        let config = SensorConfig {
            statistics_path: path,
            ..SensorConfig::default()
        };
        AppState::new(HardwareProbe::none(), config)
    }

    #[test]
    fn test_first_frame_taken_at_construction() {
        let state = demo_state("first-frame");
        let frame = state.latest();
        assert_eq!(frame.data_source, "Demo Mode");
        assert!(frame.timestamp > 0.0);
        assert!(frame.acceleration_g[2] > 0.9 && frame.acceleration_g[2] < 1.1);
        state.cleanup();
        let _ = std::fs::remove_file(temp_stats_path("first-frame"));
    }

    #[test]
    fn test_poll_advances_snapshot() {
        let state = demo_state("poll");
        let before = state.latest();
        std::thread::sleep(Duration::from_millis(300));
        state.poll();
        let after = state.latest();
        assert!(after.timestamp >= before.timestamp);
        assert!(after.pulse_count > before.pulse_count);
        state.cleanup();
        let _ = std::fs::remove_file(temp_stats_path("poll"));
    }

    #[test]
    fn test_status_covers_all_channels() {
        let state = demo_state("status");
        let status = state.sensor_status();
        assert_eq!(status.len(), 4);
        assert!(status["hall"].healthy);
        state.cleanup();
        let _ = std::fs::remove_file(temp_stats_path("status"));
    }

    #[test]
    fn test_reset_returns_zeroed_statistics() {
        let state = demo_state("reset");
        std::thread::sleep(Duration::from_millis(300));
        state.poll();
        let stats = state.reset_statistics();
        assert_eq!(stats.max_speed_kmh, 0.0);
        assert_eq!(stats.total_distance_km, 0.0);
        state.cleanup();
        let _ = std::fs::remove_file(temp_stats_path("reset"));
    }
}
