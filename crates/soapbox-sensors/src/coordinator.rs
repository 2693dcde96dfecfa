//! Sensor coordinator.
//!
//! Composes the four channels with the statistics tracker, layers on
//! calibration offsets and per-channel health, and exposes the polled
//! accessor surface the display layer consumes. Reads never fail the
//! caller: a failing channel is flagged unhealthy and its last good or
//! safe-default value is returned instead.

use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use tracing::{info, warn};

use crate::channels::{Accelerometer, Barometer, HallSensor, Thermometer};
use crate::hardware::{DataSource, HardwareProbe};
use crate::statistics::{StatisticsSnapshot, StatisticsTracker};
use crate::{DEFAULT_SEA_LEVEL_HPA, ERROR_TIMEOUT_SECS};

/// Construction-time settings for the sensor stack.
#[derive(Debug, Clone)]
pub struct SensorConfig {
    /// GPIO line carrying the wheel pulse signal.
    pub hall_pin: u32,

    /// Wheel circumference in meters, one pulse per revolution.
    pub wheel_circumference_m: f64,

    /// Sea-level reference pressure for the altitude conversion.
    pub sea_level_hpa: f64,

    /// Where session statistics are persisted.
    pub statistics_path: PathBuf,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            hall_pin: 18,
            wheel_circumference_m: 1.0,
            sea_level_hpa: DEFAULT_SEA_LEVEL_HPA,
            statistics_path: PathBuf::from("data/statistics.json"),
        }
    }
}

/// Sensor channel identifiers used in health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Hall,
    Barometer,
    Thermometer,
    Accelerometer,
}

impl Channel {
    /// All channels, in reporting order.
    pub const ALL: [Channel; 4] = [
        Channel::Hall,
        Channel::Barometer,
        Channel::Thermometer,
        Channel::Accelerometer,
    ];

    /// Stable identifier used as the status map key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Hall => "hall",
            Channel::Barometer => "barometer",
            Channel::Thermometer => "thermometer",
            Channel::Accelerometer => "accelerometer",
        }
    }
}

/// Per-channel bookkeeping behind the health lock.
struct ChannelHealth {
    errored: bool,
    last_success: Instant,
}

/// Health report entry for one channel.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SensorStatus {
    /// True while reads succeed within the staleness window.
    pub healthy: bool,

    /// True if the most recent read attempt failed.
    pub error: bool,

    /// Seconds since the last successful read.
    pub time_since_last_read: f64,
}

/// Additive calibration offsets. Process lifetime only, never persisted.
#[derive(Debug, Default)]
struct CalibrationOffsets {
    speed_kmh: f64,
    altitude_m: f64,
    temperature_c: f64,
}

/// Owns the channels and statistics and serves the display layer.
///
/// Every method takes `&self`; the coordinator is built once by the
/// process entry point and shared behind an `Arc`.
pub struct SensorCoordinator {
    hall: HallSensor,
    barometer: Mutex<Barometer>,
    thermometer: Mutex<Thermometer>,
    accelerometer: Mutex<Accelerometer>,
    statistics: StatisticsTracker,
    offsets: Mutex<CalibrationOffsets>,
    health: Mutex<HashMap<Channel, ChannelHealth>>,
    source: DataSource,
}

impl SensorCoordinator {
    /// Probes the hardware and builds every channel.
    pub fn new(config: SensorConfig) -> Self {
        Self::with_probe(HardwareProbe::detect(), config)
    }

    /// Builds every channel against an explicit probe result.
    pub fn with_probe(probe: HardwareProbe, config: SensorConfig) -> Self {
        let source = probe.data_source();
        info!("Sensor data source: {}", source);

        let now = Instant::now();
        let health = Channel::ALL
            .iter()
            .map(|&channel| {
                (
                    channel,
                    ChannelHealth {
                        errored: false,
                        last_success: now,
                    },
                )
            })
            .collect();

        Self {
            hall: HallSensor::new(&probe, config.hall_pin, config.wheel_circumference_m),
            barometer: Mutex::new(Barometer::new(&probe, config.sea_level_hpa)),
            thermometer: Mutex::new(Thermometer::new(&probe)),
            accelerometer: Mutex::new(Accelerometer::new(&probe)),
            statistics: StatisticsTracker::new(&config.statistics_path),
            offsets: Mutex::new(CalibrationOffsets::default()),
            health: Mutex::new(health),
            source,
        }
    }

    /// Current speed in km/h, clamped to zero after calibration.
    ///
    /// Feeds the speed and distance statistics as a side effect; the
    /// display layer's polling is what drives the aggregates.
    pub fn get_speed_kmh(&self) -> f64 {
        let offset = self.offsets.lock().unwrap().speed_kmh;
        let speed = (self.hall.speed_kmh() + offset).max(0.0);
        self.mark_ok(Channel::Hall);

        self.statistics.update_speed(speed);
        self.statistics.update_distance(speed);

        speed
    }

    /// Altitude above sea level in meters.
    pub fn get_altitude_m(&self) -> f64 {
        let offset = self.offsets.lock().unwrap().altitude_m;
        let mut barometer = self.barometer.lock().unwrap();
        match barometer.read() {
            Ok(altitude) => {
                self.mark_ok(Channel::Barometer);
                altitude + offset
            }
            Err(e) => {
                self.mark_errored(Channel::Barometer);
                warn!("Altitude read failed: {}", e);
                barometer.last_good().value + offset
            }
        }
    }

    /// Ambient temperature in °C.
    pub fn get_temperature_c(&self) -> f64 {
        let offset = self.offsets.lock().unwrap().temperature_c;
        let mut thermometer = self.thermometer.lock().unwrap();
        match thermometer.read() {
            Ok(temperature) => {
                self.mark_ok(Channel::Thermometer);
                temperature + offset
            }
            Err(e) => {
                self.mark_errored(Channel::Thermometer);
                warn!("Temperature read failed: {}", e);
                thermometer.last_good().value + offset
            }
        }
    }

    /// Acceleration in g on (x, y, z); z sits near 1 at rest.
    ///
    /// Feeds the cornering and braking force statistics on success.
    pub fn get_acceleration_g(&self) -> (f64, f64, f64) {
        let mut accelerometer = self.accelerometer.lock().unwrap();
        match accelerometer.read() {
            Ok((x, y, z)) => {
                self.mark_ok(Channel::Accelerometer);
                self.statistics.update_acceleration(x, y, z);
                (x, y, z)
            }
            Err(e) => {
                self.mark_errored(Channel::Accelerometer);
                warn!("Acceleration read failed: {}", e);
                // 1 g straight down, the at-rest reading.
                (0.0, 0.0, 1.0)
            }
        }
    }

    /// Health of every channel, derived fresh at call time.
    pub fn get_sensor_status(&self) -> HashMap<&'static str, SensorStatus> {
        let health = self.health.lock().unwrap();
        health
            .iter()
            .map(|(channel, entry)| {
                let elapsed = entry.last_success.elapsed().as_secs_f64();
                (
                    channel.as_str(),
                    SensorStatus {
                        healthy: !entry.errored && elapsed < ERROR_TIMEOUT_SECS,
                        error: entry.errored,
                        time_since_last_read: elapsed,
                    },
                )
            })
            .collect()
    }

    /// Whether values come from hardware or simulation this run.
    pub fn get_data_source(&self) -> DataSource {
        self.source
    }

    /// Current session statistics.
    pub fn get_statistics(&self) -> StatisticsSnapshot {
        self.statistics.snapshot()
    }

    /// Clears the session statistics and restarts the session clock.
    pub fn reset_statistics(&self) {
        self.statistics.reset();
        info!("Session statistics reset");
    }

    /// Raw pulse count from the wheel sensor, for diagnostics.
    pub fn pulse_count(&self) -> u64 {
        self.hall.pulse_count()
    }

    /// Calibrates speed against a trusted reference value.
    pub fn calibrate_speed(&self, known_kmh: f64) {
        let raw = self.hall.speed_kmh();
        let mut offsets = self.offsets.lock().unwrap();
        offsets.speed_kmh = known_kmh - raw;
        info!("Speed offset set to {:.2} km/h", offsets.speed_kmh);
    }

    /// Calibrates altitude against a trusted reference value.
    pub fn calibrate_altitude(&self, known_m: f64) {
        let raw = {
            let mut barometer = self.barometer.lock().unwrap();
            match barometer.read() {
                Ok(altitude) => altitude,
                Err(_) => barometer.last_good().value,
            }
        };
        let mut offsets = self.offsets.lock().unwrap();
        offsets.altitude_m = known_m - raw;
        info!("Altitude offset set to {:.1} m", offsets.altitude_m);
    }

    /// Calibrates temperature against a trusted reference value.
    pub fn calibrate_temperature(&self, known_c: f64) {
        let raw = {
            let mut thermometer = self.thermometer.lock().unwrap();
            match thermometer.read() {
                Ok(temperature) => temperature,
                Err(_) => thermometer.last_good().value,
            }
        };
        let mut offsets = self.offsets.lock().unwrap();
        offsets.temperature_c = known_c - raw;
        info!("Temperature offset set to {:.1} °C", offsets.temperature_c);
    }

    /// Releases hardware held by the channels. Idempotent.
    pub fn cleanup(&self) {
        self.hall.stop();
    }

    fn mark_ok(&self, channel: Channel) {
        let mut health = self.health.lock().unwrap();
        if let Some(entry) = health.get_mut(&channel) {
            entry.errored = false;
            entry.last_success = Instant::now();
        }
    }

    fn mark_errored(&self, channel: Channel) {
        let mut health = self.health.lock().unwrap();
        if let Some(entry) = health.get_mut(&channel) {
            entry.errored = true;
        }
    }
}
