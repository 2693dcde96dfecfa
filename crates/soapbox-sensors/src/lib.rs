//! Soapbox Sensors Library
//!
//! Sensor acquisition and session statistics for a soapbox telemetry rig:
//! wheel-rotation speed, barometric altitude, temperature, and 3-axis
//! acceleration. Channels fall back to simulated signals when hardware is
//! absent, so the same stack runs on the cart and on a bench.

pub mod channels;
pub mod coordinator;
pub mod error;
pub mod hardware;
pub mod reading;
pub mod statistics;

pub use coordinator::{Channel, SensorConfig, SensorCoordinator, SensorStatus};
pub use error::{Error, Result};
pub use hardware::{DataSource, HardwareProbe};
pub use reading::{epoch_secs, Reading};
pub use statistics::{StatisticsSnapshot, StatisticsTracker};

use std::time::Duration;

/// Seconds without a successful read before a channel reports unhealthy.
pub const ERROR_TIMEOUT_SECS: f64 = 5.0;

/// Interval between simulated wheel pulses.
pub const SIM_PULSE_INTERVAL: Duration = Duration::from_millis(100);

/// Standard sea-level pressure in hPa, the default altitude reference.
pub const DEFAULT_SEA_LEVEL_HPA: f64 = 1013.25;

/// Standard gravity in m/s², for converting accelerometer output to g.
pub const GRAVITY_MS2: f64 = 9.81;
