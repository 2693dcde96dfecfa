//! Sensor channels.
//!
//! One channel per physical signal. Construction is capability checked: a
//! channel wraps its real driver when the startup probe found hardware and
//! falls back to a simulated source otherwise, permanently for the life of
//! the process.

mod accelerometer;
mod barometer;
mod hall;
mod thermometer;

pub use accelerometer::{AccelerationSource, Accelerometer};
pub use barometer::{pressure_to_altitude, AltitudeSource, Barometer};
pub use hall::HallSensor;
pub use thermometer::{TemperatureSource, Thermometer};
