//! Hardware capability probing.
//!
//! Availability of the GPIO and IIO subsystems is checked once at startup.
//! Every channel is then built against real hardware or a simulated source
//! and never switches for the lifetime of the process.

mod gpio;
mod iio;

pub use gpio::GpioLine;
pub use iio::IioDevice;

use std::fmt;
use std::path::Path;

/// Sysfs root for the GPIO class interface.
pub(crate) const GPIO_CLASS: &str = "/sys/class/gpio";

/// Sysfs root for Industrial I/O devices.
pub(crate) const IIO_BUS: &str = "/sys/bus/iio/devices";

/// Result of the one-time hardware availability check.
#[derive(Debug, Clone, Copy)]
pub struct HardwareProbe {
    /// GPIO subsystem present (wheel pulse input).
    pub gpio: bool,

    /// IIO subsystem present (pressure, temperature, acceleration).
    pub iio: bool,
}

impl HardwareProbe {
    /// Probes the running kernel for sensor subsystems.
    pub fn detect() -> Self {
        Self {
            gpio: Path::new(GPIO_CLASS).is_dir(),
            iio: Path::new(IIO_BUS).is_dir(),
        }
    }

    /// A probe reporting no hardware, forcing simulated channels.
    pub fn none() -> Self {
        Self {
            gpio: false,
            iio: false,
        }
    }

    /// The process-lifetime data source implied by this probe.
    pub fn data_source(&self) -> DataSource {
        if self.gpio && self.iio {
            DataSource::RealSensors
        } else {
            DataSource::DemoMode
        }
    }
}

/// Where displayed values come from for this process run.
///
/// Decided once by the startup probe. A device failing later shows up in
/// the per-channel health status instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Both sensor subsystems were present at startup.
    RealSensors,
    /// At least one subsystem was missing; simulated values are in play.
    DemoMode,
}

impl DataSource {
    /// Returns the string shown on the dashboard.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::RealSensors => "Real Sensors",
            DataSource::DemoMode => "Demo Mode",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_strings() {
        assert_eq!(DataSource::RealSensors.as_str(), "Real Sensors");
        assert_eq!(DataSource::DemoMode.as_str(), "Demo Mode");
        assert_eq!(DataSource::DemoMode.to_string(), "Demo Mode");
    }

    #[test]
    fn test_probe_none_is_demo_mode() {
        let probe = HardwareProbe::none();
        assert!(!probe.gpio);
        assert!(!probe.iio);
        assert_eq!(probe.data_source(), DataSource::DemoMode);
    }

    #[test]
    fn test_partial_hardware_is_demo_mode() {
        let probe = HardwareProbe {
            gpio: true,
            iio: false,
        };
        assert_eq!(probe.data_source(), DataSource::DemoMode);

        let probe = HardwareProbe {
            gpio: true,
            iio: true,
        };
        assert_eq!(probe.data_source(), DataSource::RealSensors);
    }
}
