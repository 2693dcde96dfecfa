//! Barometric altitude channel.

use rand::Rng;
use std::time::Instant;
use tracing::{info, warn};

use crate::error::Result;
use crate::hardware::{HardwareProbe, IioDevice};
use crate::reading::Reading;

/// IIO driver names that expose a usable pressure channel.
const PRESSURE_DEVICES: &[&str] = &["bmp280", "bme280"];

/// Base altitude of the simulated signal in meters.
const SIM_BASE_ALTITUDE_M: f64 = 120.0;

/// Altitude signal source.
pub trait AltitudeSource: Send {
    /// Current altitude above sea level in meters.
    fn read_altitude_m(&mut self) -> Result<f64>;
}

/// Converts barometric pressure to altitude.
///
/// International barometric formula with a configurable sea-level
/// reference.
pub fn pressure_to_altitude(pressure_hpa: f64, sea_level_hpa: f64) -> f64 {
    44330.0 * (1.0 - (pressure_hpa / sea_level_hpa).powf(0.1903))
}

/// Pressure sensor on the IIO bus.
struct IioBarometer {
    device: IioDevice,
    sea_level_hpa: f64,
}

impl IioBarometer {
    fn open(sea_level_hpa: f64) -> Result<Self> {
        let device = IioDevice::find_by_name(PRESSURE_DEVICES)?;
        Ok(Self {
            device,
            sea_level_hpa,
        })
    }

    fn name(&self) -> &str {
        self.device.name()
    }
}

impl AltitudeSource for IioBarometer {
    fn read_altitude_m(&mut self) -> Result<f64> {
        // in_pressure_input is kilopascals in the IIO ABI.
        let kpa = self.device.read_attr("in_pressure_input")?;
        Ok(pressure_to_altitude(kpa * 10.0, self.sea_level_hpa))
    }
}

/// Synthetic altitude: slow sinusoidal drift around a base, plus noise.
struct SimulatedAltitude {
    start: Instant,
}

impl SimulatedAltitude {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl AltitudeSource for SimulatedAltitude {
    fn read_altitude_m(&mut self) -> Result<f64> {
        let t = self.start.elapsed().as_secs_f64();
        let drift = (t * 0.1).sin() * 5.0;
        let noise = rand::thread_rng().gen_range(-0.5..0.5);
        Ok(SIM_BASE_ALTITUDE_M + drift + noise)
    }
}

/// Barometric altitude channel.
///
/// Keeps the last successful reading so the coordinator has a fallback
/// value when a read fails.
pub struct Barometer {
    source: Box<dyn AltitudeSource>,
    last_good: Reading,
    simulated: bool,
}

impl Barometer {
    /// Builds the channel, preferring a real pressure sensor when the
    /// probe found the IIO bus.
    pub fn new(probe: &HardwareProbe, sea_level_hpa: f64) -> Self {
        if probe.iio {
            match IioBarometer::open(sea_level_hpa) {
                Ok(source) => {
                    info!("Pressure sensor found: {}", source.name());
                    return Self::with_source(Box::new(source), false);
                }
                Err(e) => {
                    warn!("Pressure sensor unavailable: {}. Running simulated.", e);
                }
            }
        }
        Self::with_source(Box::new(SimulatedAltitude::new()), true)
    }

    pub(crate) fn with_source(source: Box<dyn AltitudeSource>, simulated: bool) -> Self {
        Self {
            source,
            last_good: Reading {
                value: 0.0,
                timestamp: 0.0,
                unit: "m",
            },
            simulated,
        }
    }

    /// Reads the current altitude, recording it as last known-good.
    pub fn read(&mut self) -> Result<f64> {
        let altitude = self.source.read_altitude_m()?;
        self.last_good = Reading::now(altitude, "m");
        Ok(altitude)
    }

    /// Most recent successful reading; zero-valued before any success.
    pub fn last_good(&self) -> Reading {
        self.last_good
    }

    /// True when this channel runs on a simulated source.
    pub fn is_simulated(&self) -> bool {
        self.simulated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressure_to_altitude_at_reference() {
        assert!(pressure_to_altitude(1013.25, 1013.25).abs() < 1e-9);
    }

    #[test]
    fn test_pressure_to_altitude_tropopause() {
        // 226.32 hPa is the standard-atmosphere pressure near 11 km.
        let alt = pressure_to_altitude(226.32, 1013.25);
        assert!((alt - 11000.0).abs() < 50.0, "altitude was {}", alt);
    }

    #[test]
    fn test_pressure_to_altitude_monotonic() {
        let low = pressure_to_altitude(1000.0, 1013.25);
        let high = pressure_to_altitude(900.0, 1013.25);
        assert!(high > low);
    }

    #[test]
    fn test_simulated_altitude_envelope() {
        let mut barometer = Barometer::new(&HardwareProbe::none(), 1013.25);
        assert!(barometer.is_simulated());

        for _ in 0..50 {
            let alt = barometer.read().unwrap();
            assert!(alt > 114.0 && alt < 126.0, "altitude out of envelope: {}", alt);
        }
        assert!(barometer.last_good().value > 114.0);
        assert_eq!(barometer.last_good().unit, "m");
    }

    #[test]
    fn test_last_good_starts_at_zero() {
        let barometer = Barometer::new(&HardwareProbe::none(), 1013.25);
        assert_eq!(barometer.last_good().value, 0.0);
        assert_eq!(barometer.last_good().timestamp, 0.0);
    }
}
