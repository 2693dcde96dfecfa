//! Ambient temperature channel.

use rand::Rng;
use std::time::Instant;
use tracing::{info, warn};

use crate::error::Result;
use crate::hardware::{HardwareProbe, IioDevice};
use crate::reading::Reading;

/// IIO driver names that expose a usable temperature channel. The pressure
/// sensor doubles as the thermometer on this rig.
const TEMPERATURE_DEVICES: &[&str] = &["bmp280", "bme280"];

/// Base temperature of the simulated signal in °C.
const SIM_BASE_TEMPERATURE_C: f64 = 25.0;

/// Temperature signal source.
pub trait TemperatureSource: Send {
    /// Current ambient temperature in °C.
    fn read_temperature_c(&mut self) -> Result<f64>;
}

/// Temperature sensor on the IIO bus.
struct IioThermometer {
    device: IioDevice,
}

impl IioThermometer {
    fn open() -> Result<Self> {
        let device = IioDevice::find_by_name(TEMPERATURE_DEVICES)?;
        Ok(Self { device })
    }

    fn name(&self) -> &str {
        self.device.name()
    }
}

impl TemperatureSource for IioThermometer {
    fn read_temperature_c(&mut self) -> Result<f64> {
        // in_temp_input is millidegrees Celsius in the IIO ABI.
        let milli = self.device.read_attr("in_temp_input")?;
        Ok(milli / 1000.0)
    }
}

/// Synthetic temperature: slow sinusoidal drift around a base, plus noise.
struct SimulatedTemperature {
    start: Instant,
}

impl SimulatedTemperature {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl TemperatureSource for SimulatedTemperature {
    fn read_temperature_c(&mut self) -> Result<f64> {
        let t = self.start.elapsed().as_secs_f64();
        let drift = (t * 0.05).sin() * 2.0;
        let noise = rand::thread_rng().gen_range(-0.3..0.3);
        Ok(SIM_BASE_TEMPERATURE_C + drift + noise)
    }
}

/// Ambient temperature channel.
///
/// Keeps the last successful reading so the coordinator has a fallback
/// value when a read fails.
pub struct Thermometer {
    source: Box<dyn TemperatureSource>,
    last_good: Reading,
    simulated: bool,
}

impl Thermometer {
    /// Builds the channel, preferring a real temperature sensor when the
    /// probe found the IIO bus.
    pub fn new(probe: &HardwareProbe) -> Self {
        if probe.iio {
            match IioThermometer::open() {
                Ok(source) => {
                    info!("Temperature sensor found: {}", source.name());
                    return Self::with_source(Box::new(source), false);
                }
                Err(e) => {
                    warn!("Temperature sensor unavailable: {}. Running simulated.", e);
                }
            }
        }
        Self::with_source(Box::new(SimulatedTemperature::new()), true)
    }

    pub(crate) fn with_source(source: Box<dyn TemperatureSource>, simulated: bool) -> Self {
        Self {
            source,
            // Room temperature stands in until the first real reading.
            last_good: Reading {
                value: SIM_BASE_TEMPERATURE_C,
                timestamp: 0.0,
                unit: "°C",
            },
            simulated,
        }
    }

    /// Reads the current temperature, recording it as last known-good.
    pub fn read(&mut self) -> Result<f64> {
        let temperature = self.source.read_temperature_c()?;
        self.last_good = Reading::now(temperature, "°C");
        Ok(temperature)
    }

    /// Most recent successful reading; room temperature before any success.
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
    fn test_simulated_temperature_envelope() {
        let mut thermometer = Thermometer::new(&HardwareProbe::none());
        assert!(thermometer.is_simulated());

        for _ in 0..50 {
            let temp = thermometer.read().unwrap();
            assert!(
                temp > 22.5 && temp < 27.5,
                "temperature out of envelope: {}",
                temp
            );
        }
    }

    #[test]
    fn test_last_good_starts_at_room_temperature() {
        let thermometer = Thermometer::new(&HardwareProbe::none());
        assert_eq!(thermometer.last_good().value, 25.0);
        assert_eq!(thermometer.last_good().unit, "°C");
    }
}
