//! 3-axis acceleration channel.

use rand::Rng;
use std::time::Instant;
use tracing::{info, warn};

use crate::error::Result;
use crate::hardware::{HardwareProbe, IioDevice};
use crate::GRAVITY_MS2;

/// IIO driver names for the accelerometer family.
const ACCEL_DEVICES: &[&str] = &["adxl345", "adxl343"];

/// Acceleration signal source.
pub trait AccelerationSource: Send {
    /// Current acceleration in g on (x, y, z); z sits near 1 at rest.
    fn read_acceleration_g(&mut self) -> Result<(f64, f64, f64)>;
}

/// Accelerometer on the IIO bus.
struct IioAccelerometer {
    device: IioDevice,
    scale: f64,
}

impl IioAccelerometer {
    fn open() -> Result<Self> {
        let device = IioDevice::find_by_name(ACCEL_DEVICES)?;
        // The scale attribute converts raw counts to m/s² and is fixed
        // per range setting, so one read at open is enough.
        let scale = device.read_attr("in_accel_scale")?;
        Ok(Self { device, scale })
    }

    fn name(&self) -> &str {
        self.device.name()
    }

    fn read_axis_g(&self, attr: &str) -> Result<f64> {
        let raw = self.device.read_attr(attr)?;
        Ok(raw * self.scale / GRAVITY_MS2)
    }
}

impl AccelerationSource for IioAccelerometer {
    fn read_acceleration_g(&mut self) -> Result<(f64, f64, f64)> {
        let x = self.read_axis_g("in_accel_x_raw")?;
        let y = self.read_axis_g("in_accel_y_raw")?;
        let z = self.read_axis_g("in_accel_z_raw")?;
        Ok((x, y, z))
    }
}

/// Synthetic acceleration: small oscillations around rest, plus noise.
struct SimulatedAcceleration {
    start: Instant,
}

impl SimulatedAcceleration {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl AccelerationSource for SimulatedAcceleration {
    fn read_acceleration_g(&mut self) -> Result<(f64, f64, f64)> {
        let t = self.start.elapsed().as_secs_f64();
        let mut rng = rand::thread_rng();
        let x = 0.1 * (t * 0.5).sin() + rng.gen_range(-0.02..0.02);
        let y = 0.05 * (t * 0.3).cos() + rng.gen_range(-0.02..0.02);
        let z = 1.0 + 0.02 * (t * 0.2).sin() + rng.gen_range(-0.02..0.02);
        Ok((x, y, z))
    }
}

/// 3-axis acceleration channel.
pub struct Accelerometer {
    source: Box<dyn AccelerationSource>,
    simulated: bool,
}

impl Accelerometer {
    /// Builds the channel, preferring a real accelerometer when the probe
    /// found the IIO bus.
    pub fn new(probe: &HardwareProbe) -> Self {
        if probe.iio {
            match IioAccelerometer::open() {
                Ok(source) => {
                    info!("Accelerometer found: {}", source.name());
                    return Self::with_source(Box::new(source), false);
                }
                Err(e) => {
                    warn!("Accelerometer unavailable: {}. Running simulated.", e);
                }
            }
        }
        Self::with_source(Box::new(SimulatedAcceleration::new()), true)
    }

    pub(crate) fn with_source(source: Box<dyn AccelerationSource>, simulated: bool) -> Self {
        Self { source, simulated }
    }

    /// Reads the current acceleration in g on (x, y, z).
    pub fn read(&mut self) -> Result<(f64, f64, f64)> {
        self.source.read_acceleration_g()
    }

    /// True when this channel runs on a simulated source.
    pub fn is_simulated(&self) -> bool {
        self.simulated
    }
}
