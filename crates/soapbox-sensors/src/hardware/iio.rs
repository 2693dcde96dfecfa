//! Industrial I/O sysfs devices.
//!
//! I2C sensors show up under /sys/bus/iio/devices as iio:deviceN
//! directories with one text attribute per channel. Discovery matches the
//! name attribute against a candidate list; reads are plain attribute-file
//! parses.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::hardware::IIO_BUS;

/// A discovered IIO device directory.
pub struct IioDevice {
    path: PathBuf,
    name: String,
}

impl IioDevice {
    /// Finds the first IIO device whose name matches one of `names`.
    pub fn find_by_name(names: &[&str]) -> Result<Self> {
        for entry in fs::read_dir(IIO_BUS)? {
            let entry = entry?;
            let path = entry.path();
            if let Ok(name) = fs::read_to_string(path.join("name")) {
                let name = name.trim().to_string();
                if names.iter().any(|n| name.contains(n)) {
                    return Ok(Self { path, name });
                }
            }
        }
        Err(Error::IioNotFound(names.join(", ")))
    }

    /// The kernel-reported device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads a sysfs attribute and parses it as a float.
    pub fn read_attr(&self, attr: &str) -> Result<f64> {
        read_f64_attr(&self.path.join(attr))
    }
}

/// Reads a whitespace-padded float from a sysfs attribute file.
fn read_f64_attr(path: &Path) -> Result<f64> {
    let raw = fs::read_to_string(path)?;
    raw.trim().parse().map_err(|_| Error::MalformedAttribute {
        attr: path.display().to_string(),
        raw: raw.trim().to_string(),
    })
}
