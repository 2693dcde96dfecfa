//! Error types for the sensor hardware layer.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to sensor hardware.
#[derive(Error, Debug)]
pub enum Error {
    /// No IIO device matched any of the expected names.
    #[error("IIO device not found (looked for: {0})")]
    IioNotFound(String),

    /// GPIO line could not be claimed through sysfs.
    #[error("GPIO line {0} unavailable")]
    GpioUnavailable(u32),

    /// Raw I/O error from a device attribute.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A sysfs attribute did not contain a number.
    #[error("Malformed attribute {attr}: {raw:?}")]
    MalformedAttribute { attr: String, raw: String },
}
