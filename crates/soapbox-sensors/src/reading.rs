//! Timestamped sensor samples.

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// A single sensor sample with its unit and wall-clock timestamp.
///
/// Readings are immutable; a fresh sample replaces the previous one
/// wholesale.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Reading {
    /// Measured value, in `unit`.
    pub value: f64,

    /// Wall-clock time of the sample, seconds since the Unix epoch.
    pub timestamp: f64,

    /// Unit of measurement.
    pub unit: &'static str,
}

impl Reading {
    /// Creates a reading stamped with the current wall-clock time.
    pub fn now(value: f64, unit: &'static str) -> Self {
        Self {
            value,
            timestamp: epoch_secs(),
            unit,
        }
    }
}

/// Current wall-clock time as fractional seconds since the Unix epoch.
pub fn epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
