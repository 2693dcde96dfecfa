//! Session statistics.
//!
//! Running aggregates derived from raw readings: top speed, accumulated
//! distance, and peak cornering and braking forces. Every mutation persists
//! to a JSON file; when the disk is not cooperating the in-memory state
//! stays authoritative and the failure is only logged.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use tracing::{debug, warn};

use crate::reading::epoch_secs;

/// Point-in-time view of the session statistics.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatisticsSnapshot {
    pub max_speed_kmh: f64,
    pub total_distance_km: f64,
    pub max_cornering_force_g: f64,
    pub max_braking_force_g: f64,
    pub session_duration_hours: f64,
}

/// On-disk statistics layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedStatistics {
    #[serde(default)]
    max_speed_kmh: f64,
    #[serde(default)]
    total_distance_km: f64,
    #[serde(default)]
    max_cornering_force_g: f64,
    #[serde(default)]
    max_braking_force_g: f64,
    #[serde(default)]
    last_updated: f64,
}

/// Aggregate state behind the tracker lock.
///
/// The session clock and the distance reference instant are process
/// lifetime only; they are never persisted.
struct StatsState {
    max_speed_kmh: f64,
    total_distance_km: f64,
    max_cornering_force_g: f64,
    max_braking_force_g: f64,
    session_start: Instant,
    last_update: Instant,
}

/// Tracks and persists session statistics.
///
/// One lock covers each compute-compare-persist sequence, so max tracking
/// stays atomic per update call.
pub struct StatisticsTracker {
    path: PathBuf,
    inner: Mutex<StatsState>,
}

impl StatisticsTracker {
    /// Creates a tracker backed by `path`, loading any persisted maxima.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let persisted = Self::load(&path);
        let now = Instant::now();
        Self {
            path,
            inner: Mutex::new(StatsState {
                max_speed_kmh: persisted.max_speed_kmh,
                total_distance_km: persisted.total_distance_km,
                max_cornering_force_g: persisted.max_cornering_force_g,
                max_braking_force_g: persisted.max_braking_force_g,
                session_start: now,
                last_update: now,
            }),
        }
    }

    /// Loads persisted statistics, defaulting to zeroes on any problem.
    fn load(path: &Path) -> PersistedStatistics {
        if let Ok(content) = std::fs::read_to_string(path) {
            match serde_json::from_str(&content) {
                Ok(persisted) => return persisted,
                Err(e) => {
                    warn!("Statistics file {:?} is corrupt ({}), starting fresh", path, e);
                }
            }
        }
        PersistedStatistics::default()
    }

    /// Writes the current aggregates to disk. Failures are logged, never
    /// propagated; the in-memory state remains authoritative.
    fn save(&self, state: &StatsState) {
        let persisted = PersistedStatistics {
            max_speed_kmh: state.max_speed_kmh,
            total_distance_km: state.total_distance_km,
            max_cornering_force_g: state.max_cornering_force_g,
            max_braking_force_g: state.max_braking_force_g,
            last_updated: epoch_secs(),
        };

        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match serde_json::to_string_pretty(&persisted) {
            Ok(content) => {
                if let Err(e) = std::fs::write(&self.path, content) {
                    warn!("Failed to save statistics: {}", e);
                }
            }
            Err(e) => {
                warn!("Failed to serialize statistics: {}", e);
            }
        }
    }

    /// Folds a speed sample into the session maximum.
    pub fn update_speed(&self, speed_kmh: f64) {
        let mut state = self.inner.lock().unwrap();
        if speed_kmh > state.max_speed_kmh {
            state.max_speed_kmh = speed_kmh;
            self.save(&state);
        }
    }

    /// Accumulates distance from the time elapsed since the previous call.
    pub fn update_distance(&self, speed_kmh: f64) {
        self.update_distance_at(speed_kmh, Instant::now());
    }

    /// Distance update against an explicit clock.
    fn update_distance_at(&self, speed_kmh: f64, now: Instant) {
        let mut state = self.inner.lock().unwrap();
        let dt = now.duration_since(state.last_update).as_secs_f64();

        if dt > 0.0 && speed_kmh > 0.0 {
            state.total_distance_km += speed_kmh * dt / 3600.0;
            self.save(&state);
        }

        // The reference instant advances even at standstill so idle time
        // never counts toward the next delta.
        state.last_update = now;
    }

    /// Folds an acceleration sample into the force maxima.
    pub fn update_acceleration(&self, x_g: f64, y_g: f64, z_g: f64) {
        let mut state = self.inner.lock().unwrap();
        let mut dirty = false;

        // Cornering force is the horizontal magnitude.
        let cornering = x_g.hypot(y_g);
        if cornering > state.max_cornering_force_g {
            state.max_cornering_force_g = cornering;
            dirty = true;
        }

        // Braking shows up as vertical acceleration dipping below 1 g.
        let braking = (z_g - 1.0).min(0.0).abs();
        if braking > state.max_braking_force_g {
            state.max_braking_force_g = braking;
            dirty = true;
        }

        if dirty {
            self.save(&state);
        }
    }

    /// Returns a consistent snapshot of the session statistics.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let state = self.inner.lock().unwrap();
        StatisticsSnapshot {
            max_speed_kmh: state.max_speed_kmh,
            total_distance_km: state.total_distance_km,
            max_cornering_force_g: state.max_cornering_force_g,
            max_braking_force_g: state.max_braking_force_g,
            session_duration_hours: state.session_start.elapsed().as_secs_f64() / 3600.0,
        }
    }

    /// Zeroes all aggregates and restarts the session clock.
    pub fn reset(&self) {
        let mut state = self.inner.lock().unwrap();
        let now = Instant::now();
        state.max_speed_kmh = 0.0;
        state.total_distance_km = 0.0;
        state.max_cornering_force_g = 0.0;
        state.max_braking_force_g = 0.0;
        state.session_start = now;
        state.last_update = now;
        self.save(&state);
        debug!("Statistics reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn temp_stats_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("soapbox-stats-{}-{}.json", tag, std::process::id()))
    }

    #[test]
    fn test_max_speed_is_monotonic() {
        let path = temp_stats_path("max-speed");
        let _ = std::fs::remove_file(&path);

        let tracker = StatisticsTracker::new(&path);
        for speed in [10.0, 50.0, 30.0, 50.0, 5.0] {
            tracker.update_speed(speed);
        }
        assert_eq!(tracker.snapshot().max_speed_kmh, 50.0);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_distance_accumulation() {
        let path = temp_stats_path("distance");
        let _ = std::fs::remove_file(&path);

        let tracker = StatisticsTracker::new(&path);
        let t0 = Instant::now();

        // Pin the reference instant.
        tracker.update_distance_at(0.0, t0);
        assert_eq!(tracker.snapshot().total_distance_km, 0.0);

        // 36 km/h for 2 s is 20 m.
        tracker.update_distance_at(36.0, t0 + Duration::from_secs(2));
        let distance = tracker.snapshot().total_distance_km;
        assert!((distance - 0.02).abs() < 1e-9, "distance was {}", distance);

        // Standing still adds nothing but advances the reference, so the
        // next moving interval only counts its own second.
        tracker.update_distance_at(0.0, t0 + Duration::from_secs(4));
        tracker.update_distance_at(36.0, t0 + Duration::from_secs(5));
        let distance = tracker.snapshot().total_distance_km;
        assert!((distance - 0.03).abs() < 1e-9, "distance was {}", distance);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_acceleration_forces() {
        let path = temp_stats_path("forces");
        let _ = std::fs::remove_file(&path);

        let tracker = StatisticsTracker::new(&path);

        // Lateral magnitude of a 3-4-5 triangle, and a 0.05 g dip below 1 g.
        tracker.update_acceleration(0.03, 0.04, 0.95);
        let stats = tracker.snapshot();
        assert!((stats.max_cornering_force_g - 0.05).abs() < 1e-12);
        assert!((stats.max_braking_force_g - 0.05).abs() < 1e-12);

        // Vertical acceleration above 1 g is not braking.
        tracker.update_acceleration(0.0, 0.0, 1.2);
        assert!((tracker.snapshot().max_braking_force_g - 0.05).abs() < 1e-12);

        // Smaller samples never lower the maxima.
        tracker.update_acceleration(0.01, 0.01, 0.99);
        let stats = tracker.snapshot();
        assert!((stats.max_cornering_force_g - 0.05).abs() < 1e-12);
        assert!((stats.max_braking_force_g - 0.05).abs() < 1e-12);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let path = temp_stats_path("reset");
        let _ = std::fs::remove_file(&path);

        let tracker = StatisticsTracker::new(&path);
        tracker.update_speed(80.0);
        tracker.update_acceleration(0.5, 0.5, 0.5);
        tracker.reset();

        let stats = tracker.snapshot();
        assert_eq!(stats.max_speed_kmh, 0.0);
        assert_eq!(stats.total_distance_km, 0.0);
        assert_eq!(stats.max_cornering_force_g, 0.0);
        assert_eq!(stats.max_braking_force_g, 0.0);
        assert!(stats.session_duration_hours < 0.001);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_persistence_round_trip() {
        let path = temp_stats_path("round-trip");
        let _ = std::fs::remove_file(&path);

        {
            let tracker = StatisticsTracker::new(&path);
            tracker.update_speed(42.5);
            tracker.update_acceleration(0.3, 0.4, 0.8);
        }

        let tracker = StatisticsTracker::new(&path);
        let stats = tracker.snapshot();
        assert_eq!(stats.max_speed_kmh, 42.5);
        assert!((stats.max_cornering_force_g - 0.5).abs() < 1e-12);
        assert!((stats.max_braking_force_g - 0.2).abs() < 1e-12);
        // The session clock starts over with each process.
        assert!(stats.session_duration_hours < 0.001);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_persisted_layout() {
        let path = temp_stats_path("layout");
        let _ = std::fs::remove_file(&path);

        let tracker = StatisticsTracker::new(&path);
        tracker.update_speed(12.0);

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["max_speed_kmh"], 12.0);
        assert_eq!(value["total_distance_km"], 0.0);
        assert_eq!(value["max_cornering_force_g"], 0.0);
        assert_eq!(value["max_braking_force_g"], 0.0);
        assert!(value["last_updated"].as_f64().unwrap() > 0.0);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let path = temp_stats_path("corrupt");
        std::fs::write(&path, "{not json!").unwrap();

        let tracker = StatisticsTracker::new(&path);
        let stats = tracker.snapshot();
        assert_eq!(stats.max_speed_kmh, 0.0);
        assert_eq!(stats.total_distance_km, 0.0);

        // The next mutation rewrites a valid file.
        tracker.update_speed(10.0);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&content).is_ok());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_stats_path("partial");
        std::fs::write(&path, r#"{"max_speed_kmh": 33.0}"#).unwrap();

        let tracker = StatisticsTracker::new(&path);
        let stats = tracker.snapshot();
        assert_eq!(stats.max_speed_kmh, 33.0);
        assert_eq!(stats.total_distance_km, 0.0);
        assert_eq!(stats.max_braking_force_g, 0.0);

        let _ = std::fs::remove_file(&path);
    }
}
