//! Wheel rotation speed channel.
//!
//! Speed is derived from the time between pulses of a hall-effect sensor,
//! one pulse per wheel revolution: speed = circumference / Δt. A background
//! worker supplies the pulses, either from GPIO edges or from a fixed-period
//! simulated ticker, and the polled reads just take the current value.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::hardware::{GpioLine, HardwareProbe};
use crate::SIM_PULSE_INTERVAL;

/// Poll timeout for the GPIO edge wait; bounds shutdown latency.
const EDGE_WAIT: Duration = Duration::from_millis(200);

/// Pulse-derived state shared with the worker thread.
#[derive(Debug, Default)]
struct PulseState {
    speed_kmh: f64,
    pulse_count: u64,
    last_pulse: Option<Instant>,
}

impl PulseState {
    /// Records one wheel revolution and refreshes the derived speed.
    fn record_pulse(&mut self, circumference_m: f64, at: Instant) {
        if let Some(last) = self.last_pulse {
            let dt = at.duration_since(last).as_secs_f64();
            if dt > 0.0 {
                // Meters per second over one revolution, converted to km/h.
                self.speed_kmh = circumference_m / dt * 3.6;
            }
        }
        self.last_pulse = Some(at);
        self.pulse_count += 1;
    }
}

/// Wheel speed channel fed by pulse events.
pub struct HallSensor {
    state: Arc<Mutex<PulseState>>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    pin: Mutex<Option<u32>>,
    simulated: bool,
}

impl HallSensor {
    /// Builds the channel, claiming the GPIO line when the probe found the
    /// subsystem.
    pub fn new(probe: &HardwareProbe, pin: u32, circumference_m: f64) -> Self {
        let state = Arc::new(Mutex::new(PulseState::default()));
        let running = Arc::new(AtomicBool::new(true));

        if probe.gpio {
            match GpioLine::export_input(pin) {
                Ok(line) => {
                    info!("Hall sensor on GPIO {}", pin);
                    let worker =
                        spawn_edge_worker(line, state.clone(), running.clone(), circumference_m);
                    return Self {
                        state,
                        running,
                        worker: Mutex::new(Some(worker)),
                        pin: Mutex::new(Some(pin)),
                        simulated: false,
                    };
                }
                Err(e) => {
                    warn!("Hall sensor unavailable: {}. Running simulated.", e);
                }
            }
        }

        let worker = spawn_sim_worker(state.clone(), running.clone(), circumference_m);
        Self {
            state,
            running,
            worker: Mutex::new(Some(worker)),
            pin: Mutex::new(None),
            simulated: true,
        }
    }

    /// Current speed in km/h, as of the most recent pulse.
    pub fn speed_kmh(&self) -> f64 {
        self.state.lock().unwrap().speed_kmh
    }

    /// Total pulses seen since construction.
    pub fn pulse_count(&self) -> u64 {
        self.state.lock().unwrap().pulse_count
    }

    /// True when this channel runs on the simulated ticker.
    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    /// Stops the worker thread and releases the GPIO line. Idempotent.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);

        if let Some(worker) = self.worker.lock().unwrap().take() {
            if worker.join().is_err() {
                warn!("Hall sensor worker panicked");
            }
        }

        if let Some(pin) = self.pin.lock().unwrap().take() {
            GpioLine::unexport(pin);
            debug!("Released GPIO {}", pin);
        }
    }
}

impl Drop for HallSensor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Edge-wait loop feeding pulses from the real sensor.
fn spawn_edge_worker(
    mut line: GpioLine,
    state: Arc<Mutex<PulseState>>,
    running: Arc<AtomicBool>,
    circumference_m: f64,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut consecutive_errors: u32 = 0;
        let mut last_error_log = Instant::now();

        while running.load(Ordering::Relaxed) {
            match line.wait_for_edge(EDGE_WAIT) {
                Ok(true) => {
                    state
                        .lock()
                        .unwrap()
                        .record_pulse(circumference_m, Instant::now());
                    consecutive_errors = 0;
                }
                Ok(false) => {
                    // Timeout; loop around and re-check the stop flag.
                    consecutive_errors = 0;
                }
                Err(e) => {
                    consecutive_errors += 1;
                    let elapsed = last_error_log.elapsed();
                    if consecutive_errors == 1 || elapsed >= Duration::from_secs(60) {
                        if consecutive_errors > 1 {
                            warn!(
                                "Wheel pulse wait failed (repeated {} times in {:?}): {}",
                                consecutive_errors, elapsed, e
                            );
                        } else {
                            warn!("Wheel pulse wait failed: {}", e);
                        }
                        last_error_log = Instant::now();
                        consecutive_errors = 0;
                    }
                    thread::sleep(EDGE_WAIT);
                }
            }
        }
    })
}

/// Fixed-period pulse generator emulating continuous wheel rotation.
fn spawn_sim_worker(
    state: Arc<Mutex<PulseState>>,
    running: Arc<AtomicBool>,
    circumference_m: f64,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while running.load(Ordering::Relaxed) {
            thread::sleep(SIM_PULSE_INTERVAL);
            state
                .lock()
                .unwrap()
                .record_pulse(circumference_m, Instant::now());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_to_speed() {
        let mut state = PulseState::default();
        let t0 = Instant::now();

        state.record_pulse(1.0, t0);
        assert_eq!(state.speed_kmh, 0.0);
        assert_eq!(state.pulse_count, 1);

        // One revolution of a 1 m wheel in 100 ms is 10 m/s, or 36 km/h.
        state.record_pulse(1.0, t0 + Duration::from_millis(100));
        assert!((state.speed_kmh - 36.0).abs() < 1e-9);
        assert_eq!(state.pulse_count, 2);
    }

    #[test]
    fn test_pulse_scales_with_circumference() {
        let mut state = PulseState::default();
        let t0 = Instant::now();

        state.record_pulse(0.1397, t0);
        state.record_pulse(0.1397, t0 + Duration::from_secs(1));
        assert!((state.speed_kmh - 0.1397 * 3.6).abs() < 1e-9);
    }

    #[test]
    fn test_coincident_pulse_keeps_speed() {
        let mut state = PulseState::default();
        let t0 = Instant::now();

        state.record_pulse(1.0, t0);
        state.record_pulse(1.0, t0 + Duration::from_millis(100));
        let speed = state.speed_kmh;

        // A pulse with no elapsed time cannot produce a finite speed.
        state.record_pulse(1.0, t0 + Duration::from_millis(100));
        assert_eq!(state.speed_kmh, speed);
        assert_eq!(state.pulse_count, 3);
    }

    #[test]
    fn test_simulated_pulses_produce_speed() {
        let sensor = HallSensor::new(&HardwareProbe::none(), 18, 1.0);
        assert!(sensor.is_simulated());

        thread::sleep(Duration::from_millis(500));
        assert!(sensor.pulse_count() >= 2);
        let speed = sensor.speed_kmh();
        assert!(speed > 5.0 && speed < 36.5, "speed was {}", speed);

        sensor.stop();
        let frozen = sensor.pulse_count();
        thread::sleep(Duration::from_millis(250));
        assert_eq!(sensor.pulse_count(), frozen);

        // Second stop is a no-op.
        sensor.stop();
    }
}
