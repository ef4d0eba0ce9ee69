//! Time source abstraction.
//!
//! The engine never reads wall time directly: it asks a [`Clock`], so
//! snapshot windows and TTL sweeps are testable with virtual time and a
//! simulation driver can pin the engine to its own step clock.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// A monotonic-enough source of "now" in seconds.
pub trait Clock: Send + Sync {
    /// Current time in seconds (unix epoch for the system clock).
    fn now(&self) -> f64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Manually advanced time, for tests and deterministic simulation.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    /// Creates a clock starting at `start` seconds.
    pub fn new(start: f64) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Sets the current time.
    pub fn set(&self, t: f64) {
        *self.now.lock().expect("clock lock poisoned") = t;
    }

    /// Advances the current time by `dt` seconds.
    pub fn advance(&self, dt: f64) {
        *self.now.lock().expect("clock lock poisoned") += dt;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock().expect("clock lock poisoned")
    }
}
