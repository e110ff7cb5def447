//! Time utilities for the simulation and radar loops

use std::sync::OnceLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[cfg(test)]
use parking_lot::Mutex;
use tokio::time::Instant;

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: OnceLock<std::time::Instant> = OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(std::time::Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Simulation tick period
pub const SIMULATION_TICK_MS: u64 = 30;
/// Radar scan loop polling period
pub const SCAN_INTERVAL_MS: u64 = 10;
/// Upper bound on how long shutdown waits for the scan loop to exit
pub const RADAR_SHUTDOWN_TIMEOUT_MS: u64 = 500;

pub const SIMULATION_TICK: Duration = Duration::from_millis(SIMULATION_TICK_MS);
pub const SCAN_INTERVAL: Duration = Duration::from_millis(SCAN_INTERVAL_MS);
pub const RADAR_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(RADAR_SHUTDOWN_TIMEOUT_MS);

/// Fixed simulation step (in seconds)
pub fn tick_delta() -> f32 {
    SIMULATION_TICK_MS as f32 / 1000.0
}

/// Source of monotonic time for loops that integrate over wall-clock deltas.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Clock backed by tokio's time driver.
///
/// Follows virtual time when the runtime clock is paused.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

#[cfg(test)]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}
