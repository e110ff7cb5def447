//! Radar scan loop and detection search

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::game::missile::Missile;
use crate::store::EventLog;
use crate::util::time::{Clock, SCAN_INTERVAL};

use super::geometry::{is_in_beam, is_in_range_ring, normalize_angle};
use super::snapshot::SnapshotStore;
use super::state::{Candidate, RadarGeometry, ScanPort, TrackedTarget};

/// Failure that ends the scan loop
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("scan angle became non-finite ({0})")]
    NonFiniteAngle(f32),
}

/// Closest active missile inside the range ring and the beam.
///
/// Ties keep the first missile found.
pub fn find_target(
    missiles: &[Missile],
    scan_angle: f32,
    beam_width: f32,
    range: f32,
    dead_zone: f32,
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;

    for missile in missiles {
        if !missile.active {
            continue;
        }
        if !is_in_range_ring(missile.distance_to_center(), range, dead_zone) {
            continue;
        }
        if !is_in_beam(missile.position, scan_angle, beam_width) {
            continue;
        }

        let distance_sq = missile.distance_sq_to_center();
        if best.map_or(true, |b| distance_sq < b.distance_sq) {
            best = Some(Candidate {
                missile_id: missile.id,
                launcher_id: missile.launcher_id,
                distance_sq,
            });
        }
    }

    best
}

/// Free-running loop that sweeps the beam and acquires targets.
///
/// Geometry is read once at construction; the loop never clears a target.
pub struct ScanLoop {
    port: ScanPort,
    snapshots: SnapshotStore,
    log: Arc<dyn EventLog>,
    clock: Arc<dyn Clock>,
    geometry: RadarGeometry,
    angle: f32,
    last_update: Instant,
    stop: Arc<AtomicBool>,
}

impl ScanLoop {
    pub fn new(
        port: ScanPort,
        snapshots: SnapshotStore,
        log: Arc<dyn EventLog>,
        clock: Arc<dyn Clock>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let (angle, geometry) = port.starting_point();
        let last_update = clock.now();
        Self {
            port,
            snapshots,
            log,
            clock,
            geometry,
            angle,
            last_update,
            stop,
        }
    }

    /// Run until the stop flag is raised
    pub async fn run(mut self) -> Result<(), ScanError> {
        info!(
            sweep_speed = self.geometry.sweep_speed,
            beam_width = self.geometry.beam_width,
            "Radar scan loop started"
        );

        let mut ticker = interval(SCAN_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if self.stop.load(Ordering::Acquire) {
                break;
            }
            self.tick()?;
        }

        info!("Radar scan loop stopped");
        Ok(())
    }

    /// One iteration using the clock delta since the previous call
    pub fn tick(&mut self) -> Result<Option<TrackedTarget>, ScanError> {
        let now = self.clock.now();
        let dt = now.saturating_duration_since(self.last_update).as_secs_f32();
        self.last_update = now;
        self.step(dt)
    }

    /// Advance the beam by `dt` seconds and search the latest snapshot.
    ///
    /// A non-operational radar neither moves nor searches.
    pub fn step(&mut self, dt: f32) -> Result<Option<TrackedTarget>, ScanError> {
        if !self.port.is_operational() {
            return Ok(None);
        }

        let angle = normalize_angle(self.angle + self.geometry.sweep_speed * dt);
        if !angle.is_finite() {
            return Err(ScanError::NonFiniteAngle(angle));
        }
        self.angle = angle;

        let snapshot = self.snapshots.latest();
        let candidate = if self.port.has_target() {
            None
        } else {
            find_target(
                &snapshot.missiles,
                angle,
                self.geometry.beam_width,
                self.geometry.range,
                self.geometry.dead_zone_radius,
            )
        };

        let acquired = self
            .port
            .commit(angle, candidate, snapshot.game_time, self.log.as_ref());
        if let Some(target) = acquired {
            debug!(
                missile_id = %target.missile_id,
                scan_angle = angle,
                "Target acquired"
            );
        }

        Ok(acquired)
    }

    #[cfg(test)]
    pub(crate) fn angle(&self) -> f32 {
        self.angle
    }
}
