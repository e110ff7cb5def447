//! Shared radar state behind the global radar lock
//!
//! Every read or write takes the lock, touches a handful of fields and
//! releases it. Acquiring a target is only possible through [`ScanPort`],
//! which the radar module hands to the scan loop; clearing a target is a
//! compare-and-clear used by the engagement resolver. Destroyed ids are
//! retired and can never be acquired again in the same session.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::SimConfig;
use crate::game::missile::{LauncherId, MissileId};
use crate::store::{EventLog, EventStatus, LogEntry};

use super::geometry::normalize_angle;

/// Immutable-after-init radar parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RadarGeometry {
    /// Radians per second
    pub sweep_speed: f32,
    /// Full beam width in radians
    pub beam_width: f32,
    pub range: f32,
    pub engagement_radius: f32,
    pub dead_zone_radius: f32,
}

impl RadarGeometry {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            sweep_speed: config.sweep_speed,
            beam_width: config.beam_width,
            range: config.radar_range,
            engagement_radius: config.engagement_radius,
            dead_zone_radius: config.dead_zone_radius,
        }
    }
}

/// The missile currently held by the radar
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackedTarget {
    pub missile_id: MissileId,
    pub launcher_id: LauncherId,
    /// Snapshot clock value at detection
    pub detected_at: f32,
}

#[derive(Debug, Clone)]
struct RadarState {
    scan_angle: f32,
    operational: bool,
    target: Option<TrackedTarget>,
    /// Destroyed missiles; the scan loop may still see them in a stale snapshot
    retired: HashSet<MissileId>,
    geometry: RadarGeometry,
}

impl RadarState {
    fn new(geometry: RadarGeometry) -> Self {
        Self {
            scan_angle: 0.0,
            operational: true,
            target: None,
            retired: HashSet::new(),
            geometry,
        }
    }
}

/// Point-in-time copy of the radar state for rendering and resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RadarStatus {
    pub operational: bool,
    pub scan_angle: f32,
    pub beam_width: f32,
    pub range: f32,
    pub engagement_radius: f32,
    pub dead_zone_radius: f32,
    pub tracked_target: Option<MissileId>,
    pub detection_time: Option<f32>,
}

/// Handle to the radar state shared by the scan loop, the simulation loop and readers
#[derive(Debug, Clone)]
pub struct SharedRadar {
    inner: Arc<Mutex<RadarState>>,
}

impl SharedRadar {
    pub fn new(geometry: RadarGeometry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RadarState::new(geometry))),
        }
    }

    /// Return every field to its initial value with new geometry
    pub fn reset(&self, geometry: RadarGeometry) {
        *self.inner.lock() = RadarState::new(geometry);
    }

    pub fn is_operational(&self) -> bool {
        self.inner.lock().operational
    }

    pub fn scan_angle(&self) -> f32 {
        self.inner.lock().scan_angle
    }

    pub fn dead_zone_radius(&self) -> f32 {
        self.inner.lock().geometry.dead_zone_radius
    }

    /// All queryable fields under a single lock acquisition
    pub fn status(&self) -> RadarStatus {
        let state = self.inner.lock();
        RadarStatus {
            operational: state.operational,
            scan_angle: state.scan_angle,
            beam_width: state.geometry.beam_width,
            range: state.geometry.range,
            engagement_radius: state.geometry.engagement_radius,
            dead_zone_radius: state.geometry.dead_zone_radius,
            tracked_target: state.target.map(|t| t.missile_id),
            detection_time: state.target.map(|t| t.detected_at),
        }
    }

    /// Switching the radar off also drops any tracked target.
    pub fn set_operational(&self, operational: bool) {
        let mut state = self.inner.lock();
        state.operational = operational;
        if !operational {
            state.target = None;
        }
    }

    /// Clear the tracked target if it is still `missile_id`.
    ///
    /// Returns false when the radar holds no target or a different one.
    pub fn release_target(&self, missile_id: MissileId) -> bool {
        let mut state = self.inner.lock();
        match state.target {
            Some(target) if target.missile_id == missile_id => {
                state.target = None;
                true
            }
            _ => false,
        }
    }

    /// Like [`SharedRadar::release_target`], and also bar `missile_id` from
    /// being acquired again.
    ///
    /// Used when the target is destroyed: the scan loop may still be
    /// searching a snapshot taken before the missile went inactive.
    pub fn retire_target(&self, missile_id: MissileId) -> bool {
        let mut state = self.inner.lock();
        state.retired.insert(missile_id);
        match state.target {
            Some(target) if target.missile_id == missile_id => {
                state.target = None;
                true
            }
            _ => false,
        }
    }

    pub(super) fn scan_port(&self) -> ScanPort {
        ScanPort {
            shared: self.clone(),
        }
    }
}

#[cfg(test)]
impl SharedRadar {
    pub(crate) fn tracked_target(&self) -> Option<TrackedTarget> {
        self.inner.lock().target
    }

    pub(crate) fn detection_time(&self) -> Option<f32> {
        self.inner.lock().target.map(|t| t.detected_at)
    }

    /// Put the radar into the tracking state without a scan loop
    pub(crate) fn track(&self, scan_angle: f32, missile_id: MissileId, launcher_id: LauncherId, detected_at: f32) {
        let mut state = self.inner.lock();
        state.scan_angle = normalize_angle(scan_angle);
        state.target = Some(TrackedTarget {
            missile_id,
            launcher_id,
            detected_at,
        });
    }
}

/// Candidate picked by the detection search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub missile_id: MissileId,
    pub launcher_id: LauncherId,
    pub distance_sq: f32,
}

/// Scan-loop side of the radar state: writes the scan angle and acquires targets.
#[derive(Debug)]
pub struct ScanPort {
    shared: SharedRadar,
}

impl ScanPort {
    pub fn is_operational(&self) -> bool {
        self.shared.is_operational()
    }

    pub fn has_target(&self) -> bool {
        self.shared.inner.lock().target.is_some()
    }

    /// Scan angle and geometry as a consistent pair
    pub fn starting_point(&self) -> (f32, RadarGeometry) {
        let state = self.shared.inner.lock();
        (state.scan_angle, state.geometry)
    }

    /// Store the new scan angle and, if no target is held, acquire `candidate`.
    ///
    /// The "no target" and "not retired" checks and the acquisition happen
    /// under the same lock acquisition as the detection log entry.
    pub fn commit(
        &self,
        scan_angle: f32,
        candidate: Option<Candidate>,
        snapshot_time: f32,
        log: &dyn EventLog,
    ) -> Option<TrackedTarget> {
        let mut state = self.shared.inner.lock();
        state.scan_angle = normalize_angle(scan_angle);

        let candidate = candidate?;
        if state.target.is_some() || !state.operational || state.retired.contains(&candidate.missile_id) {
            return None;
        }

        let target = TrackedTarget {
            missile_id: candidate.missile_id,
            launcher_id: candidate.launcher_id,
            detected_at: snapshot_time,
        };
        state.target = Some(target);
        log.record(LogEntry::missile(
            target.missile_id,
            target.launcher_id,
            snapshot_time,
            EventStatus::Detected,
        ));

        Some(target)
    }
}
