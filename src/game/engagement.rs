//! Engagement resolution - judges the tracked missile once per tick

use tracing::{info, warn};

use crate::radar::geometry::is_in_beam;
use crate::radar::SharedRadar;
use crate::store::{EventLog, EventStatus, LogEntry};

use super::missile::{LauncherId, Missile, MissileId};

/// Fate of the tracked missile this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engagement {
    /// Nothing tracked (or the radar is off)
    NoTarget,
    /// Tracked id no longer matches an active missile
    Released(MissileId),
    /// Tracked missile crossed into the dead zone
    Lost(MissileId),
    /// Tracked missile was inside engagement radius and beam
    Destroyed(MissileId),
    /// Still held; no state change
    Tracking(MissileId),
}

/// Missile that reached the dead zone and ended the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseHit {
    pub missile_id: MissileId,
    pub launcher_id: LauncherId,
}

/// Outcome of one resolution pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub engagement: Engagement,
    pub base_hit: Option<BaseHit>,
}

/// Engagement resolver, run on the simulation loop after missile physics
pub struct EngagementResolver;

impl EngagementResolver {
    /// Resolve the tracked missile, then check for a base hit.
    pub fn resolve(
        missiles: &mut [Missile],
        radar: &SharedRadar,
        log: &dyn EventLog,
        game_time: f32,
    ) -> Resolution {
        let engagement = Self::resolve_tracked(missiles, radar, log, game_time);
        let base_hit = Self::check_base_hit(missiles, radar, log, game_time);
        Resolution { engagement, base_hit }
    }

    /// Decide lost / destroyed / still tracked for the current target.
    ///
    /// Only clears the target through a compare-and-clear on its id.
    pub fn resolve_tracked(
        missiles: &mut [Missile],
        radar: &SharedRadar,
        log: &dyn EventLog,
        game_time: f32,
    ) -> Engagement {
        let status = radar.status();
        if !status.operational {
            return Engagement::NoTarget;
        }
        let Some(target_id) = status.tracked_target else {
            return Engagement::NoTarget;
        };

        let Some(missile) = missiles
            .iter_mut()
            .find(|m| m.active && m.id == target_id)
        else {
            radar.release_target(target_id);
            return Engagement::Released(target_id);
        };

        let distance = missile.distance_to_center();

        if distance <= status.dead_zone_radius {
            log.record(LogEntry::missile(
                missile.id,
                missile.launcher_id,
                game_time,
                EventStatus::LostDeadZone,
            ));
            radar.release_target(target_id);
            return Engagement::Lost(target_id);
        }

        // Beam position is re-read so the check matches the current sweep.
        let scan_angle = radar.scan_angle();
        if distance <= status.engagement_radius
            && is_in_beam(missile.position, scan_angle, status.beam_width)
        {
            missile.active = false;
            log.record(LogEntry::missile(
                missile.id,
                missile.launcher_id,
                game_time,
                EventStatus::Destroyed,
            ));
            radar.retire_target(target_id);
            info!(missile_id = %target_id, distance, "Missile destroyed");
            return Engagement::Destroyed(target_id);
        }

        Engagement::Tracking(target_id)
    }

    /// Any active missile inside the dead zone ends the session.
    ///
    /// Switches the radar off (dropping any target) and deactivates every missile.
    pub fn check_base_hit(
        missiles: &mut [Missile],
        radar: &SharedRadar,
        log: &dyn EventLog,
        game_time: f32,
    ) -> Option<BaseHit> {
        let dead_zone = radar.dead_zone_radius();
        let hit = missiles
            .iter()
            .find(|m| m.active && m.distance_to_center() <= dead_zone)
            .map(|m| BaseHit {
                missile_id: m.id,
                launcher_id: m.launcher_id,
            })?;

        radar.set_operational(false);
        log.record(LogEntry::missile(
            hit.missile_id,
            hit.launcher_id,
            game_time,
            EventStatus::BaseHit,
        ));
        for missile in missiles.iter_mut() {
            missile.active = false;
        }

        warn!(missile_id = %hit.missile_id, launcher_id = %hit.launcher_id, "Base hit");
        Some(hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::radar::state::RadarGeometry;
    use crate::store::MissileLog;
    use glam::Vec2;

    fn missile(id: u32, position: Vec2) -> Missile {
        Missile::at(MissileId(id), LauncherId(0), position, Vec2::ZERO, 75.0)
    }

    fn radar_tracking(id: u32, scan_angle: f32) -> SharedRadar {
        let radar = SharedRadar::new(RadarGeometry::from_config(&SimConfig::default()));
        radar.track(scan_angle, MissileId(id), LauncherId(0), 1.0);
        radar
    }

    #[test]
    fn nothing_tracked_is_a_no_op() {
        let log = MissileLog::new();
        let radar = SharedRadar::new(RadarGeometry::from_config(&SimConfig::default()));
        let mut missiles = vec![missile(0, Vec2::new(100.0, 0.0))];

        let engagement = EngagementResolver::resolve_tracked(&mut missiles, &radar, &log, 2.0);
        assert_eq!(engagement, Engagement::NoTarget);
        assert!(missiles[0].active);
    }

    #[test]
    fn missing_target_is_released_silently() {
        let log = MissileLog::new();
        let radar = radar_tracking(5, 0.0);
        let mut missiles = vec![missile(0, Vec2::new(100.0, 0.0))];

        let engagement = EngagementResolver::resolve_tracked(&mut missiles, &radar, &log, 2.0);
        assert_eq!(engagement, Engagement::Released(MissileId(5)));
        assert!(radar.tracked_target().is_none());
        assert!(log.is_empty());
    }

    #[test]
    fn inside_engagement_and_beam_is_destroyed() {
        let log = MissileLog::new();
        let radar = radar_tracking(0, 0.0);
        let mut missiles = vec![missile(0, Vec2::new(140.0, 0.0))];

        let engagement = EngagementResolver::resolve_tracked(&mut missiles, &radar, &log, 2.0);
        assert_eq!(engagement, Engagement::Destroyed(MissileId(0)));
        assert!(!missiles[0].active);
        assert!(radar.tracked_target().is_none());
        assert_eq!(log.last_entry_for(MissileId(0)).unwrap().status, EventStatus::Destroyed);
    }

    #[test]
    fn outside_beam_keeps_tracking() {
        let log = MissileLog::new();
        let radar = radar_tracking(0, std::f32::consts::PI);
        let mut missiles = vec![missile(0, Vec2::new(140.0, 0.0))];

        let engagement = EngagementResolver::resolve_tracked(&mut missiles, &radar, &log, 2.0);
        assert_eq!(engagement, Engagement::Tracking(MissileId(0)));
        assert!(missiles[0].active);
        assert_eq!(radar.tracked_target().map(|t| t.missile_id), Some(MissileId(0)));
    }

    #[test]
    fn beyond_engagement_radius_keeps_tracking() {
        let log = MissileLog::new();
        let radar = radar_tracking(0, 0.0);
        let mut missiles = vec![missile(0, Vec2::new(300.0, 0.0))];

        let engagement = EngagementResolver::resolve_tracked(&mut missiles, &radar, &log, 2.0);
        assert_eq!(engagement, Engagement::Tracking(MissileId(0)));
    }

    #[test]
    fn dead_zone_loses_target_and_hits_base() {
        let log = MissileLog::new();
        let radar = radar_tracking(0, 0.0);
        let mut missiles = vec![
            missile(0, Vec2::new(15.0, 0.0)),
            missile(1, Vec2::new(300.0, 300.0)),
        ];

        let resolution = EngagementResolver::resolve(&mut missiles, &radar, &log, 6.0);
        assert_eq!(resolution.engagement, Engagement::Lost(MissileId(0)));
        assert_eq!(
            resolution.base_hit,
            Some(BaseHit { missile_id: MissileId(0), launcher_id: LauncherId(0) })
        );
        assert!(missiles.iter().all(|m| !m.active));
        assert!(!radar.is_operational());
        assert_eq!(log.count(EventStatus::LostDeadZone), 1);
        assert_eq!(log.last_entry_for(MissileId(0)).unwrap().status, EventStatus::BaseHit);
    }

    #[test]
    fn untracked_missile_in_dead_zone_hits_base() {
        let log = MissileLog::new();
        let radar = radar_tracking(1, 0.0);
        let mut missiles = vec![
            missile(0, Vec2::new(0.0, -20.0)),
            missile(1, Vec2::new(250.0, 0.0)),
        ];

        let resolution = EngagementResolver::resolve(&mut missiles, &radar, &log, 6.0);
        assert_eq!(resolution.engagement, Engagement::Tracking(MissileId(1)));
        assert_eq!(resolution.base_hit.map(|h| h.missile_id), Some(MissileId(0)));
        assert!(radar.tracked_target().is_none());
        assert!(!missiles[1].active);
    }
}
