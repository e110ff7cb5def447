//! Read-only session views for HTTP and WebSocket clients

use serde::Serialize;
use uuid::Uuid;

use crate::radar::geometry::is_in_beam;
use crate::radar::RadarStatus;
use crate::store::{EventLog, LogEntry};

use super::missile::{LauncherId, MissileId};
use super::session::{Outcome, Session};

/// Number of missiles listed in the recent-activity panel
pub const RECENT_MISSILES: usize = 15;

/// Full render state of one session tick
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub tick: u64,
    pub game_time: f32,
    /// False after a shutdown or a failed reset
    pub running: bool,
    pub outcome: Outcome,
    pub destroyed: u32,
    pub launched: u32,
    pub max_missiles: u32,
    pub radar: RadarStatus,
    pub launchers: Vec<LauncherView>,
    pub missiles: Vec<MissileView>,
    /// Latest entry per missile, newest missile first
    pub recent: Vec<LogEntry>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LauncherView {
    pub id: LauncherId,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MissileView {
    pub id: MissileId,
    pub launcher_id: LauncherId,
    pub x: f32,
    pub y: f32,
    pub distance: f32,
    pub tracked: bool,
    pub in_beam: bool,
}

impl SessionView {
    pub fn capture(session: &Session) -> Self {
        let radar = session.radar().status();

        let missiles = session
            .missiles()
            .iter()
            .filter(|m| m.active)
            .map(|m| MissileView {
                id: m.id,
                launcher_id: m.launcher_id,
                x: m.position.x,
                y: m.position.y,
                distance: m.distance_to_center(),
                tracked: radar.tracked_target == Some(m.id),
                in_beam: radar.operational && is_in_beam(m.position, radar.scan_angle, radar.beam_width),
            })
            .collect();

        let launchers = session
            .launchers()
            .iter()
            .map(|l| LauncherView {
                id: l.id,
                x: l.position.x,
                y: l.position.y,
            })
            .collect();

        let log = session.log();
        let recent = (0..session.launched())
            .rev()
            .filter_map(|id| log.last_entry_for(MissileId(id)))
            .take(RECENT_MISSILES)
            .collect();

        Self {
            session_id: session.id,
            tick: session.tick(),
            game_time: session.game_time(),
            running: session.is_running(),
            outcome: session.outcome(),
            destroyed: session.destroyed(),
            launched: session.launched(),
            max_missiles: session.max_missiles(),
            radar,
            launchers,
            missiles,
            recent,
        }
    }
}
