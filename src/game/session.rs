//! Defense session state and the fixed-step simulation update

use std::sync::Arc;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{ConfigError, SimConfig};
use crate::radar::{Radar, RadarError, RadarGeometry};
use crate::store::{EventLog, EventStatus, LogEntry, MissileLog};
use crate::util::time::Clock;

use super::engagement::{Engagement, EngagementResolver};
use super::missile::{Launcher, Missile, MissileId};

/// How the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    InProgress,
    Victory,
    Defeat,
}

/// Session lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Radar(#[from] RadarError),
}

/// One defense session: missiles, launchers, radar and counters.
///
/// Owned by the simulation loop; the radar's scan task is the only other
/// party touching shared state.
pub struct Session {
    pub id: Uuid,
    pub seed: u64,
    config: SimConfig,
    rng: ChaCha8Rng,
    game_time: f32,
    tick: u64,
    missiles: Vec<Missile>,
    launchers: Vec<Launcher>,
    radar: Radar,
    log: Arc<MissileLog>,
    outcome: Outcome,
    destroyed: u32,
    launched: u32,
    next_launch_timer: f32,
    /// Set by `initialize`, cleared by `shutdown` (even a failed one)
    running: bool,
}

impl Session {
    /// Create an idle session; call [`Session::initialize`] to start it.
    pub fn new(config: SimConfig, log: Arc<MissileLog>, clock: Arc<dyn Clock>) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        let radar = Radar::new(RadarGeometry::from_config(&config), log.clone(), clock);
        Self {
            id: Uuid::new_v4(),
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
            game_time: 0.0,
            tick: 0,
            missiles: Vec::new(),
            launchers: Vec::new(),
            radar,
            log,
            outcome: Outcome::InProgress,
            destroyed: 0,
            launched: 0,
            next_launch_timer: 0.0,
            running: false,
        }
    }

    /// Reset all session state and start the radar.
    ///
    /// Invalid configuration is fatal. A radar that cannot start leaves the
    /// session running without detection.
    pub fn initialize(&mut self, config: SimConfig) -> Result<(), SessionError> {
        config.validate()?;

        self.seed = config.seed.unwrap_or_else(rand::random);
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.id = Uuid::new_v4();
        self.game_time = 0.0;
        self.tick = 0;
        self.outcome = Outcome::InProgress;
        self.destroyed = 0;
        self.launched = 0;
        self.missiles.clear();
        self.launchers = Launcher::corners(config.launch_distance).to_vec();
        self.log.clear();
        self.next_launch_timer = 1.0 + self.rng.gen_range(0..30) as f32 / 10.0;

        let geometry = RadarGeometry::from_config(&config);
        self.config = config;

        match self.radar.initialize(geometry) {
            Ok(()) => {}
            Err(RadarError::Spawn(e)) => {
                warn!(session_id = %self.id, error = %e, "Session continues without radar");
            }
            Err(e) => return Err(e.into()),
        }
        self.running = true;

        info!(
            session_id = %self.id,
            seed = self.seed,
            max_missiles = self.config.max_missiles,
            "Session initialized"
        );
        Ok(())
    }

    /// Stop the radar and drop all missiles.
    ///
    /// The session stays stopped until the next `initialize`, whether or
    /// not the radar shut down cleanly.
    pub async fn shutdown(&mut self) -> Result<(), SessionError> {
        self.running = false;
        self.radar.set_operational(false);
        let stopped = self.radar.shutdown().await;
        self.missiles.clear();
        self.launchers.clear();
        stopped?;
        info!(session_id = %self.id, "Session shut down");
        Ok(())
    }

    /// Shutdown followed by initialize
    pub async fn reset(&mut self, config: SimConfig) -> Result<(), SessionError> {
        self.shutdown().await?;
        self.initialize(config)
    }

    /// Advance the session by one fixed step
    pub fn update(&mut self, dt: f32) {
        if !self.running {
            return;
        }
        if self.is_over() {
            self.radar.set_operational(false);
            return;
        }

        self.tick += 1;
        self.game_time += dt;

        self.schedule_launches(dt);
        self.update_missiles(dt);
        self.resolve_engagement();
        self.check_victory();
        self.cleanup_inactive();
        self.radar.publish_snapshot(&self.missiles, self.game_time);
    }

    fn schedule_launches(&mut self, dt: f32) {
        if self.launched >= self.config.max_missiles {
            return;
        }

        self.next_launch_timer -= dt;
        if self.next_launch_timer > 0.0 {
            return;
        }

        self.next_launch_timer = 2.0 + self.rng.gen_range(0..40) as f32 / 10.0;
        if !self.launchers.is_empty() {
            let index = self.rng.gen_range(0..self.launchers.len());
            self.launch_missile(index);
        }
    }

    fn launch_missile(&mut self, launcher_index: usize) {
        let Some(launcher) = self.launchers.get(launcher_index).copied() else {
            return;
        };

        let id = MissileId(self.launched);
        self.launched += 1;

        let target = Vec2::ZERO;
        let speed = self.config.missile_speed;
        self.missiles.push(Missile::launch(id, &launcher, target, speed));

        self.log.record(LogEntry::missile(id, launcher.id, self.game_time, EventStatus::Launched).with_note(
            format!(
                "start=({:.1},{:.1}) target=({:.1},{:.1}) speed={:.1}",
                launcher.position.x, launcher.position.y, target.x, target.y, speed
            ),
        ));
    }

    fn update_missiles(&mut self, dt: f32) {
        for missile in self.missiles.iter_mut().filter(|m| m.active) {
            missile.update(dt);
        }
    }

    fn resolve_engagement(&mut self) {
        let resolution = EngagementResolver::resolve(
            &mut self.missiles,
            self.radar.shared(),
            self.log.as_ref(),
            self.game_time,
        );

        if let Engagement::Destroyed(_) = resolution.engagement {
            self.destroyed += 1;
        }

        if let Some(hit) = resolution.base_hit {
            self.outcome = Outcome::Defeat;
            info!(
                session_id = %self.id,
                missile_id = %hit.missile_id,
                destroyed = self.destroyed,
                "Session lost"
            );
        }
    }

    fn check_victory(&mut self) {
        if self.is_over() || self.launched < self.config.max_missiles {
            return;
        }
        if self.missiles.iter().any(|m| m.active) {
            return;
        }

        self.outcome = Outcome::Victory;
        self.radar.set_operational(false);
        self.log.record(LogEntry::session(self.game_time, EventStatus::Victory));
        info!(session_id = %self.id, destroyed = self.destroyed, "Session won");
    }

    fn cleanup_inactive(&mut self) {
        self.missiles.retain(|m| m.active);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_over(&self) -> bool {
        self.outcome != Outcome::InProgress
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn game_time(&self) -> f32 {
        self.game_time
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn destroyed(&self) -> u32 {
        self.destroyed
    }

    pub fn launched(&self) -> u32 {
        self.launched
    }

    pub fn max_missiles(&self) -> u32 {
        self.config.max_missiles
    }

    pub fn missiles(&self) -> &[Missile] {
        &self.missiles
    }

    pub fn launchers(&self) -> &[Launcher] {
        &self.launchers
    }

    pub fn radar(&self) -> &Radar {
        &self.radar
    }

    pub fn log(&self) -> &Arc<MissileLog> {
        &self.log
    }

    #[cfg(test)]
    pub(crate) fn spawn_missile_at(
        &mut self,
        position: Vec2,
        launcher_id: super::missile::LauncherId,
    ) -> MissileId {
        let id = MissileId(self.launched);
        self.launched += 1;
        self.missiles.push(Missile::at(id, launcher_id, position, Vec2::ZERO, self.config.missile_speed));
        id
    }
}
