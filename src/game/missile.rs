//! Missiles, launchers and straight-line flight

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Sequential missile identifier, unique within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissileId(pub u32);

impl fmt::Display for MissileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Launch emplacement identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LauncherId(pub u8);

impl fmt::Display for LauncherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed launch emplacement
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Launcher {
    pub id: LauncherId,
    pub position: Vec2,
}

impl Launcher {
    /// The four corner emplacements of a square with half side `d`
    pub fn corners(d: f32) -> [Launcher; 4] {
        [
            Launcher { id: LauncherId(0), position: Vec2::new(-d, d) },
            Launcher { id: LauncherId(1), position: Vec2::new(d, d) },
            Launcher { id: LauncherId(2), position: Vec2::new(-d, -d) },
            Launcher { id: LauncherId(3), position: Vec2::new(d, -d) },
        ]
    }
}

/// An incoming missile (authoritative copy owned by the simulation loop)
#[derive(Debug, Clone, PartialEq)]
pub struct Missile {
    pub id: MissileId,
    pub launcher_id: LauncherId,
    pub position: Vec2,
    pub target: Vec2,
    pub velocity: Vec2,
    pub speed: f32,
    pub active: bool,
}

impl Missile {
    /// Launch a missile from `launcher` toward `target`
    pub fn launch(id: MissileId, launcher: &Launcher, target: Vec2, speed: f32) -> Self {
        Self::at(id, launcher.id, launcher.position, target, speed)
    }

    /// Place a missile at an arbitrary position flying toward `target`
    pub fn at(id: MissileId, launcher_id: LauncherId, position: Vec2, target: Vec2, speed: f32) -> Self {
        let direction = (target - position).normalize_or_zero();
        Self {
            id,
            launcher_id,
            position,
            target,
            velocity: direction * speed,
            speed,
            active: true,
        }
    }

    /// Advance along the flight line; stops exactly on the target
    pub fn update(&mut self, dt: f32) {
        if !self.active {
            return;
        }

        let remaining = self.target - self.position;
        if remaining.length() <= self.speed * dt {
            self.position = self.target;
            self.velocity = Vec2::ZERO;
        } else {
            self.position += self.velocity * dt;
        }
    }

    /// Distance to the radar at the origin
    pub fn distance_to_center(&self) -> f32 {
        self.position.length()
    }

    pub fn distance_sq_to_center(&self) -> f32 {
        self.position.length_squared()
    }

    #[cfg(test)]
    pub(crate) fn reached_target(&self) -> bool {
        self.position == self.target
    }
}
