//! Missile snapshot handed from the simulation loop to the scan loop

use std::sync::Arc;

use parking_lot::Mutex;

use crate::game::missile::Missile;

/// Immutable copy of the active missiles at one simulation tick
#[derive(Debug, Clone, Default)]
pub struct MissileSnapshot {
    pub missiles: Vec<Missile>,
    /// Simulation clock when the copy was taken
    pub game_time: f32,
}

/// Latest published snapshot, behind its own lock.
///
/// Publishing swaps in a new `Arc`; readers clone the pointer and search
/// without holding the lock. Stale copies are dropped, never merged.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    latest: Arc<Mutex<Arc<MissileSnapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the active missiles out of `missiles` and publish them
    pub fn publish(&self, missiles: &[Missile], game_time: f32) {
        let snapshot = Arc::new(MissileSnapshot {
            missiles: missiles.iter().filter(|m| m.active).cloned().collect(),
            game_time,
        });
        *self.latest.lock() = snapshot;
    }

    pub fn latest(&self) -> Arc<MissileSnapshot> {
        self.latest.lock().clone()
    }

    pub fn clear(&self) {
        *self.latest.lock() = Arc::new(MissileSnapshot::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::missile::{LauncherId, MissileId};
    use glam::Vec2;

    #[test]
    fn publish_keeps_only_active_missiles() {
        let store = SnapshotStore::new();
        let mut gone = Missile::at(MissileId(0), LauncherId(0), Vec2::new(100.0, 0.0), Vec2::ZERO, 75.0);
        gone.active = false;
        let live = Missile::at(MissileId(1), LauncherId(1), Vec2::new(0.0, 100.0), Vec2::ZERO, 75.0);

        store.publish(&[gone, live], 4.2);

        let snapshot = store.latest();
        assert_eq!(snapshot.game_time, 4.2);
        assert_eq!(snapshot.missiles.len(), 1);
        assert_eq!(snapshot.missiles[0].id, MissileId(1));
    }

    #[test]
    fn readers_keep_their_copy_across_publishes() {
        let store = SnapshotStore::new();
        let live = Missile::at(MissileId(1), LauncherId(1), Vec2::new(0.0, 100.0), Vec2::ZERO, 75.0);
        store.publish(&[live], 1.0);

        let held = store.latest();
        store.clear();

        assert_eq!(held.missiles.len(), 1);
        assert!(store.latest().missiles.is_empty());
        assert_eq!(store.latest().game_time, 0.0);
    }
}
