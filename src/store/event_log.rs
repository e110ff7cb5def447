//! Append-only missile event log

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use crate::game::missile::{LauncherId, MissileId};

/// What happened to a missile (or to the session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Launched,
    Detected,
    LostDeadZone,
    Destroyed,
    BaseHit,
    Victory,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EventStatus::Launched => "launched",
            EventStatus::Detected => "detected",
            EventStatus::LostDeadZone => "lost (dead zone)",
            EventStatus::Destroyed => "destroyed",
            EventStatus::BaseHit => "base hit",
            EventStatus::Victory => "victory",
        };
        f.write_str(text)
    }
}

/// A single recorded event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub missile_id: Option<MissileId>,
    pub launcher_id: Option<LauncherId>,
    /// Simulation clock at the time of the event (seconds)
    pub timestamp: f32,
    pub status: EventStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl LogEntry {
    /// Event about a specific missile
    pub fn missile(missile_id: MissileId, launcher_id: LauncherId, timestamp: f32, status: EventStatus) -> Self {
        Self {
            missile_id: Some(missile_id),
            launcher_id: Some(launcher_id),
            timestamp,
            status,
            note: None,
            recorded_at: Utc::now(),
        }
    }

    /// Session-wide event with no missile attached
    pub fn session(timestamp: f32, status: EventStatus) -> Self {
        Self {
            missile_id: None,
            launcher_id: None,
            timestamp,
            status,
            note: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Sink for missile events, shared by the scan loop and the simulation loop.
///
/// Implementations must not acquire any other lock while recording: callers
/// may hold the radar lock when they call [`EventLog::record`].
pub trait EventLog: Send + Sync {
    fn record(&self, entry: LogEntry);

    /// Most recent entry for the given missile
    fn last_entry_for(&self, missile_id: MissileId) -> Option<LogEntry>;

    /// The last `count` entries, oldest first
    fn last_entries(&self, count: usize) -> Vec<LogEntry>;

    fn clear(&self);
}

#[derive(Default)]
struct LogInner {
    entries: Vec<LogEntry>,
    latest_by_missile: HashMap<MissileId, usize>,
}

/// In-memory event log
#[derive(Default)]
pub struct MissileLog {
    inner: Mutex<LogInner>,
}

impl MissileLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }
}

#[cfg(test)]
impl MissileLog {
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count of entries with the given status
    pub(crate) fn count(&self, status: EventStatus) -> usize {
        self.inner
            .lock()
            .entries
            .iter()
            .filter(|e| e.status == status)
            .count()
    }
}

impl EventLog for MissileLog {
    fn record(&self, entry: LogEntry) {
        info!(
            target: "missile_log",
            missile_id = ?entry.missile_id.map(|id| id.0),
            launcher_id = ?entry.launcher_id.map(|id| id.0),
            t = entry.timestamp,
            note = entry.note.as_deref().unwrap_or(""),
            "{}", entry.status
        );

        let mut inner = self.inner.lock();
        let index = inner.entries.len();
        if let Some(missile_id) = entry.missile_id {
            inner.latest_by_missile.insert(missile_id, index);
        }
        inner.entries.push(entry);
    }

    fn last_entry_for(&self, missile_id: MissileId) -> Option<LogEntry> {
        let inner = self.inner.lock();
        inner
            .latest_by_missile
            .get(&missile_id)
            .and_then(|&i| inner.entries.get(i))
            .cloned()
    }

    fn last_entries(&self, count: usize) -> Vec<LogEntry> {
        let inner = self.inner.lock();
        let start = inner.entries.len().saturating_sub(count);
        inner.entries[start..].to_vec()
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.latest_by_missile.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_entry_tracks_latest_status_per_missile() {
        let log = MissileLog::new();
        log.record(LogEntry::missile(MissileId(0), LauncherId(1), 1.0, EventStatus::Launched));
        log.record(LogEntry::missile(MissileId(1), LauncherId(2), 2.0, EventStatus::Launched));
        log.record(LogEntry::missile(MissileId(0), LauncherId(1), 3.5, EventStatus::Detected));

        let last = log.last_entry_for(MissileId(0)).unwrap();
        assert_eq!(last.status, EventStatus::Detected);
        assert_eq!(last.timestamp, 3.5);
        assert_eq!(log.last_entry_for(MissileId(1)).unwrap().status, EventStatus::Launched);
        assert!(log.last_entry_for(MissileId(7)).is_none());
    }

    #[test]
    fn last_entries_are_chronological() {
        let log = MissileLog::new();
        for i in 0..5u32 {
            log.record(LogEntry::missile(MissileId(i), LauncherId(0), i as f32, EventStatus::Launched));
        }
        log.record(LogEntry::session(9.0, EventStatus::Victory));

        let tail = log.last_entries(3);
        let stamps: Vec<f32> = tail.iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![3.0, 4.0, 9.0]);
        assert_eq!(log.last_entries(100).len(), 6);
    }

    #[test]
    fn clear_drops_index_too() {
        let log = MissileLog::new();
        log.record(LogEntry::missile(MissileId(3), LauncherId(0), 0.5, EventStatus::Launched));
        log.clear();
        assert!(log.is_empty());
        assert!(log.last_entry_for(MissileId(3)).is_none());
    }

    #[test]
    fn status_text_matches_display() {
        assert_eq!(EventStatus::LostDeadZone.to_string(), "lost (dead zone)");
        assert_eq!(EventStatus::BaseHit.to_string(), "base hit");
    }
}
