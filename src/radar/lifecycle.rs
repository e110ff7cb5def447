//! Radar startup, shutdown and snapshot publishing

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Handle, TryCurrentError};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::game::missile::Missile;
use crate::store::EventLog;
use crate::util::time::{Clock, RADAR_SHUTDOWN_TIMEOUT};

use super::scan::{ScanError, ScanLoop};
use super::snapshot::SnapshotStore;
use super::state::{RadarGeometry, RadarStatus, SharedRadar};

/// Radar lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum RadarError {
    #[error("failed to start radar scan task: {0}")]
    Spawn(#[from] TryCurrentError),

    #[error("radar scan task is still running")]
    AlreadyRunning,

    #[error("radar scan task did not stop within {0:?}; abandoned")]
    ShutdownTimeout(Duration),
}

struct ScanTask {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Result<(), ScanError>>,
}

/// The radar: shared state, snapshot store and the scan task that drives them.
pub struct Radar {
    shared: SharedRadar,
    snapshots: SnapshotStore,
    log: Arc<dyn EventLog>,
    clock: Arc<dyn Clock>,
    shutdown_timeout: Duration,
    task: Option<ScanTask>,
}

impl Radar {
    pub fn new(geometry: RadarGeometry, log: Arc<dyn EventLog>, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: SharedRadar::new(geometry),
            snapshots: SnapshotStore::new(),
            log,
            clock,
            shutdown_timeout: RADAR_SHUTDOWN_TIMEOUT,
            task: None,
        }
    }

    /// Reset the radar state and start the scan task.
    ///
    /// A previous task must have been shut down first. If no runtime is
    /// available the radar is left non-operational and `Spawn` is returned;
    /// callers may carry on without detection.
    pub fn initialize(&mut self, geometry: RadarGeometry) -> Result<(), RadarError> {
        if self.task.is_some() {
            return Err(RadarError::AlreadyRunning);
        }

        self.shared.reset(geometry);
        self.snapshots.clear();

        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.set_operational(false);
                warn!(error = %e, "Radar running in degraded mode: no detection");
                return Err(RadarError::Spawn(e));
            }
        };

        let stop = Arc::new(AtomicBool::new(false));
        let scan = ScanLoop::new(
            self.shared.scan_port(),
            self.snapshots.clone(),
            self.log.clone(),
            self.clock.clone(),
            stop.clone(),
        );

        let handle = runtime.spawn(async move {
            let result = scan.run().await;
            if let Err(e) = &result {
                error!(error = %e, "Radar scan loop failed");
            }
            result
        });

        self.task = Some(ScanTask { stop, handle });
        info!(
            range = geometry.range,
            engagement_radius = geometry.engagement_radius,
            dead_zone_radius = geometry.dead_zone_radius,
            "Radar initialized"
        );
        Ok(())
    }

    /// Signal the scan task to stop and wait a bounded time for it.
    ///
    /// On timeout the task is aborted and the timeout is reported.
    pub async fn shutdown(&mut self) -> Result<(), RadarError> {
        let Some(mut task) = self.task.take() else {
            return Ok(());
        };

        task.stop.store(true, Ordering::Release);

        match tokio::time::timeout(self.shutdown_timeout, &mut task.handle).await {
            Ok(Ok(Ok(()))) => {
                info!("Radar shut down");
                Ok(())
            }
            Ok(Ok(Err(e))) => {
                warn!(error = %e, "Radar scan loop had already failed");
                Ok(())
            }
            Ok(Err(join_error)) => {
                error!(error = %join_error, "Radar scan task panicked");
                Ok(())
            }
            Err(_) => {
                task.handle.abort();
                warn!(
                    timeout_ms = self.shutdown_timeout.as_millis() as u64,
                    "Radar scan task did not stop in time; abandoning it"
                );
                Err(RadarError::ShutdownTimeout(self.shutdown_timeout))
            }
        }
    }

    /// Publish the active missiles for the scan loop
    pub fn publish_snapshot(&self, missiles: &[Missile], game_time: f32) {
        self.snapshots.publish(missiles, game_time);
    }

    pub fn shared(&self) -> &SharedRadar {
        &self.shared
    }

    pub fn status(&self) -> RadarStatus {
        self.shared.status()
    }

    pub fn set_operational(&self, operational: bool) {
        self.shared.set_operational(operational);
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .map(|t| !t.handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Radar {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.stop.store(true, Ordering::Release);
            if !task.handle.is_finished() {
                error!("Radar dropped without shutdown; aborting scan task");
                task.handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::game::missile::{LauncherId, MissileId};
    use crate::store::{EventStatus, MissileLog};
    use crate::util::time::TokioClock;
    use glam::Vec2;

    fn radar(log: Arc<MissileLog>) -> (Radar, RadarGeometry) {
        let geometry = RadarGeometry::from_config(&SimConfig::default());
        (Radar::new(geometry, log, Arc::new(TokioClock)), geometry)
    }

    #[test]
    fn no_runtime_means_degraded_mode() {
        let (mut radar, geometry) = radar(Arc::new(MissileLog::new()));

        let err = radar.initialize(geometry).unwrap_err();
        assert!(matches!(err, RadarError::Spawn(_)));
        assert!(!radar.status().operational);
        assert!(!radar.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn scan_task_detects_published_missile() {
        let log = Arc::new(MissileLog::new());
        let (mut radar, geometry) = radar(log.clone());
        radar.initialize(geometry).unwrap();
        assert!(radar.is_running());

        let missile = Missile::at(MissileId(9), LauncherId(1), Vec2::new(200.0, 0.0), Vec2::ZERO, 75.0);
        radar.publish_snapshot(&[missile], 3.0);

        tokio::time::sleep(Duration::from_millis(50)).await;

        let status = radar.status();
        assert_eq!(status.tracked_target, Some(MissileId(9)));
        assert_eq!(status.detection_time, Some(3.0));
        assert!(status.scan_angle > 0.0);
        assert_eq!(log.count(EventStatus::Detected), 1);

        radar.shutdown().await.unwrap();
        assert!(!radar.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_requires_shutdown() {
        let (mut radar, geometry) = radar(Arc::new(MissileLog::new()));
        radar.initialize(geometry).unwrap();

        assert!(matches!(radar.initialize(geometry), Err(RadarError::AlreadyRunning)));

        radar.shutdown().await.unwrap();
        radar.initialize(geometry).unwrap();
        radar.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_without_start_is_a_no_op() {
        let (mut radar, _) = radar(Arc::new(MissileLog::new()));
        tokio_test::assert_ok!(radar.shutdown().await);
    }
}
