//! Session tick loop and the handle used by HTTP/WebSocket clients

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::SimConfig;
use crate::store::MissileLog;
use crate::util::time::{tick_delta, SIMULATION_TICK};

use super::session::{Session, SessionError};
use super::view::SessionView;

/// Commands accepted by the session loop between ticks
#[derive(Debug)]
pub enum SessionCommand {
    /// Restart the session with the runner's configuration
    Reset(oneshot::Sender<Result<Uuid, SessionError>>),
    /// Stop the radar and exit the loop
    Shutdown(oneshot::Sender<Result<(), SessionError>>),
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("session loop has stopped")]
    Closed,

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Cloneable handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<SessionCommand>,
    view_rx: watch::Receiver<Arc<SessionView>>,
    log: Arc<MissileLog>,
}

impl SessionHandle {
    /// Latest published view
    pub fn view(&self) -> Arc<SessionView> {
        self.view_rx.borrow().clone()
    }

    /// Receiver that wakes on every published view
    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionView>> {
        self.view_rx.clone()
    }

    pub fn log(&self) -> &Arc<MissileLog> {
        &self.log
    }

    /// Reset the session; returns the new session id
    pub async fn reset(&self) -> Result<Uuid, RunnerError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(SessionCommand::Reset(tx))
            .await
            .map_err(|_| RunnerError::Closed)?;
        Ok(rx.await.map_err(|_| RunnerError::Closed)??)
    }

    /// Stop the session loop and wait for the radar to shut down
    pub async fn shutdown(&self) -> Result<(), RunnerError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(SessionCommand::Shutdown(tx))
            .await
            .map_err(|_| RunnerError::Closed)?;
        Ok(rx.await.map_err(|_| RunnerError::Closed)??)
    }
}

/// Owns the session and drives it at the fixed simulation rate
pub struct SessionRunner {
    session: Session,
    config: SimConfig,
    command_rx: mpsc::Receiver<SessionCommand>,
    view_tx: watch::Sender<Arc<SessionView>>,
}

impl SessionRunner {
    /// Wrap an initialized session
    pub fn new(session: Session, config: SimConfig) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (view_tx, view_rx) = watch::channel(Arc::new(SessionView::capture(&session)));

        let handle = SessionHandle {
            command_tx,
            view_rx,
            log: session.log().clone(),
        };

        let runner = Self {
            session,
            config,
            command_rx,
            view_tx,
        };

        (runner, handle)
    }

    /// Run the tick loop until shut down or every handle is dropped
    pub async fn run(mut self) {
        info!(session_id = %self.session.id, "Session loop started");

        let mut ticker = interval(SIMULATION_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            match self.process_commands().await {
                Ok(true) => {}
                Ok(false) => break,
                Err(reply) => {
                    let result = self.session.shutdown().await;
                    let _ = reply.send(result);
                    info!(session_id = %self.session.id, "Session loop stopped");
                    return;
                }
            }

            self.session.update(tick_delta());
            self.view_tx.send_replace(Arc::new(SessionView::capture(&self.session)));
        }

        if let Err(e) = self.session.shutdown().await {
            error!(session_id = %self.session.id, error = %e, "Session shutdown failed");
        }
        info!(session_id = %self.session.id, "All handles dropped, session loop stopped");
    }

    /// Drain pending commands.
    ///
    /// Returns `Ok(false)` when the channel is closed and `Err` with the
    /// acknowledgement sender when a shutdown was requested.
    async fn process_commands(
        &mut self,
    ) -> Result<bool, oneshot::Sender<Result<(), SessionError>>> {
        loop {
            match self.command_rx.try_recv() {
                Ok(SessionCommand::Reset(reply)) => {
                    let result = self.session.reset(self.config.clone()).await.map(|_| self.session.id);
                    if let Err(e) = &result {
                        warn!(error = %e, "Session reset failed; session stays stopped until the next reset");
                    }
                    self.view_tx.send_replace(Arc::new(SessionView::capture(&self.session)));
                    let _ = reply.send(result);
                }
                Ok(SessionCommand::Shutdown(reply)) => return Err(reply),
                Err(mpsc::error::TryRecvError::Empty) => return Ok(true),
                Err(mpsc::error::TryRecvError::Disconnected) => return Ok(false),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::session::Outcome;
    use crate::util::time::TokioClock;
    use std::time::Duration;

    fn spawn_runner() -> (tokio::task::JoinHandle<()>, SessionHandle) {
        let config = SimConfig {
            seed: Some(3),
            ..Default::default()
        };
        let mut session = Session::new(config.clone(), Arc::new(MissileLog::new()), Arc::new(TokioClock));
        session.initialize(config.clone()).unwrap();

        let (runner, handle) = SessionRunner::new(session, config);
        (tokio::spawn(runner.run()), handle)
    }

    #[tokio::test(start_paused = true)]
    async fn loop_publishes_views() {
        let (task, handle) = spawn_runner();
        let mut views = handle.subscribe();

        tokio::time::sleep(Duration::from_millis(300)).await;
        views.changed().await.unwrap();

        let view = handle.view();
        assert!(view.tick >= 5);
        assert_eq!(view.outcome, Outcome::InProgress);
        assert!(view.radar.operational);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn reset_starts_a_new_session() {
        let (task, handle) = spawn_runner();
        let before = handle.view().session_id;

        tokio::time::sleep(Duration::from_millis(100)).await;
        let after = handle.reset().await.unwrap();

        assert_ne!(before, after);
        assert_eq!(handle.view().session_id, after);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn commands_after_shutdown_report_closed() {
        let (task, handle) = spawn_runner();
        handle.shutdown().await.unwrap();
        task.await.unwrap();

        assert!(matches!(handle.reset().await, Err(RunnerError::Closed)));
    }
}
