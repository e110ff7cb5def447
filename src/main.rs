//! Radar Defense Server - rotating radar point-defense simulation
//!
//! Runs one defense session at a fixed tick rate. Missiles launch from the
//! four corners toward the base; a rotating radar acquires them on its own
//! scan task and the session destroys them inside the engagement radius.
//! Session state is served over HTTP and streamed over WebSocket.

mod app;
mod config;
mod game;
mod http;
mod radar;
mod store;
mod util;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;
use crate::config::Config;
use crate::game::{Session, SessionRunner};
use crate::http::build_router;
use crate::store::MissileLog;
use crate::util::time::{init_server_time, TokioClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    init_tracing(&config.log_level);
    init_server_time();

    info!("Starting Radar Defense Server");
    info!("Server address: {}", config.server_addr);

    let mut session = Session::new(config.sim.clone(), Arc::new(MissileLog::new()), Arc::new(TokioClock));
    session.initialize(config.sim.clone())?;

    let (runner, session_handle) = SessionRunner::new(session, config.sim.clone());
    let runner_task = tokio::spawn(runner.run());

    let state = AppState::new(config.clone(), session_handle.clone());
    let router = build_router(state);

    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = session_handle.shutdown().await {
        error!(error = %e, "Session did not shut down cleanly");
    }
    if let Err(e) = runner_task.await {
        error!(error = %e, "Session loop panicked");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
