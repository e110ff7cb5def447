//! HTTP route definitions

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::missile::MissileId;
use crate::game::{Outcome, RunnerError, SessionView};
use crate::store::{EventLog, LogEntry};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

const DEFAULT_LOG_LIMIT: usize = 50;
const MAX_LOG_LIMIT: usize = 500;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CLIENT_ORIGIN is comma-separated, or `*` for any origin
    let origin = state.config.client_origin.trim();
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        let allowed: Vec<header::HeaderValue> = origin
            .split(',')
            .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
            .collect();
        AllowOrigin::list(allowed)
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/state", get(state_handler))
        .route("/log", get(log_handler))
        .route("/log/missiles/:id", get(missile_log_handler))
        .route("/session/reset", post(reset_handler))
        .route("/ws", get(ws_handler))
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    session_id: Uuid,
    outcome: Outcome,
    radar_operational: bool,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let view = state.session.view();

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        session_id: view.session_id,
        outcome: view.outcome,
        radar_operational: view.radar.operational,
    })
}

// ============================================================================
// Session endpoints
// ============================================================================

async fn state_handler(State(state): State<AppState>) -> Json<Arc<SessionView>> {
    Json(state.session.view())
}

#[derive(Serialize)]
struct ResetResponse {
    session_id: Uuid,
}

async fn reset_handler(State(state): State<AppState>) -> Result<Json<ResetResponse>, AppError> {
    if !state.reset_limiter.check() {
        warn!("Session reset rate limited");
        return Err(AppError::RateLimited);
    }

    let session_id = state.session.reset().await?;
    info!(session_id = %session_id, "Session reset over HTTP");

    Ok(Json(ResetResponse { session_id }))
}

// ============================================================================
// Missile log endpoints
// ============================================================================

#[derive(Deserialize)]
struct LogQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct LogResponse {
    total: usize,
    entries: Vec<LogEntry>,
}

async fn log_handler(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Result<Json<LogResponse>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    if limit == 0 || limit > MAX_LOG_LIMIT {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LOG_LIMIT
        )));
    }

    let log = state.session.log();
    Ok(Json(LogResponse {
        total: log.len(),
        entries: log.last_entries(limit),
    }))
}

async fn missile_log_handler(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<LogEntry>, AppError> {
    state
        .session
        .log()
        .last_entry_for(MissileId(id))
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no log entries for missile {}", id)))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RunnerError> for AppError {
    fn from(e: RunnerError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::config::{Config, SimConfig};
    use crate::game::missile::LauncherId;
    use crate::game::{Session, SessionHandle, SessionRunner};
    use crate::store::{EventStatus, MissileLog};
    use crate::util::time::TokioClock;

    fn app() -> (Router, SessionHandle) {
        let sim = SimConfig {
            seed: Some(5),
            ..Default::default()
        };
        let config = Config {
            server_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "info".into(),
            client_origin: "*".into(),
            sim: sim.clone(),
        };

        let mut session = Session::new(sim.clone(), Arc::new(MissileLog::new()), Arc::new(TokioClock));
        session.initialize(sim.clone()).unwrap();
        let (runner, handle) = SessionRunner::new(session, sim);
        tokio::spawn(runner.run());

        (build_router(AppState::new(config, handle.clone())), handle)
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn health_reports_session() {
        let (router, handle) = app();
        let (status, body) = get_json(router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["session_id"], handle.view().session_id.to_string());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn state_returns_view() {
        let (router, handle) = app();
        let (status, body) = get_json(router, "/state").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["launchers"].as_array().map(Vec::len), Some(4));
        assert_eq!(body["outcome"], "in_progress");
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn log_limit_is_validated() {
        let (router, handle) = app();
        let (status, body) = get_json(router.clone(), "/log?limit=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("limit"));

        handle
            .log()
            .record(LogEntry::missile(MissileId(0), LauncherId(1), 1.5, EventStatus::Launched));
        let (status, body) = get_json(router, "/log?limit=10").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["entries"][0]["status"], "launched");
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_missile_is_not_found() {
        let (router, handle) = app();
        let (status, _) = get_json(router, "/log/missiles/999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn reset_is_rate_limited() {
        let (router, handle) = app();
        let reset = || Request::builder().method("POST").uri("/session/reset").body(Body::empty()).unwrap();

        let mut statuses = Vec::new();
        for _ in 0..3 {
            statuses.push(router.clone().oneshot(reset()).await.unwrap().status());
        }

        assert_eq!(statuses[0], StatusCode::OK);
        assert_eq!(statuses[2], StatusCode::TOO_MANY_REQUESTS);
        handle.shutdown().await.unwrap();
    }
}
