//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::SessionHandle;
use crate::util::rate_limit::ResetLimiter;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: SessionHandle,
    pub reset_limiter: ResetLimiter,
}

impl AppState {
    pub fn new(config: Config, session: SessionHandle) -> Self {
        Self {
            config: Arc::new(config),
            session,
            reset_limiter: ResetLimiter::new(),
        }
    }
}
