//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Session reset rate limit. Each reset restarts the radar scan task.
pub const RESET_RATE_LIMIT: u32 = 2;

/// Limiter shared by every reset entry point (HTTP and WebSocket)
#[derive(Clone)]
pub struct ResetLimiter {
    limiter: Arc<Limiter>,
}

impl ResetLimiter {
    pub fn new() -> Self {
        Self {
            limiter: create_limiter(RESET_RATE_LIMIT),
        }
    }

    /// Check if a reset is allowed (returns true if allowed)
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for ResetLimiter {
    fn default() -> Self {
        Self::new()
    }
}
