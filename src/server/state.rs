use std::sync::Arc;

use crate::orchestrator::Orchestrator;

use super::rate_limit::{RateLimitConfig, RateLimiter};

/// Shared handler state. Everything inside is read-only or internally
/// synchronized; nothing is mutated per request beyond limiter buckets.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, limits: RateLimitConfig) -> Self {
        Self {
            orchestrator,
            rate_limiter: Arc::new(RateLimiter::new(limits)),
        }
    }
}
