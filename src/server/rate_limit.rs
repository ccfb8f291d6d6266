//! Per-client token-bucket rate limiting for the confirmation endpoint.
//!
//! Each confirmation request may spin up browser sessions; the ceiling here
//! is what keeps session creation bounded under load.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::debug;

#[derive(Clone, Copy, Debug)]
pub struct RateLimitConfig {
    /// Requests per minute per client key. Zero disables the limiter.
    pub confirm_per_min: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { confirm_per_min: 30 }
    }
}

pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    limits: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(limits: RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            limits,
        }
    }

    pub fn allow(&self, key: &str) -> bool {
        let capacity = self.limits.confirm_per_min;
        if capacity == 0 {
            return true;
        }
        let refill_per_sec = capacity as f64 / 60.0;

        let mut entry = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(capacity));
        entry.allow(capacity, refill_per_sec)
    }

    /// Drop buckets with no recent activity so the map stays bounded.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        if max_idle.is_zero() {
            return 0;
        }
        let now = Instant::now();
        let stale: Vec<String> = self
            .buckets
            .iter()
            .filter_map(|entry| {
                if entry.value().is_idle(now, max_idle) {
                    Some(entry.key().clone())
                } else {
                    None
                }
            })
            .collect();
        let mut removed = 0;
        for key in stale {
            if self.buckets.remove(&key).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Sweep idle buckets on a timer for the life of the process. Without
    /// this, every client key that ever hit the endpoint stays in the map.
    pub fn spawn_gc(self: &Arc<Self>, every: Duration, max_idle: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(every);
            loop {
                ticker.tick().await;
                let removed = limiter.prune_idle(max_idle);
                if removed > 0 {
                    debug!(removed, "pruned idle rate limit buckets");
                }
            }
        })
    }
}

struct TokenBucket {
    tokens: f64,
    last: Instant,
}

impl TokenBucket {
    fn new(capacity: u32) -> Self {
        Self {
            tokens: capacity as f64,
            last: Instant::now(),
        }
    }

    fn allow(&mut self, capacity: u32, refill_per_sec: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_per_sec).min(capacity as f64);
        self.last = now;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn is_idle(&self, now: Instant, max_idle: Duration) -> bool {
        now.duration_since(self.last) >= max_idle
    }
}
