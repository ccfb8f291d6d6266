pub mod rate_limit;
pub mod router;
pub mod state;

pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use router::build_router;
pub use state::AppState;
