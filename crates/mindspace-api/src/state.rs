//! Shared application state.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{Quota, RateLimiter};

use crate::config::RateLimitConfig;
use mindspace_db::Database;

pub type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Global rate limiter (None if rate limiting is disabled).
    pub rate_limiter: Option<Arc<GlobalRateLimiter>>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            rate_limiter: None,
        }
    }

    pub fn with_rate_limit(mut self, config: &RateLimitConfig) -> Self {
        self.rate_limiter = build_rate_limiter(config).map(Arc::new);
        self
    }
}

/// Allow `requests` per `period_secs`, refilling evenly, with the whole
/// allowance available as a burst.
pub fn build_rate_limiter(config: &RateLimitConfig) -> Option<GlobalRateLimiter> {
    if !config.enabled {
        return None;
    }
    let burst = NonZeroU32::new(config.requests)?;
    let quota = Quota::with_period(config.replenish_interval())?.allow_burst(burst);
    Some(RateLimiter::direct(quota))
}
