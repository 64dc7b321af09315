//! Chunk-size advisory
//!
//! Queries that stream many records without a configured chunk size pay
//! for many small round trips. The advisor logs a hint once the threshold
//! is crossed, rate-limited process-wide.

use crate::config::AdvisorConfig;
use crate::rate_limit::RateLimiter;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::warn;

static GLOBAL: Lazy<Arc<ChunkSizeAdvisor>> =
    Lazy::new(|| Arc::new(ChunkSizeAdvisor::new(AdvisorConfig::from_env())));

/// Rate-limited "configure a chunk size" advisory
#[derive(Debug)]
pub struct ChunkSizeAdvisor {
    config: AdvisorConfig,
    limiter: RateLimiter,
}

impl ChunkSizeAdvisor {
    /// Create an advisor with its own rate limit
    pub fn new(config: AdvisorConfig) -> Self {
        let limiter = RateLimiter::per_period(config.min_interval, 1);
        Self { config, limiter }
    }

    /// The process-wide advisor, configured from the environment on first use
    pub fn global() -> Arc<ChunkSizeAdvisor> {
        Arc::clone(&GLOBAL)
    }

    /// Config in effect
    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Whether a query that emitted `total_emitted` records should be advised
    pub fn applies(&self, chunk_size: Option<usize>, total_emitted: u64) -> bool {
        self.config.enabled && chunk_size.is_none() && total_emitted > self.config.threshold
    }

    /// Log the advisory unless one was logged within the minimum interval
    ///
    /// Returns whether the advisory was logged.
    pub fn advise(&self, total_emitted: u64) -> bool {
        if !self.limiter.try_acquire() {
            return false;
        }
        warn!(
            total_emitted,
            threshold = self.config.threshold,
            "This query returned more than {} results without a chunk size; \
             set QueryOptions::chunk_size to reduce round trips",
            self.config.threshold
        );
        true
    }
}
