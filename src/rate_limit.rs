//! Polite per-source spacing between processed items.
//!
//! After each item the pipeline waits `base_delay + jitter` seconds, where
//! `base_delay` is the source's own `rate_limit` (or the global
//! `default_rate_limit`) and jitter is drawn uniformly from `[0, 1)` so the
//! request pattern isn't perfectly regular.

use crate::config::SourceConfig;
use rand::{rng, Rng};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    default_delay: Duration,
    per_source: HashMap<String, Duration>,
    max_jitter: Duration,
}

impl RateLimiter {
    /// Build from the global default and every source's explicit `rate_limit`.
    pub fn new<'a>(default_delay: Duration, sources: impl IntoIterator<Item = &'a SourceConfig>) -> Self {
        let per_source = sources
            .into_iter()
            .filter_map(|s| s.rate_limit.map(|limit| (s.id.clone(), limit)))
            .collect();
        Self {
            default_delay,
            per_source,
            max_jitter: Duration::from_secs(1),
        }
    }

    /// Replace the `[0, 1s)` jitter window; zero disables jitter.
    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Configured delay for a source before jitter.
    pub fn base_delay(&self, source_id: &str) -> Duration {
        self.per_source
            .get(source_id)
            .copied()
            .unwrap_or(self.default_delay)
    }

    /// Base delay plus a fresh jitter sample.
    pub fn delay_for(&self, source_id: &str) -> Duration {
        let jitter = if self.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            self.max_jitter.mul_f64(rng().random_range(0.0..1.0))
        };
        self.base_delay(source_id).saturating_add(jitter)
    }

    /// Block the calling task for this source's delay.
    pub async fn apply(&self, source_id: &str) {
        let delay = self.delay_for(source_id);
        debug!(source = source_id, ?delay, "Rate limiting");
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}
