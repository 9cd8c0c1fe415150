use super::store::{AtomicCounterStore, CounterStore};
use super::types::{RateLimitConfig, RateLimitDecision, RecordStrategy};
use super::window::WindowKeyDeriver;
use crate::error::Result;
use crate::metrics;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// How admitted requests reach the store
enum RecordPath {
    ReadThenWrite(Arc<dyn CounterStore>),
    Atomic(Arc<dyn AtomicCounterStore>),
}

/// Fixed-window rate limiter over a shared counter store
///
/// Holds only immutable configuration and a store handle, so one instance can
/// be shared across request handlers without locking.
///
/// With [`RecordStrategy::ReadThenWrite`] the `GET` and the `SET` are separate
/// store calls. Two concurrent checks can read the same count, both admit, and
/// both write the same incremented value, so under contention a window can
/// admit more than its limit. [`RecordStrategy::Atomic`] closes that gap.
pub struct RateLimiter {
    config: RateLimitConfig,
    deriver: WindowKeyDeriver,
    path: RecordPath,
}

impl RateLimiter {
    /// Create a limiter that records with `GET` then `SET`
    pub fn new(config: RateLimitConfig, store: Arc<dyn CounterStore>) -> Result<Self> {
        Self::build(config, RecordPath::ReadThenWrite(store))
    }

    /// Create a limiter that records with an atomic increment
    pub fn atomic(config: RateLimitConfig, store: Arc<dyn AtomicCounterStore>) -> Result<Self> {
        Self::build(config, RecordPath::Atomic(store))
    }

    /// Create a limiter using the strategy named in `config`
    pub fn with_store<S>(config: RateLimitConfig, store: Arc<S>) -> Result<Self>
    where
        S: AtomicCounterStore + 'static,
    {
        match config.strategy {
            RecordStrategy::ReadThenWrite => Self::new(config, store),
            RecordStrategy::Atomic => Self::atomic(config, store),
        }
    }

    /// Fails with [`LimiterError::Config`](crate::error::LimiterError::Config)
    /// when the TTL is shorter than a window
    fn build(config: RateLimitConfig, path: RecordPath) -> Result<Self> {
        config.validate()?;
        let deriver = WindowKeyDeriver::new(config.key_prefix.clone(), config.granularity);

        info!(
            limit = config.limit,
            window_ttl_secs = config.window_ttl_secs,
            granularity = ?config.granularity,
            strategy = ?config.strategy,
            "Initializing fixed-window rate limiter"
        );

        Ok(Self {
            config,
            deriver,
            path,
        })
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn deriver(&self) -> &WindowKeyDeriver {
        &self.deriver
    }

    /// Check that the backing store is reachable
    pub async fn ping(&self) -> Result<()> {
        match &self.path {
            RecordPath::ReadThenWrite(store) => store.ping().await,
            RecordPath::Atomic(store) => store.ping().await,
        }
    }

    /// Decide whether a request arriving at `now` is admitted, recording it if so.
    ///
    /// Store errors are returned as-is: nothing is retried and no further
    /// store call is made for this check.
    pub async fn check_and_record(&self, now: DateTime<Utc>) -> Result<RateLimitDecision> {
        let key = self.deriver.derive_key(now);
        let started = Instant::now();

        let outcome = match &self.path {
            RecordPath::ReadThenWrite(store) => self.read_then_write(store.as_ref(), &key).await,
            RecordPath::Atomic(store) => self.increment_then_compare(store.as_ref(), &key).await,
        };
        let elapsed = started.elapsed().as_secs_f64();

        let (admitted, observed_count) = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Counter store error during rate limit check for {}: {}", key, e);
                metrics::record_check(metrics::OUTCOME_ERROR, elapsed);
                return Err(e);
            }
        };

        metrics::record_observed_count(observed_count);
        if admitted {
            debug!(
                "Rate limit check passed for key {}: observed={}, limit={}",
                key, observed_count, self.config.limit
            );
            metrics::record_check(metrics::OUTCOME_ADMITTED, elapsed);
        } else {
            warn!(
                "Rate limit exceeded for key {}: observed={}, limit={}",
                key, observed_count, self.config.limit
            );
            metrics::record_check(metrics::OUTCOME_REJECTED, elapsed);
        }

        Ok(RateLimitDecision {
            admitted,
            observed_count,
            limit: self.config.limit,
            reset_after: self.deriver.granularity().reset_after(&now),
        })
    }

    async fn read_then_write(&self, store: &dyn CounterStore, key: &str) -> Result<(bool, u64)> {
        let observed = match store.get(key).await? {
            Some(value) => value,
            None => {
                debug!("{} does not exist, window starts at zero", key);
                0
            }
        };

        let admitted = self.admits(observed);
        if admitted {
            // TTL is re-armed on every admit, so a busy key only expires after
            // a full TTL without admitted traffic
            store
                .set_with_expiry(key, observed.saturating_add(1), self.window_ttl())
                .await?;
        }

        Ok((admitted, observed))
    }

    async fn increment_then_compare(
        &self,
        store: &dyn AtomicCounterStore,
        key: &str,
    ) -> Result<(bool, u64)> {
        let current = store.increment_and_expire(key, self.window_ttl()).await?;
        let observed = current.saturating_sub(1);

        Ok((self.admits(observed), observed))
    }

    /// Inclusive: `limit + 1` requests are admitted per window
    fn admits(&self, observed: u64) -> bool {
        observed <= self.config.limit
    }

    fn window_ttl(&self) -> Duration {
        self.config.window_ttl()
    }
}
