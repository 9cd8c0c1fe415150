use super::store::{AtomicCounterStore, CounterStore};
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Counter {
    value: u64,
    expires_at: Instant,
}

impl Counter {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-process counter store with per-key expiry
///
/// Expired counters are dropped lazily when read, or in bulk by
/// [`purge_expired`](Self::purge_expired). Only shared by limiters in the
/// same process.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: DashMap<String, Counter>,
}

impl MemoryCounterStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every expired counter, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.counters.len();
        self.counters.retain(|_, counter| counter.is_live(now));
        before.saturating_sub(self.counters.len())
    }

    /// Number of counters held, expired or not (for testing/monitoring)
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Periodically purge expired counters.
    ///
    /// The task stops on its own once the store is dropped.
    pub fn spawn_cleanup_task(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(live) = store.upgrade() else {
                    debug!("Counter store dropped, stopping cleanup task");
                    break;
                };
                let removed = live.purge_expired();
                if removed > 0 {
                    debug!("Purged {} expired window counters", removed);
                }
            }
        })
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, key: &str) -> Result<Option<u64>> {
        let now = Instant::now();
        match self.counters.get(key) {
            None => return Ok(None),
            Some(counter) if counter.is_live(now) => return Ok(Some(counter.value)),
            Some(_) => {}
        }

        // Re-checked under the shard lock: a concurrent write may have revived it
        self.counters
            .remove_if(key, |_, counter| !counter.is_live(Instant::now()));

        Ok(None)
    }

    async fn set_with_expiry(&self, key: &str, value: u64, ttl: Duration) -> Result<()> {
        self.counters.insert(
            key.to_string(),
            Counter {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl AtomicCounterStore for MemoryCounterStore {
    async fn increment_and_expire(&self, key: &str, ttl: Duration) -> Result<u64> {
        let now = Instant::now();
        let mut counter = self.counters.entry(key.to_string()).or_insert(Counter {
            value: 0,
            expires_at: now,
        });

        if !counter.is_live(now) {
            counter.value = 0;
        }
        counter.value = counter.value.saturating_add(1);
        counter.expires_at = now + ttl;

        Ok(counter.value)
    }
}
