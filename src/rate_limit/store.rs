//! Counter store capabilities
//!
//! The limiter keeps no state of its own. Window counters live in a shared
//! store that can read a key, write a key with an expiry, and tell an absent
//! key apart from a zero value. Concurrent access safety is the store's job.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Get / set-with-expiry access to window counters
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Read a counter. `Ok(None)` means the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<u64>>;

    /// Write a counter and (re)arm its expiry
    async fn set_with_expiry(&self, key: &str, value: u64, ttl: Duration) -> Result<()>;

    /// Check that the store is reachable
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Stores that can increment a counter and re-arm its expiry as one atomic step
#[async_trait]
pub trait AtomicCounterStore: CounterStore {
    /// Increment the counter (creating it at 1 if absent) and return the new value
    async fn increment_and_expire(&self, key: &str, ttl: Duration) -> Result<u64>;
}

/// Expiry in whole milliseconds, never zero
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    ttl.as_millis().clamp(1, u64::MAX as u128) as u64
}
