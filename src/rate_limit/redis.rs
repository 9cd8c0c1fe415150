use super::lua_scripts::INCREMENT_AND_EXPIRE_SCRIPT;
use super::store::{ttl_millis, AtomicCounterStore, CounterStore};
use crate::error::Result;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Script};
use std::time::Duration;
use tracing::{debug, info};

/// Redis-backed counter store
///
/// `ConnectionManager` is cheap to clone and reconnects on its own, so every
/// call works on its own handle and no lock is held across awaits.
pub struct RedisCounterStore {
    /// Redis connection manager
    connection: ConnectionManager,
    /// Increment-and-expire script
    increment_script: Script,
}

impl RedisCounterStore {
    /// Connect to Redis
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;

        info!(url = %redis_url, "Connected to Redis counter store");

        Ok(Self {
            connection,
            increment_script: Script::new(INCREMENT_AND_EXPIRE_SCRIPT),
        })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn get(&self, key: &str) -> Result<Option<u64>> {
        let mut connection = self.connection.clone();
        let value: Option<u64> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut connection)
            .await?;

        if value.is_none() {
            debug!("{} does not exist", key);
        }

        Ok(value)
    }

    async fn set_with_expiry(&self, key: &str, value: u64, ttl: Duration) -> Result<()> {
        let mut connection = self.connection.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async::<_, ()>(&mut connection)
            .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut connection = self.connection.clone();
        let pong: String = redis::cmd("PING").query_async(&mut connection).await?;
        debug!("Redis ping: {}", pong);
        Ok(())
    }
}

#[async_trait]
impl AtomicCounterStore for RedisCounterStore {
    async fn increment_and_expire(&self, key: &str, ttl: Duration) -> Result<u64> {
        let mut connection = self.connection.clone();
        let value = self
            .increment_script
            .key(key)
            .arg(ttl_millis(ttl))
            .invoke_async::<_, u64>(&mut connection)
            .await?;

        Ok(value)
    }
}
