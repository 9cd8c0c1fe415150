use super::window::{Granularity, DEFAULT_KEY_PREFIX};
use crate::error::{LimiterError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How an admitted request is recorded in the counter store
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordStrategy {
    /// `GET` the counter, decide, then `SET` the incremented value with a fresh TTL.
    ///
    /// Not atomic: concurrent callers can read the same value and both be admitted.
    #[default]
    ReadThenWrite,
    /// Increment and re-arm the TTL in one store operation, then compare.
    ///
    /// Rejected requests are counted too.
    Atomic,
}

/// Rate limit configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// A request is admitted while the window's count is at or below this value
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Expiry set on the window counter on every write (in seconds)
    #[serde(default = "default_window_ttl_secs")]
    pub window_ttl_secs: u64,
    /// Window granularity
    #[serde(default)]
    pub granularity: Granularity,
    /// Prefix of every window key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Store interaction used to record admitted requests
    #[serde(default)]
    pub strategy: RecordStrategy,
}

fn default_limit() -> u64 {
    30
}

fn default_window_ttl_secs() -> u64 {
    60
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            window_ttl_secs: default_window_ttl_secs(),
            granularity: Granularity::default(),
            key_prefix: default_key_prefix(),
            strategy: RecordStrategy::default(),
        }
    }
}

impl RateLimitConfig {
    /// Create a configuration with the given limit and TTL, other fields defaulted.
    ///
    /// The TTL is rounded up to whole seconds.
    pub fn new(limit: u64, window_ttl: Duration) -> Self {
        let mut window_ttl_secs = window_ttl.as_secs();
        if window_ttl.subsec_nanos() > 0 {
            window_ttl_secs = window_ttl_secs.saturating_add(1);
        }

        Self {
            limit,
            window_ttl_secs,
            ..Self::default()
        }
    }

    /// Reject settings under which a window counter could expire before its window closes
    pub fn validate(&self) -> Result<()> {
        if self.window_ttl_secs == 0 {
            return Err(LimiterError::Config(
                "Rate limit window TTL must be > 0".to_string(),
            ));
        }

        let window = self.granularity.window_length();
        if self.window_ttl() < window {
            return Err(LimiterError::Config(format!(
                "Rate limit window TTL ({}s) must be at least the window length ({}s)",
                self.window_ttl_secs,
                window.as_secs()
            )));
        }

        if self.key_prefix.is_empty() {
            return Err(LimiterError::Config(
                "Rate limit key prefix cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the window TTL as a Duration
    pub fn window_ttl(&self) -> Duration {
        Duration::from_secs(self.window_ttl_secs)
    }
}

/// Outcome of a single admission check. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub admitted: bool,
    /// Requests recorded in this window before this one
    pub observed_count: u64,
    /// Configured limit
    pub limit: u64,
    /// Time until the current window closes
    pub reset_after: Duration,
}

impl RateLimitDecision {
    /// Admits left in this window after this request.
    ///
    /// The comparison is inclusive, so a window holds `limit + 1` admits.
    pub fn remaining(&self) -> u64 {
        if self.admitted {
            self.limit.saturating_sub(self.observed_count)
        } else {
            0
        }
    }

    /// Seconds until reset, rounded up
    pub fn reset_after_secs(&self) -> u64 {
        let secs = self.reset_after.as_secs();
        if self.reset_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

/// JSON body returned for an admitted request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestCount {
    pub requests: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_config_defaults() {
        let config = RateLimitConfig::default();

        assert_eq!(config.limit, 30);
        assert_eq!(config.window_ttl(), Duration::from_secs(60));
        assert_eq!(config.granularity, Granularity::EpochMinute);
        assert_eq!(config.key_prefix, "requestCount");
        assert_eq!(config.strategy, RecordStrategy::ReadThenWrite);
    }

    #[test]
    fn test_sub_second_ttl_rounds_up() {
        let config = RateLimitConfig::new(1, Duration::from_millis(900));
        assert_eq!(config.window_ttl_secs, 1);
        assert_eq!(config.window_ttl(), Duration::from_secs(1));

        let config = RateLimitConfig::new(1, Duration::from_millis(60_001));
        assert_eq!(config.window_ttl(), Duration::from_secs(61));
    }

    #[test]
    fn test_validate_rejects_ttl_shorter_than_window() {
        let short = RateLimitConfig::new(1, Duration::from_millis(900));
        assert!(matches!(short.validate(), Err(LimiterError::Config(_))));

        let zero = RateLimitConfig::new(1, Duration::ZERO);
        assert!(zero.validate().is_err());

        let hourly = RateLimitConfig {
            granularity: Granularity::EpochHour,
            ..RateLimitConfig::new(1, Duration::from_secs(60))
        };
        assert!(hourly.validate().is_err());

        assert!(RateLimitConfig::new(1, Duration::from_secs(60))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_rate_limit_config_partial_yaml() {
        let config: RateLimitConfig = serde_yaml::from_str("limit: 5\nstrategy: atomic\n").unwrap();
        assert_eq!(config.limit, 5);
        assert_eq!(config.window_ttl_secs, 60);
        assert_eq!(config.strategy, RecordStrategy::Atomic);
    }

    #[test]
    fn test_decision_remaining() {
        let admitted = RateLimitDecision {
            admitted: true,
            observed_count: 2,
            limit: 2,
            reset_after: Duration::from_millis(1_500),
        };
        assert_eq!(admitted.remaining(), 0);
        assert_eq!(admitted.reset_after_secs(), 2);

        let first = RateLimitDecision {
            observed_count: 0,
            ..admitted.clone()
        };
        assert_eq!(first.remaining(), 2);

        let rejected = RateLimitDecision {
            admitted: false,
            observed_count: 3,
            ..admitted
        };
        assert_eq!(rejected.remaining(), 0);
    }

    #[test]
    fn test_request_count_json() {
        let body = serde_json::to_string(&RequestCount { requests: 7 }).unwrap();
        assert_eq!(body, r#"{"requests":7}"#);
    }
}
