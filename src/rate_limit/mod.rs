//! Fixed-window rate limiting
//!
//! Every request is counted against one global counter per window. The
//! counter lives in a shared store (Redis, or an in-process map for single
//! node setups) and expires on its own after the configured TTL.
//!
//! - **Window keys**: wall-clock time is cut into calendar-aligned windows
//!   and each window maps to one store key
//! - **Admission**: a request is admitted while the count already recorded
//!   in its window is at or below the limit
//! - **Recording**: either `GET` then `SET` with a fresh TTL, or an atomic
//!   increment when the store supports it
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use window_limiter::rate_limit::{MemoryCounterStore, RateLimitConfig, RateLimiter};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(MemoryCounterStore::new());
//!     let limiter = RateLimiter::with_store(RateLimitConfig::default(), store)
//!         .expect("default config is valid");
//!
//!     let decision = limiter.check_and_record(chrono::Utc::now()).await.unwrap();
//!     assert!(decision.admitted);
//!
//!     // Or share a Redis counter across instances
//!     // let store = Arc::new(RedisCounterStore::connect("redis://cache:6379").await?);
//! }
//! ```

pub mod local;
pub mod lua_scripts;
pub mod middleware;
pub mod redis;
pub mod service;
pub mod store;
pub mod types;
pub mod window;

// Re-export commonly used types
pub use local::MemoryCounterStore;
pub use middleware::{check_handler, RateLimitState, RATE_LIMIT_REACHED};
pub use self::redis::RedisCounterStore;
pub use service::RateLimiter;
pub use store::{AtomicCounterStore, CounterStore};
pub use types::{RateLimitConfig, RateLimitDecision, RecordStrategy, RequestCount};
pub use window::{Granularity, WindowKeyDeriver};
