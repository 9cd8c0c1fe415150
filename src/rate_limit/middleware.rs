use super::service::RateLimiter;
use super::types::{RateLimitDecision, RequestCount};
use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Body sent with every 429
pub const RATE_LIMIT_REACHED: &str = "Rate limit reached.";

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Shared state for the admission handler
#[derive(Clone)]
pub struct RateLimitState {
    limiter: Arc<RateLimiter>,
    clock: Clock,
}

impl RateLimitState {
    /// State reading the system clock
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self::with_clock(limiter, Utc::now)
    }

    /// State reading time from `clock`
    pub fn with_clock<F>(limiter: Arc<RateLimiter>, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        Self {
            limiter,
            clock: Arc::new(clock),
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

/// Admission handler: counts the request against the global window.
///
/// 200 with `{"requests": n}` when admitted, 429 when the limit is reached,
/// 500 with the store error text when the store fails.
pub async fn check_handler(State(state): State<RateLimitState>) -> Response {
    let now = (state.clock)();

    match state.limiter.check_and_record(now).await {
        Ok(decision) if decision.admitted => {
            let body = Json(RequestCount {
                requests: decision.observed_count,
            });
            add_rate_limit_headers(body.into_response(), &decision)
        }
        Ok(decision) => create_rate_limit_response(&decision),
        Err(e) => e.into_response(),
    }
}

/// Create a 429 Too Many Requests response
fn create_rate_limit_response(decision: &RateLimitDecision) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        "Retry-After",
        HeaderValue::from(decision.reset_after_secs()),
    );

    let response = (StatusCode::TOO_MANY_REQUESTS, headers, RATE_LIMIT_REACHED).into_response();
    add_rate_limit_headers(response, decision)
}

/// Add `X-RateLimit-*` headers describing the current window
pub fn add_rate_limit_headers(mut response: Response, decision: &RateLimitDecision) -> Response {
    let headers = response.headers_mut();

    headers.insert("X-RateLimit-Limit", HeaderValue::from(decision.limit));
    headers.insert(
        "X-RateLimit-Remaining",
        HeaderValue::from(decision.remaining()),
    );
    headers.insert(
        "X-RateLimit-Reset",
        HeaderValue::from(decision.reset_after_secs()),
    );

    response
}
