use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Result type for limiter operations
pub type Result<T> = std::result::Result<T, LimiterError>;

/// Limiter error types
///
/// A rejected request is not an error: it is reported through
/// [`RateLimitDecision::admitted`](crate::rate_limit::RateLimitDecision) so callers
/// can tell a 429 apart from a failing counter store.
#[derive(Error, Debug)]
pub enum LimiterError {
    #[error("Counter store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl LimiterError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            LimiterError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LimiterError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LimiterError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LimiterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the error came from the counter store
    pub fn is_store_error(&self) -> bool {
        matches!(self, LimiterError::StoreUnavailable(_))
    }
}

impl From<redis::RedisError> for LimiterError {
    fn from(err: redis::RedisError) -> Self {
        LimiterError::StoreUnavailable(err.to_string())
    }
}

impl From<::config::ConfigError> for LimiterError {
    fn from(err: ::config::ConfigError) -> Self {
        LimiterError::Config(err.to_string())
    }
}

impl IntoResponse for LimiterError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
