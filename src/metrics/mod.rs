use crate::error::{LimiterError, Result};
use axum::{
    body::Body,
    extract::State,
    http::{Response, StatusCode},
    response::IntoResponse,
};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome label values for `limiter_checks_total`
pub const OUTCOME_ADMITTED: &str = "admitted";
pub const OUTCOME_REJECTED: &str = "rejected";
pub const OUTCOME_ERROR: &str = "error";

/// Metrics service for collecting and exposing Prometheus metrics
#[derive(Clone)]
pub struct MetricsService {
    handle: Arc<PrometheusHandle>,
}

impl MetricsService {
    /// Create a new metrics service
    pub fn new() -> Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            LimiterError::Internal(format!("Failed to install metrics recorder: {}", e))
        })?;

        Self::register_metrics();

        info!("Metrics service initialized successfully");

        Ok(Self {
            handle: Arc::new(handle),
        })
    }

    fn register_metrics() {
        describe_counter!(
            "limiter_checks_total",
            "Total number of admission checks by outcome"
        );
        describe_histogram!(
            "limiter_check_duration_seconds",
            "Admission check latencies in seconds, store round trips included"
        );
        describe_gauge!(
            "limiter_observed_count",
            "Request count observed in the current window by the latest check"
        );

        debug!("All metrics registered with descriptions");
    }

    /// Render metrics in Prometheus format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Metrics endpoint handler
pub async fn metrics_handler(State(service): State<MetricsService>) -> impl IntoResponse {
    let metrics = service.render();
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(Body::from(metrics))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

/// Record the outcome of one admission check
pub fn record_check(outcome: &'static str, duration: f64) {
    let labels = [("outcome", outcome)];
    counter!("limiter_checks_total", &labels).increment(1);
    histogram!("limiter_check_duration_seconds", &labels).record(duration);
}

/// Record the count observed by the latest check
pub fn record_observed_count(count: u64) {
    gauge!("limiter_observed_count").set(count as f64);
}
