//! Metrics and observability utilities
//!
//! Metric descriptions and recording helpers with standardized naming.
//! Recording is a no-op until a recorder (e.g. the Prometheus exporter in
//! the gateway) is installed.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all AskForge metrics
pub const METRICS_PREFIX: &str = "askforge";

/// Histogram buckets for outbound model calls (in seconds)
pub const LLM_BUCKETS: &[f64] = &[
    0.250,
    0.500,
    1.000,
    2.000,
    5.000,
    10.00,
    20.00,
    30.00,
    60.00,
    120.0,
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Chat model metrics
    describe_counter!(
        format!("{}_llm_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total chat completion requests"
    );

    describe_histogram!(
        format!("{}_llm_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Chat completion latency in seconds"
    );

    // Embedding metrics
    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    describe_counter!(
        format!("{}_embedded_texts_total", METRICS_PREFIX),
        Unit::Count,
        "Total texts sent for embedding"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    // Workflow metrics
    describe_counter!(
        format!("{}_workflow_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Completed question-answering runs by branch"
    );

    describe_counter!(
        format!("{}_web_searches_total", METRICS_PREFIX),
        Unit::Count,
        "Total web search requests"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

fn status_label(success: bool) -> &'static str {
    if success { "success" } else { "error" }
}

/// Helper to record chat model calls
pub fn record_llm_call(duration_secs: f64, model: &str, success: bool) {
    counter!(
        format!("{}_llm_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status_label(success)
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_llm_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    }
}

/// Helper to record embedding metrics
pub fn record_embedding(duration_secs: f64, model: &str, batch_size: usize, success: bool) {
    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status_label(success)
    )
    .increment(1);

    if success {
        counter!(
            format!("{}_embedded_texts_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(batch_size as u64);

        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    }
}

/// Helper to record which branch a workflow run took
pub fn record_workflow_run(branch: &'static str) {
    counter!(
        format!("{}_workflow_runs_total", METRICS_PREFIX),
        "branch" => branch
    )
    .increment(1);
}

/// Helper to record web search calls
pub fn record_web_search(success: bool) {
    counter!(
        format!("{}_web_searches_total", METRICS_PREFIX),
        "status" => status_label(success)
    )
    .increment(1);
}
