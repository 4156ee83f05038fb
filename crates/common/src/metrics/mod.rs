//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Trades CMS metrics
pub const METRICS_PREFIX: &str = "trades";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
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

    // Coverage gate
    describe_counter!(
        format!("{}_coverage_gate_total", METRICS_PREFIX),
        Unit::Count,
        "Coverage visibility decisions by outcome"
    );

    // Leads
    describe_counter!(
        format!("{}_leads_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total leads captured"
    );

    describe_counter!(
        format!("{}_leads_rate_limited_total", METRICS_PREFIX),
        Unit::Count,
        "Lead submissions rejected by the per-client limiter"
    );

    // Page tree maintenance
    describe_counter!(
        format!("{}_pagetree_moves_total", METRICS_PREFIX),
        Unit::Count,
        "Pages re-parented under a canonical node"
    );

    describe_counter!(
        format!("{}_pagetree_deletes_total", METRICS_PREFIX),
        Unit::Count,
        "Duplicate pages hard-deleted"
    );

    describe_counter!(
        format!("{}_pagetree_archived_total", METRICS_PREFIX),
        Unit::Count,
        "Duplicate pages archived in place after a failed delete"
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

/// Record a coverage visibility decision (`visible`, `draft`, `incomplete`, `no_testimonial`)
pub fn record_coverage_gate(outcome: &'static str) {
    counter!(
        format!("{}_coverage_gate_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);
}

/// Helper to record lead capture
pub fn record_lead(accepted: bool) {
    if accepted {
        counter!(format!("{}_leads_created_total", METRICS_PREFIX)).increment(1);
    } else {
        counter!(format!("{}_leads_rate_limited_total", METRICS_PREFIX)).increment(1);
    }
}

/// Helper to record one reconciliation pass over a content type
pub fn record_reconcile(content_type: &str, moved: u64, deleted: u64, archived: u64) {
    counter!(
        format!("{}_pagetree_moves_total", METRICS_PREFIX),
        "content_type" => content_type.to_string()
    )
    .increment(moved);

    counter!(
        format!("{}_pagetree_deletes_total", METRICS_PREFIX),
        "content_type" => content_type.to_string()
    )
    .increment(deleted);

    counter!(
        format!("{}_pagetree_archived_total", METRICS_PREFIX),
        "content_type" => content_type.to_string()
    )
    .increment(archived);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("GET", "/api/coverage");
        metrics.finish(404);
        record_coverage_gate("incomplete");
        record_reconcile("servicesindexpage", 3, 2, 0);
        // No recorder installed: just verify it runs without panic
    }
}
