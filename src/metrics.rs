// Metrics and observability module
// This file handles collection and reporting of exchange outcomes, per-step
// adapter latency and resolution failures for the router
//
// Numan Thabit 2025 Nov

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

pub static EXCHANGES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "router_exchanges_total",
        "exchange requests by outcome",
        &["outcome"]
    )
    .unwrap()
});

pub static STEP_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "router_step_latency_seconds",
        "latency of adapter calls",
        &["protocol", "step"]
    )
    .unwrap()
});

pub static RESOLUTION_FAILURES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "router_resolution_failures_total",
        "route resolution failures by case and missing lookup",
        &["case", "missing"]
    )
    .unwrap()
});

pub static ADMIN_OPS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "router_admin_operations_total",
        "administrative mutations by operation and outcome",
        &["operation", "outcome"]
    )
    .unwrap()
});

/// Render the default registry in the prometheus text format.
pub fn render() -> String {
    let mut buf = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(err) = encoder.encode(&prometheus::gather(), &mut buf) {
        tracing::warn!(error = %err, "failed to encode metrics");
    }
    String::from_utf8(buf).unwrap_or_default()
}
