// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metrics module
//!
//! Provides global metrics using the default Prometheus registry via macros and
//! an Axum-compatible metrics handler.

use std::sync::LazyLock;

use axum::{http::header, response::IntoResponse};
use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, TextEncoder, register_histogram_vec,
    register_int_counter, register_int_counter_vec,
};

use crate::error::ServerResult;

/// Completed requests, labeled by route group and status
pub static REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "api_http_requests_total",
        "Total number of completed HTTP requests",
        &["group", "status"]
    )
    .expect("Failed to create api_http_requests_total counter vec")
});

/// Request latency through the pipeline, labeled by route group
pub static REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "api_http_request_duration_seconds",
        "HTTP request durations in seconds",
        &["group"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to create api_http_request_duration_seconds histogram")
});

/// Requests slower than the configured threshold
pub static SLOW_REQUESTS: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "api_slow_requests_total",
        "Total number of requests above the slow-request threshold"
    )
    .expect("Failed to create api_slow_requests_total counter")
});

/// Rate limiter rejections, labeled by limiter
pub static RATE_LIMITED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "api_rate_limited_total",
        "Total number of requests rejected by a rate limiter",
        &["limiter"]
    )
    .expect("Failed to create api_rate_limited_total counter vec")
});

/// Dependency probe latency, labeled by dependency and result
pub static HEALTH_PROBE_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "api_health_probe_duration_seconds",
        "Dependency health probe durations in seconds",
        &["dependency", "result"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]
    )
    .expect("Failed to create api_health_probe_duration_seconds histogram")
});

/// Record a completed request
///
/// # Arguments
/// * `group` - Route group label
/// * `status` - Final status code, or `disconnected`
/// * `duration_secs` - Elapsed time in seconds
pub fn observe_request(group: &str, status: &str, duration_secs: f64) {
    REQUESTS_TOTAL.with_label_values(&[group, status]).inc();
    REQUEST_DURATION
        .with_label_values(&[group])
        .observe(duration_secs);
}

/// Count a request above the slow-request threshold
pub fn inc_slow_requests() {
    SLOW_REQUESTS.inc();
}

/// Count a rate limiter rejection
pub fn inc_rate_limited(limiter: &str) {
    RATE_LIMITED.with_label_values(&[limiter]).inc();
}

/// Observe the duration of a dependency probe
///
/// # Arguments
/// * `dependency` - Name of the probed dependency
/// * `result` - `healthy` or `unhealthy`
/// * `duration_secs` - The duration of the probe in seconds
pub fn observe_probe_duration(dependency: &str, result: &str, duration_secs: f64) {
    HEALTH_PROBE_DURATION
        .with_label_values(&[dependency, result])
        .observe(duration_secs);
}

/// Axum handler that exports metrics in Prometheus text format
pub async fn metrics_handler() -> ServerResult<impl IntoResponse> {
    let encoder = TextEncoder::new();
    let body = encoder
        .encode_to_string(&prometheus::gather())
        .map_err(anyhow::Error::from)?;

    Ok(([(header::CONTENT_TYPE, encoder.format_type().to_string())], body))
}
