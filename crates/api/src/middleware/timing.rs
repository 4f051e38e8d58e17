// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Request timing

use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::{context::RequestContext, dispatch::group_label};
use crate::{metrics, state::ServerState};

/// Elapsed-time response header
pub const RESPONSE_TIME_HEADER: HeaderName = HeaderName::from_static("x-response-time");

/// Records the elapsed time of one request exactly once
///
/// Either [`CompletionGuard::complete`] records it when the response is
/// produced, or dropping the guard records it when the request future is
/// dropped first.
#[derive(Debug)]
pub struct CompletionGuard {
    started_at: Instant,
    method: Method,
    path: String,
    slow_threshold: Duration,
    quiet: bool,
    recorded: bool,
}

impl CompletionGuard {
    /// Start timing a request
    pub fn start(
        started_at: Instant,
        method: Method,
        path: String,
        slow_threshold: Duration,
        quiet: bool,
    ) -> Self {
        Self {
            started_at,
            method,
            path,
            slow_threshold,
            quiet,
            recorded: false,
        }
    }

    /// Record completion with the final status and return the elapsed time
    pub fn complete(mut self, status: StatusCode) -> Duration {
        self.record(Some(status))
    }

    fn record(&mut self, status: Option<StatusCode>) -> Duration {
        let elapsed = self.started_at.elapsed();
        if self.recorded {
            return elapsed;
        }
        self.recorded = true;

        let group = group_label(&self.path);
        let status_label =
            status.map_or_else(|| "disconnected".to_string(), |s| s.as_u16().to_string());
        metrics::observe_request(group, &status_label, elapsed.as_secs_f64());

        if elapsed > self.slow_threshold {
            metrics::inc_slow_requests();
            if !self.quiet {
                warn!(
                    method = %self.method,
                    path = %self.path,
                    elapsed_ms = format_millis(elapsed),
                    "slow request"
                );
            }
        }

        if status.is_none() {
            debug!(method = %self.method, path = %self.path, "request dropped before completion");
        }

        elapsed
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if !self.recorded {
            self.record(None);
        }
    }
}

/// Milliseconds with two decimals
pub fn format_millis(elapsed: Duration) -> String {
    format!("{:.2}", elapsed.as_secs_f64() * 1_000.0)
}

/// Timing stage: measures the request and sets `x-response-time`
pub async fn time_request(State(state): State<ServerState>, req: Request, next: Next) -> Response {
    let (started_at, path) = req.extensions().get::<RequestContext>().map_or_else(
        || (Instant::now(), req.uri().path().to_string()),
        |context| (context.arrived_at, context.path().to_string()),
    );
    let config = state.config();
    let guard = CompletionGuard::start(
        started_at,
        req.method().clone(),
        path,
        config.limits.slow_request_threshold(),
        config.environment.is_test_mode(),
    );

    let mut response = next.run(req).await;
    let elapsed = guard.complete(response.status());

    if let Ok(value) = HeaderValue::from_str(&format!("{}ms", format_millis(elapsed))) {
        response.headers_mut().insert(RESPONSE_TIME_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard(threshold: Duration) -> CompletionGuard {
        CompletionGuard::start(
            Instant::now(),
            Method::GET,
            "/api/v1/users".to_string(),
            threshold,
            true,
        )
    }

    fn slow_requests() -> u64 {
        metrics::SLOW_REQUESTS.get()
    }

    #[test]
    fn millis_have_two_decimals() {
        assert_eq!(format_millis(Duration::from_micros(1_500)), "1.50");
        assert_eq!(format_millis(Duration::ZERO), "0.00");
        assert_eq!(format_millis(Duration::from_secs(2)), "2000.00");
    }

    #[test]
    fn completion_is_recorded_once() {
        let mut guard = guard(Duration::from_secs(60));
        let first = guard.record(Some(StatusCode::OK));
        assert!(guard.recorded);
        assert!(first < Duration::from_secs(60));

        // A later record, including the one in Drop, is a no-op
        let second = guard.record(None);
        assert!(second >= first);
        assert!(guard.recorded);
    }

    #[test]
    fn dropped_request_is_recorded() {
        let counter = metrics::REQUESTS_TOTAL.with_label_values(&["api", "disconnected"]);
        let before = counter.get();

        drop(guard(Duration::from_secs(60)));

        assert!(counter.get() > before);
    }

    #[test]
    fn slow_request_is_counted() {
        let before = slow_requests();
        let guard = CompletionGuard::start(
            Instant::now() - Duration::from_millis(20),
            Method::POST,
            "/api/v1/users".to_string(),
            Duration::from_millis(5),
            true,
        );
        guard.complete(StatusCode::CREATED);
        assert!(slow_requests() > before);
    }
}
