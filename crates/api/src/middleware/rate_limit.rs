// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Fixed-window rate limiting keyed by client address
//!
//! The site limiter counts every request the server receives. The route-group
//! limiters run later, from [`super::dispatch`], and their headers take
//! precedence over the site limiter's on the same response.

use std::{
    net::IpAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use shared_types::ErrorBody;
use tracing::{debug, warn};

use super::context::client_ip;
use crate::{
    config::{RateLimitRule, RateLimitingConfig},
    metrics,
    state::ServerState,
};

const MAX_RATE_LIMIT_ENTRIES: usize = 10_000;

/// `RateLimit-Limit` response header
pub const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
/// `RateLimit-Remaining` response header
pub const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
/// `RateLimit-Reset` response header
pub const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// One fixed-window limiter with its own per-client windows
#[derive(Debug, Clone)]
pub struct RateLimiter {
    name: &'static str,
    message: &'static str,
    rule: RateLimitRule,
    enabled: bool,
    // Entry-level locking makes increment-and-check atomic per client
    windows: Arc<DashMap<IpAddr, RequestCounter>>,
}

#[derive(Debug, Clone)]
struct RequestCounter {
    count: u32,
    window_start: Instant,
}

/// Result of counting one request against a limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request is admitted
    pub allowed: bool,
    /// Ceiling of the window
    pub limit: u32,
    /// Requests left in the current window
    pub remaining: u32,
    /// Time until the current window rotates
    pub reset_after: Duration,
}

impl RateLimitDecision {
    /// Standard rate-limit headers for this decision
    pub fn headers(&self) -> HeaderMap {
        let reset = self.reset_after.as_secs() + u64::from(self.reset_after.subsec_nanos() > 0);
        let mut headers = HeaderMap::with_capacity(4);
        headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(RATE_LIMIT_RESET, HeaderValue::from(reset));
        if !self.allowed {
            headers.insert(RETRY_AFTER, HeaderValue::from(reset));
        }
        headers
    }
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(
        name: &'static str,
        message: &'static str,
        rule: RateLimitRule,
        enabled: bool,
    ) -> Self {
        Self {
            name,
            message,
            rule,
            enabled,
            windows: Arc::new(DashMap::new()),
        }
    }

    /// Limiter for every route of the site
    pub fn site(rule: RateLimitRule, enabled: bool) -> Self {
        Self::new(
            "site",
            "Too many requests from this IP, please try again later.",
            rule,
            enabled,
        )
    }

    /// Limiter for versioned API routes
    pub fn api(rule: RateLimitRule, enabled: bool) -> Self {
        Self::new(
            "api",
            "Too many API requests from this IP, please try again later.",
            rule,
            enabled,
        )
    }

    /// Limiter for authentication endpoints
    pub fn auth(rule: RateLimitRule, enabled: bool) -> Self {
        Self::new(
            "auth",
            "Too many authentication attempts from this IP, please try again later.",
            rule,
            enabled,
        )
    }

    /// Limiter for health checks
    pub fn health(rule: RateLimitRule, enabled: bool) -> Self {
        Self::new(
            "health",
            "Too many health check requests from this IP.",
            rule,
            enabled,
        )
    }

    /// Limiter name used in logs and metrics
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check if rate limiting is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of tracked clients
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Count a request from `ip` in the current window
    pub fn check(&self, ip: IpAddr) -> RateLimitDecision {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> RateLimitDecision {
        let window = self.rule.window();

        // Periodically clean up expired entries to prevent memory leaks
        if self.windows.len() > MAX_RATE_LIMIT_ENTRIES {
            self.cleanup_expired_entries(now, window);
        }

        let counter = self
            .windows
            .entry(ip)
            .and_modify(|counter| {
                if now.saturating_duration_since(counter.window_start) >= window {
                    counter.count = 1;
                    counter.window_start = now;
                } else {
                    counter.count = counter.count.saturating_add(1);
                }
            })
            .or_insert_with(|| RequestCounter {
                count: 1,
                window_start: now,
            })
            .clone();

        let limit = self.rule.max_requests;
        let elapsed = now.saturating_duration_since(counter.window_start);

        RateLimitDecision {
            allowed: counter.count <= limit,
            limit,
            remaining: limit.saturating_sub(counter.count),
            reset_after: window.saturating_sub(elapsed),
        }
    }

    /// Count a request and either admit it with its rate-limit headers or
    /// produce the 429 response
    pub fn admit(&self, ip: IpAddr) -> Result<Option<HeaderMap>, Response> {
        if !self.enabled {
            return Ok(None);
        }

        let decision = self.check(ip);
        if decision.allowed {
            return Ok(Some(decision.headers()));
        }

        warn!(limiter = self.name, client = %ip, "rate limit exceeded");
        metrics::inc_rate_limited(self.name);

        let body = ErrorBody::new(StatusCode::TOO_MANY_REQUESTS.as_u16(), self.message)
            .with("retryAfter", self.rule.window_label());
        Err((
            StatusCode::TOO_MANY_REQUESTS,
            decision.headers(),
            Json(body.into_envelope()),
        )
            .into_response())
    }

    /// Clean up expired entries using efficient retain operation
    fn cleanup_expired_entries(&self, now: Instant, window: Duration) {
        let entries_before = self.windows.len();

        self.windows
            .retain(|_, counter| now.saturating_duration_since(counter.window_start) < window);

        let entries_after = self.windows.len();
        let cleaned_up = entries_before.saturating_sub(entries_after);

        if cleaned_up > 0 {
            debug!(limiter = self.name, cleaned_up, "cleaned up expired rate limiter entries");
        }

        // If still too many entries, remove oldest ones
        if entries_after > MAX_RATE_LIMIT_ENTRIES {
            warn!(
                limiter = self.name,
                entries_after, "rate limiter still over capacity after cleanup, removing oldest"
            );

            let mut oldest_entries: Vec<_> = self
                .windows
                .iter()
                .map(|entry| (*entry.key(), entry.value().window_start))
                .collect();

            oldest_entries.sort_by_key(|(_, window_start)| *window_start);

            let entries_to_remove = entries_after - MAX_RATE_LIMIT_ENTRIES / 2;
            for (ip, _) in oldest_entries.into_iter().take(entries_to_remove) {
                self.windows.remove(&ip);
            }
        }
    }
}

/// The limiters of the service, each with its own client windows
#[derive(Debug, Clone)]
pub struct RateLimiters {
    /// Every route
    pub site: RateLimiter,
    /// Versioned API routes
    pub api: RateLimiter,
    /// Authentication endpoints
    pub auth: RateLimiter,
    /// Health checks
    pub health: RateLimiter,
}

impl RateLimiters {
    /// Build fresh limiters from configuration
    pub fn from_config(config: &RateLimitingConfig) -> Self {
        Self {
            site: RateLimiter::site(config.site, config.enabled),
            api: RateLimiter::api(config.api, config.enabled),
            auth: RateLimiter::auth(config.auth, config.enabled),
            health: RateLimiter::health(config.health, config.enabled),
        }
    }
}

/// Site-wide limiter stage
pub async fn limit_site(State(state): State<ServerState>, req: Request, next: Next) -> Response {
    let client = client_ip(&req);

    match state.rate_limiters().site.admit(client) {
        Ok(headers) => {
            let mut response = next.run(req).await;
            for (name, value) in &headers.unwrap_or_default() {
                response
                    .headers_mut()
                    .entry(name)
                    .or_insert_with(|| value.clone());
            }
            response
        }
        Err(rejection) => rejection,
    }
}
