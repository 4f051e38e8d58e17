// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Route-group dispatch
//!
//! Inside `/api` the first path segment selects a route group, and each group
//! has a fixed, ordered list of guards. [`guard_route_group`] runs the list in
//! order; the first guard that rejects terminates the request with its own
//! response and later guards never run.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use shared_types::ApiVersion;

use super::{context::client_ip, guards};
use crate::state::ServerState;

/// Path prefix of the API namespace
pub const API_PREFIX: &str = "/api";

/// Route group of a path inside the API namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteGroup {
    /// `/health...`
    Health,
    /// `/<version>/...`
    Versioned {
        /// First path segment
        version: String,
        /// Whether the path is under `<version>/auth`
        auth: bool,
    },
    /// Anything else, including the API index
    Unguarded,
}

/// One stage of a route group's guard list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Health check limiter
    HealthLimiter,
    /// Versioned API limiter
    ApiLimiter,
    /// Supported version check
    ApiVersion,
    /// JSON content type check for mutating methods
    ContentType,
    /// Authentication endpoint limiter
    AuthLimiter,
}

impl RouteGroup {
    /// Classify a path relative to the API namespace (`/v1/users`)
    pub fn classify(path: &str) -> Self {
        let mut segments = path.trim_start_matches('/').split('/');
        let first = segments.next().unwrap_or_default();

        if first == "health" {
            Self::Health
        } else if ApiVersion::is_version_token(first) {
            Self::Versioned {
                version: first.to_string(),
                auth: segments.next() == Some("auth"),
            }
        } else {
            Self::Unguarded
        }
    }

    /// Classify a full request path, `None` outside the API namespace
    pub fn from_full_path(path: &str) -> Option<Self> {
        let rest = path.strip_prefix(API_PREFIX)?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(Self::classify(rest))
        } else {
            None
        }
    }

    /// Guards run for this group, in order
    pub fn guards(&self) -> &'static [Guard] {
        match self {
            Self::Health => &[Guard::HealthLimiter],
            Self::Versioned { auth: false, .. } => {
                &[Guard::ApiLimiter, Guard::ApiVersion, Guard::ContentType]
            }
            Self::Versioned { auth: true, .. } => &[
                Guard::ApiLimiter,
                Guard::ApiVersion,
                Guard::ContentType,
                Guard::AuthLimiter,
            ],
            Self::Unguarded => &[],
        }
    }

    /// Metrics label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Versioned { auth: false, .. } => "api",
            Self::Versioned { auth: true, .. } => "auth",
            Self::Unguarded => "api_index",
        }
    }
}

/// Metrics label for any request path
pub fn group_label(path: &str) -> &'static str {
    RouteGroup::from_full_path(path).map_or("site", |group| group.label())
}

/// Run the guards of the request's route group, then the handler
///
/// Layered on the nested API router, so the path it sees is relative to the
/// API namespace.
pub async fn guard_route_group(
    State(state): State<ServerState>,
    req: Request,
    next: Next,
) -> Response {
    let group = RouteGroup::classify(req.uri().path());

    match run_guards(&state, &group, &req) {
        Ok(headers) => {
            let mut response = next.run(req).await;
            response.headers_mut().extend(headers);
            response
        }
        Err(rejection) => rejection,
    }
}

fn run_guards(
    state: &ServerState,
    group: &RouteGroup,
    req: &Request,
) -> Result<HeaderMap, Response> {
    let client = client_ip(req);
    let limiters = state.rate_limiters();
    let mut headers = HeaderMap::new();

    for guard in group.guards() {
        match guard {
            Guard::HealthLimiter => {
                headers.extend(limiters.health.admit(client)?.unwrap_or_default());
            }
            Guard::ApiLimiter => headers.extend(limiters.api.admit(client)?.unwrap_or_default()),
            Guard::AuthLimiter => {
                headers.extend(limiters.auth.admit(client)?.unwrap_or_default());
            }
            Guard::ApiVersion => {
                if let RouteGroup::Versioned { version, .. } = group {
                    guards::check_api_version(version, &state.config().api.supported_versions)?;
                }
            }
            Guard::ContentType => guards::check_content_type(req.method(), req.headers())?,
        }
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versioned(version: &str, auth: bool) -> RouteGroup {
        RouteGroup::Versioned {
            version: version.to_string(),
            auth,
        }
    }

    #[test]
    fn classify_paths() {
        assert_eq!(RouteGroup::classify("/health"), RouteGroup::Health);
        assert_eq!(RouteGroup::classify("/health/simple"), RouteGroup::Health);
        assert_eq!(RouteGroup::classify("/v1/users"), versioned("v1", false));
        assert_eq!(RouteGroup::classify("/v2/users/7"), versioned("v2", false));
        assert_eq!(RouteGroup::classify("/v1/auth/login"), versioned("v1", true));
        assert_eq!(RouteGroup::classify("/"), RouteGroup::Unguarded);
        assert_eq!(RouteGroup::classify(""), RouteGroup::Unguarded);
        assert_eq!(RouteGroup::classify("/docs"), RouteGroup::Unguarded);
        // A lone "v" is not a version token
        assert_eq!(RouteGroup::classify("/v"), RouteGroup::Unguarded);
        // Any v-prefixed segment is treated as a version token
        assert_eq!(RouteGroup::classify("/vendors"), versioned("vendors", false));
    }

    #[test]
    fn classify_full_paths() {
        assert_eq!(RouteGroup::from_full_path("/api"), Some(RouteGroup::Unguarded));
        assert_eq!(
            RouteGroup::from_full_path("/api/health"),
            Some(RouteGroup::Health)
        );
        assert_eq!(RouteGroup::from_full_path("/apiary"), None);
        assert_eq!(RouteGroup::from_full_path("/"), None);

        assert_eq!(group_label("/api/v1/users"), "api");
        assert_eq!(group_label("/api/v1/auth/login"), "auth");
        assert_eq!(group_label("/nonexistent"), "site");
    }

    #[test]
    fn guard_order_per_group() {
        assert_eq!(RouteGroup::Health.guards(), &[Guard::HealthLimiter]);
        assert_eq!(
            versioned("v1", false).guards(),
            &[Guard::ApiLimiter, Guard::ApiVersion, Guard::ContentType]
        );
        assert_eq!(
            versioned("v1", true).guards(),
            &[
                Guard::ApiLimiter,
                Guard::ApiVersion,
                Guard::ContentType,
                Guard::AuthLimiter
            ]
        );
        assert!(RouteGroup::Unguarded.guards().is_empty());
    }
}
