// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Cross-origin policy

use std::sync::{Arc, LazyLock};

use axum::http::{
    HeaderName, HeaderValue, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
    request::Parts,
};
use regex::Regex;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::{CorsConfig, Environment};

static DEV_ORIGIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(localhost|127\.0\.0\.1|0\.0\.0\.0)(:\d+)?$")
        .expect("development origin pattern is valid")
});

const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");

/// Check an `Origin` header value against the policy
pub fn is_origin_allowed(origin: &str, allowed: &[String], environment: Environment) -> bool {
    allowed.iter().any(|o| o == origin)
        || (environment == Environment::Development && DEV_ORIGIN.is_match(origin))
}

/// Build the CORS layer for the configured origins
pub fn cors_layer(config: &CorsConfig, environment: Environment) -> CorsLayer {
    let allowed: Arc<[String]> = config.allowed_origins.clone().into();

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _: &Parts| {
                origin
                    .to_str()
                    .is_ok_and(|origin| is_origin_allowed(origin, &allowed, environment))
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, X_REQUESTED_WITH])
}
