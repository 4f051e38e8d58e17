// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! API hardening headers
//!
//! Two sets: the fixed API headers every response gets from
//! [`security_headers`], and the browser hardening headers of
//! [`hardening_headers`], which the server installs with
//! `SetResponseHeaderLayer::if_not_present` so handlers can override them.

use axum::{
    extract::Request,
    http::{
        HeaderMap, HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, EXPIRES, PRAGMA, REFERRER_POLICY, SERVER,
            STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS, X_DNS_PREFETCH_CONTROL,
            X_FRAME_OPTIONS, X_XSS_PROTECTION,
        },
    },
    middleware::Next,
    response::Response,
};

use crate::config::Environment;

/// API version marker header
pub const API_VERSION_HEADER: HeaderName = HeaderName::from_static("x-api-version");
/// Rate limit marker header
pub const RATE_LIMIT_APPLIED_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-applied");

const POWERED_BY_HEADER: HeaderName = HeaderName::from_static("x-powered-by");

const CONTENT_SECURITY_POLICY_VALUE: &str = "default-src 'self';base-uri 'self';\
    font-src 'self' https: data:;form-action 'self';frame-ancestors 'self';\
    img-src 'self' data: https:;object-src 'none';script-src 'self';\
    script-src-attr 'none';style-src 'self' 'unsafe-inline';connect-src 'self';\
    upgrade-insecure-requests";

/// Browser hardening headers for `environment`
///
/// The content security policy is left out in development.
pub fn hardening_headers(environment: Environment) -> Vec<(HeaderName, HeaderValue)> {
    let mut headers = vec![
        (
            HeaderName::from_static("cross-origin-opener-policy"),
            HeaderValue::from_static("same-origin"),
        ),
        (
            HeaderName::from_static("cross-origin-resource-policy"),
            HeaderValue::from_static("same-origin"),
        ),
        (
            HeaderName::from_static("origin-agent-cluster"),
            HeaderValue::from_static("?1"),
        ),
        (REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
        (
            STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        ),
        (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
        (
            HeaderName::from_static("x-download-options"),
            HeaderValue::from_static("noopen"),
        ),
        (X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
        (
            HeaderName::from_static("x-permitted-cross-domain-policies"),
            HeaderValue::from_static("none"),
        ),
        (X_XSS_PROTECTION, HeaderValue::from_static("0")),
    ];

    if !environment.is_development() {
        headers.push((
            CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY_VALUE),
        ));
    }
    headers
}

/// Strip server identification and set the fixed API headers
///
/// Calling it again on the same headers leaves them unchanged.
pub fn apply_security_headers(headers: &mut HeaderMap) {
    headers.remove(SERVER);
    headers.remove(POWERED_BY_HEADER);

    headers.insert(API_VERSION_HEADER, HeaderValue::from_static("v1"));
    headers.insert(RATE_LIMIT_APPLIED_HEADER, HeaderValue::from_static("true"));
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
}

/// Security header stage
pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    apply_security_headers(response.headers_mut());
    response
}
