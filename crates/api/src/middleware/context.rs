// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Request context tagging
//!
//! The first stage of the pipeline. It builds the [`RequestContext`] for the
//! request, stores it in the request extensions and echoes the correlation id
//! in the `x-request-id` response header.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Instant,
};

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, connect_info::MockConnectInfo},
    http::{
        HeaderName, HeaderValue, Method, Uri,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Correlation id header, set on the request and echoed on the response
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const RANDOM_SUFFIX_LEN: usize = 9;

/// Request-scoped facts captured at pipeline entry
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id
    pub correlation_id: Arc<str>,
    /// Arrival instant
    pub arrived_at: Instant,
    /// Client address, unspecified when the peer is unknown
    pub client: IpAddr,
    /// Request method
    pub method: Method,
    /// URI as received, before any nesting strips a prefix
    pub original_uri: Uri,
    /// Declared `Content-Length`, 0 when absent or unparsable
    pub declared_body_size: u64,
    /// `Content-Type` header, if present and valid UTF-8
    pub content_type: Option<String>,
}

impl RequestContext {
    /// Capture the context of an incoming request
    pub fn from_request(req: &Request<Body>) -> Self {
        let headers = req.headers();
        Self {
            correlation_id: Arc::from(generate_correlation_id()),
            arrived_at: Instant::now(),
            client: client_ip(req),
            method: req.method().clone(),
            original_uri: req.uri().clone(),
            declared_body_size: headers
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
            content_type: headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string),
        }
    }

    /// Path as received
    pub fn path(&self) -> &str {
        self.original_uri.path()
    }

    /// Path and query as received
    pub fn original_url(&self) -> &str {
        self.original_uri
            .path_and_query()
            .map_or_else(|| self.original_uri.path(), |pq| pq.as_str())
    }
}

/// Generate a correlation id: unix milliseconds and a random suffix
pub fn generate_correlation_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}",
        chrono::Utc::now().timestamp_millis(),
        &random[..RANDOM_SUFFIX_LEN]
    )
}

/// Socket peer of the request, or the unspecified address
///
/// Falls back to [`MockConnectInfo`] the same way axum's `ConnectInfo`
/// extractor does, so routers driven without a listener see a peer too.
pub fn client_ip<B>(req: &Request<B>) -> IpAddr {
    let extensions = req.extensions();
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .or_else(|| {
            extensions
                .get::<MockConnectInfo<SocketAddr>>()
                .map(|MockConnectInfo(addr)| addr.ip())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Tag the request with a fresh [`RequestContext`]
pub async fn tag_request(mut req: Request, next: Next) -> Response {
    let context = RequestContext::from_request(&req);
    let request_id = HeaderValue::from_str(&context.correlation_id).ok();

    if let Some(id) = &request_id {
        req.headers_mut().insert(REQUEST_ID_HEADER, id.clone());
    }
    req.extensions_mut().insert(context);

    let mut response = next.run(req).await;
    if let Some(id) = request_id {
        response.headers_mut().insert(REQUEST_ID_HEADER, id);
    }
    response
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn correlation_id_format() {
        let id = generate_correlation_id();
        let (millis, suffix) = id.split_once('-').expect("id has a separator");

        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), RANDOM_SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn correlation_ids_are_unique() {
        let ids: HashSet<_> = (0..1_000).map(|_| generate_correlation_id()).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn context_from_request() {
        let mut req = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/api/v1/users?page=2")
            .header(CONTENT_LENGTH, "42")
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::empty())
            .expect("request");
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 5555))));

        let context = RequestContext::from_request(&req);

        assert_eq!(context.client, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)));
        assert_eq!(context.method, Method::POST);
        assert_eq!(context.path(), "/api/v1/users");
        assert_eq!(context.original_url(), "/api/v1/users?page=2");
        assert_eq!(context.declared_body_size, 42);
        assert_eq!(
            context.content_type.as_deref(),
            Some("application/json; charset=utf-8")
        );
    }

    #[test]
    fn missing_peer_and_length() {
        let req = axum::http::Request::builder()
            .uri("/")
            .header(CONTENT_LENGTH, "not-a-number")
            .body(Body::empty())
            .expect("request");

        let context = RequestContext::from_request(&req);

        assert_eq!(context.client, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(context.declared_body_size, 0);
        assert!(context.content_type.is_none());
    }
}
