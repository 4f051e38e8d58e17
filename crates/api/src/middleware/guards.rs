// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Request validators
//!
//! Each check returns `Ok(())` to continue or the complete rejection response.
//! Rejections are rendered here and never reach the error responder.

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared_types::{ApiVersion, ErrorBody};
use tracing::debug;

use super::context::RequestContext;
use crate::{config::RequestLimitsConfig, state::ServerState};

const JSON_MEDIA_TYPE: &str = "application/json";

fn reject(status: StatusCode, body: ErrorBody) -> Response {
    (status, Json(body.into_envelope())).into_response()
}

/// Reject requests whose declared `Content-Length` exceeds the ceiling
///
/// Only the declared length is inspected; a request without the header
/// passes regardless of how many bytes it streams.
pub fn check_declared_size(declared: u64, limits: &RequestLimitsConfig) -> Result<(), Response> {
    if declared > limits.max_body_bytes {
        debug!(declared, max = limits.max_body_bytes, "request entity too large");
        return Err(reject(
            StatusCode::PAYLOAD_TOO_LARGE,
            ErrorBody::new(413, "Request entity too large")
                .with("maxSize", limits.max_body_label()),
        ));
    }
    Ok(())
}

/// Reject version tokens outside the supported set
pub fn check_api_version(version: &str, supported: &[ApiVersion]) -> Result<(), Response> {
    if !ApiVersion::is_version_token(version) || supported.iter().any(|v| v.as_str() == version) {
        return Ok(());
    }

    debug!(version, "unsupported api version");
    let supported: Vec<&str> = supported.iter().map(ApiVersion::as_str).collect();
    Err(reject(
        StatusCode::BAD_REQUEST,
        ErrorBody::new(400, format!("API version '{version}' is not supported"))
            .with("supportedVersions", supported),
    ))
}

/// Require a JSON content type on POST, PUT and PATCH
pub fn check_content_type(method: &Method, headers: &HeaderMap) -> Result<(), Response> {
    if !matches!(*method, Method::POST | Method::PUT | Method::PATCH) {
        return Ok(());
    }

    let received = headers.get(CONTENT_TYPE).map(|value| {
        value.to_str().map_or_else(
            |_| String::from_utf8_lossy(value.as_bytes()).into_owned(),
            ToString::to_string,
        )
    });

    match received {
        Some(content_type) if content_type.contains(JSON_MEDIA_TYPE) => Ok(()),
        received => Err(reject(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorBody::new(415, "Content-Type must be application/json")
                .with("received", received.unwrap_or_else(|| "none".to_string())),
        )),
    }
}

/// Size guard stage
pub async fn limit_declared_size(
    State(state): State<ServerState>,
    req: Request,
    next: Next,
) -> Response {
    let declared = req
        .extensions()
        .get::<RequestContext>()
        .map_or(0, |context| context.declared_body_size);

    match check_declared_size(declared, &state.config().limits) {
        Ok(()) => next.run(req).await,
        Err(rejection) => rejection,
    }
}
