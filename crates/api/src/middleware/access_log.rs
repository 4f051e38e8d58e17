// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Structured access logging
//!
//! Logs one line before the handler runs and one after the response is
//! produced. JSON request bodies are logged with top-level `password` and
//! `token` members redacted; JSON error bodies are logged in full.

use std::time::Instant;

use axum::{
    body::{Body, HttpBody, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{info, warn};

use super::{
    context::RequestContext, error_responder::finish_error_response, timing::format_millis,
};
use crate::{error::ServerError, state::ServerState};

/// Replacement for redacted values
pub const REDACTED: &str = "[REDACTED]";

const SENSITIVE_FIELDS: [&str; 2] = ["password", "token"];
const MAX_LOGGED_RESPONSE_BYTES: u64 = 64 * 1024;

/// Copy of `body` with sensitive top-level members redacted
///
/// Only the top level of a JSON object is inspected; nested objects are
/// logged as they are.
pub fn redact_sensitive_fields(body: &Value) -> Value {
    let mut redacted = body.clone();
    if let Some(object) = redacted.as_object_mut() {
        for field in SENSITIVE_FIELDS {
            if let Some(value) = object.get_mut(field) {
                *value = Value::String(REDACTED.to_string());
            }
        }
    }
    redacted
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"))
}

fn is_empty_body(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Access log stage
pub async fn log_access(State(state): State<ServerState>, req: Request, next: Next) -> Response {
    let config = state.config();
    if config.environment.is_test_mode() {
        return next.run(req).await;
    }

    let Some(context) = req.extensions().get::<RequestContext>().cloned() else {
        return next.run(req).await;
    };
    let started_at = Instant::now();

    info!(
        method = %context.method,
        uri = context.original_url(),
        client = %context.client,
        "incoming request"
    );

    let req = if is_json(req.headers())
        && context.declared_body_size > 0
        && context.declared_body_size <= config.limits.max_body_bytes
    {
        match log_request_body(req, &context).await {
            Ok(req) => req,
            Err(error) => {
                return finish_error_response(
                    error.into_response(),
                    Some(&context),
                    config.environment,
                );
            }
        }
    } else {
        req
    };

    let response = next.run(req).await;
    let status = response.status();

    info!(
        method = %context.method,
        uri = context.original_url(),
        status = status.as_u16(),
        elapsed_ms = format_millis(started_at.elapsed()),
        "request completed"
    );

    if status.is_client_error() || status.is_server_error() {
        log_error_body(response, &context).await
    } else {
        response
    }
}

async fn log_request_body(req: Request, context: &RequestContext) -> Result<Request, ServerError> {
    let (parts, body) = req.into_parts();
    let limit = usize::try_from(context.declared_body_size).unwrap_or(usize::MAX);
    let bytes = to_bytes(body, limit).await.map_err(|e| ServerError::Validation {
        message: "Request body could not be read".to_string(),
        details: Some(Value::String(e.to_string())),
    })?;

    if let Ok(body) = serde_json::from_slice::<Value>(&bytes)
        && !is_empty_body(&body)
    {
        info!(
            method = %context.method,
            uri = context.original_url(),
            body = %redact_sensitive_fields(&body),
            "request body"
        );
    }

    Ok(Request::from_parts(parts, Body::from(bytes)))
}

async fn log_error_body(response: Response, context: &RequestContext) -> Response {
    let fits = response
        .body()
        .size_hint()
        .exact()
        .is_some_and(|len| len <= MAX_LOGGED_RESPONSE_BYTES);
    if !is_json(response.headers()) || !fits {
        return response;
    }

    let (parts, body) = response.into_parts();
    match to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            info!(
                method = %context.method,
                uri = context.original_url(),
                status = parts.status.as_u16(),
                body = %String::from_utf8_lossy(&bytes),
                "error response"
            );
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(e) => {
            warn!(error = %e, "failed to buffer error response for logging");
            Response::from_parts(parts, Body::empty())
        }
    }
}
