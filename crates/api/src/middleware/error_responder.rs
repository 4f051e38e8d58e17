// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Centralized error responder
//!
//! Every [`ServerError`] rendered below this stage carries an [`ErrorReport`].
//! The responder logs it and, outside production, re-renders the body with
//! the error chain under `stack`. Stages above the responder that fail on
//! their own pass their error through [`finish_error_response`].

use std::any::Any;

use anyhow::anyhow;
use axum::{
    Json,
    extract::{Request, State},
    http::header::CONTENT_LENGTH,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::error;

use super::context::RequestContext;
use crate::{
    config::Environment,
    error::{ErrorReport, ServerError},
    state::ServerState,
};

/// Error responder stage
pub async fn respond_to_errors(
    State(state): State<ServerState>,
    req: Request,
    next: Next,
) -> Response {
    let context = req.extensions().get::<RequestContext>().cloned();
    let response = next.run(req).await;
    finish_error_response(response, context.as_ref(), state.config().environment)
}

/// Log the [`ErrorReport`] of `response` and attach the error chain outside
/// production
///
/// Responses without a report are returned unchanged.
pub fn finish_error_response(
    mut response: Response,
    context: Option<&RequestContext>,
    environment: Environment,
) -> Response {
    let Some(report) = response.extensions_mut().remove::<ErrorReport>() else {
        return response;
    };

    error!(
        request_id = context.map(|c| &*c.correlation_id),
        method = context.map(|c| c.method.as_str()),
        uri = context.map(RequestContext::original_url),
        status = report.body.status,
        message = %report.body.message,
        stack = ?report.stack,
        "request failed"
    );

    if environment.is_production() {
        return response;
    }

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    (parts, Json(report.body_with_stack().into_envelope())).into_response()
}

/// Turn a handler panic into a 500 that passes through the responder
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ServerError::Internal(anyhow!("handler panicked: {detail}").context("Internal Server Error"))
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::{body::to_bytes, http::StatusCode};
    use serde_json::Value;

    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn panic_payload_becomes_internal_error() {
        let response = handle_panic(Box::new("index out of bounds"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let report = response
            .extensions()
            .get::<ErrorReport>()
            .cloned()
            .expect("report");
        assert_eq!(
            report.stack,
            vec![
                "Internal Server Error".to_string(),
                "handler panicked: index out of bounds".to_string()
            ]
        );

        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Internal Server Error");
        assert_eq!(body["error"]["status"], 500);
        assert!(body["error"].get("stack").is_none());
    }

    #[tokio::test]
    async fn stack_is_attached_outside_production_only() {
        let error = || ServerError::validation("Request body could not be read");

        let development =
            finish_error_response(error().into_response(), None, Environment::Development);
        assert!(development.extensions().get::<ErrorReport>().is_none());
        let body = body_json(development).await;
        assert_eq!(body["error"]["status"], 400);
        assert_eq!(
            body["error"]["stack"],
            serde_json::json!(["Request body could not be read"])
        );

        let production =
            finish_error_response(error().into_response(), None, Environment::Production);
        assert!(body_json(production).await["error"].get("stack").is_none());
    }

    #[test]
    fn owned_string_payload() {
        let response = handle_panic(Box::new(String::from("boom")));
        let report = response.extensions().get::<ErrorReport>().expect("report");
        assert_eq!(report.stack[1], "handler panicked: boom");
    }
}
