// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error handling module
//!
//! This module provides comprehensive error types for server operations,
//! including proper HTTP response mapping and error propagation.
//!
//! Rendering a [`ServerError`] attaches an [`ErrorReport`] to the response
//! extensions. The centralized error responder picks it up to log the failure
//! and, outside production, to add the error chain to the body.

use std::{error::Error as _, net::SocketAddr};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use shared_types::ErrorBody;
use thiserror::Error;

/// Comprehensive error types for server operations
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration validation errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Network binding errors
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        /// Socket address that failed to bind
        address: SocketAddr,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server startup errors
    #[error("Server startup failed: {source}")]
    Startup {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server shutdown errors
    #[error("Server shutdown failed: {source}")]
    Shutdown {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Timeout errors for operations that exceed time limits
    #[error("Operation timed out after {timeout_seconds} seconds")]
    Timeout {
        /// Timeout duration in seconds
        timeout_seconds: u64,
    },

    /// Input validation errors
    #[error("{message}")]
    Validation {
        /// Error message
        message: String,
        /// Per-field details
        details: Option<Value>,
    },

    /// Missing or invalid credentials
    #[error("{message}")]
    Unauthorized {
        /// Error message
        message: String,
    },

    /// Malformed resource identifier
    #[error("Invalid ID format")]
    InvalidId {
        /// The rejected identifier
        value: String,
    },

    /// Unique constraint conflict
    #[error("Duplicate field value")]
    DuplicateField {
        /// Name of the conflicting field
        field: String,
    },

    /// Resource does not exist
    #[error("{resource} not found")]
    NotFound {
        /// Description of the missing resource
        resource: String,
    },

    /// Anything else
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// Create a validation error without details
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::InvalidId { .. } | Self::DuplicateField { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            Self::Config { .. }
            | Self::Bind { .. }
            | Self::Startup { .. }
            | Self::Shutdown { .. }
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Build the uniform error body
    pub fn to_error_body(&self) -> ErrorBody {
        let body = ErrorBody::new(self.status_code().as_u16(), self.to_string());
        match self {
            Self::Validation {
                details: Some(details),
                ..
            } => body.with("details", details.clone()),
            Self::InvalidId { value } => body.with("details", serde_json::json!({ "id": value })),
            Self::DuplicateField { field } => {
                body.with("details", serde_json::json!({ "field": field }))
            }
            _ => body,
        }
    }

    /// Display strings of this error and all of its sources, outermost first
    pub fn chain(&self) -> Vec<String> {
        let mut chain = vec![self.to_string()];
        let mut source = self.source();
        while let Some(err) = source {
            chain.push(err.to_string());
            source = err.source();
        }
        chain
    }
}

/// Rendered error carried in response extensions for the error responder
#[derive(Debug, Clone)]
pub struct ErrorReport {
    /// The body sent to the client
    pub body: ErrorBody,
    /// Error chain, outermost first
    pub stack: Vec<String>,
}

impl ErrorReport {
    /// The body with the error chain attached
    pub fn body_with_stack(&self) -> ErrorBody {
        self.body.clone().with("stack", self.stack.clone())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let report = ErrorReport {
            body: self.to_error_body(),
            stack: self.chain(),
        };

        let mut response = (status, Json(report.body.clone().into_envelope())).into_response();
        response.extensions_mut().insert(report);
        response
    }
}
