// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Uniform error body
//!
//! Every failure response of the service has the shape
//! `{"error": {"message": ..., "status": ..., ...}}`. The extra members
//! (`details`, `maxSize`, `supportedVersions`, `received`, ...) depend on the
//! failure and are kept in insertion order next to `message` and `status`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Top-level error envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    /// The error description
    pub error: ErrorBody,
}

/// Error description inside the envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable message
    #[schema(example = "Route /nonexistent not found")]
    pub message: String,
    /// HTTP status code, repeated in the body
    #[schema(example = 404)]
    pub status: u16,
    /// Failure-specific members
    #[serde(flatten)]
    #[schema(ignore)]
    pub extra: Map<String, Value>,
}

impl ErrorBody {
    /// Create an error body with only `message` and `status`
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
            extra: Map::new(),
        }
    }

    /// Add a failure-specific member
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Wrap into the top-level envelope
    pub fn into_envelope(self) -> ErrorEnvelope {
        ErrorEnvelope { error: self }
    }
}

impl From<ErrorBody> for ErrorEnvelope {
    fn from(error: ErrorBody) -> Self {
        Self { error }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn minimal_body_shape() {
        let envelope = ErrorBody::new(404, "Route /x not found").into_envelope();
        let value = serde_json::to_value(&envelope).expect("serializes");

        assert_eq!(
            value,
            json!({"error": {"message": "Route /x not found", "status": 404}})
        );
    }

    #[test]
    fn extra_members_are_flattened() {
        let envelope = ErrorBody::new(413, "Request entity too large")
            .with("maxSize", "10MB")
            .into_envelope();
        let value = serde_json::to_value(&envelope).expect("serializes");

        assert_eq!(value["error"]["maxSize"], "10MB");
        assert_eq!(value["error"]["status"], 413);
    }

    #[test]
    fn round_trips_unknown_members() {
        let raw = json!({
            "error": {
                "message": "API version 'v2' is not supported",
                "status": 400,
                "supportedVersions": ["v1"]
            }
        });
        let envelope: ErrorEnvelope = serde_json::from_value(raw).expect("deserializes");

        assert_eq!(envelope.error.status, 400);
        assert_eq!(envelope.error.extra["supportedVersions"], json!(["v1"]));
    }
}
