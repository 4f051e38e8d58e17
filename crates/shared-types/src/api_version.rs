// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! API version tokens
//!
//! A version token is a path segment made of a leading `v` followed by at
//! least one more character (`v1`, `v2`, `vbeta`). Whether a token is
//! *supported* is decided by the server configuration, not by this type.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use utoipa::ToSchema;

/// The version served by this build
const CURRENT_VERSION: &str = "v1";

/// A syntactically valid API version token
#[derive(Debug, Clone, PartialEq, Eq, Hash, ToSchema)]
#[schema(value_type = String, example = "v1")]
pub struct ApiVersion(Box<str>);

/// Error returned when a segment is not a version token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not an API version token")]
pub struct ApiVersionError(pub String);

impl ApiVersion {
    /// The version served by this build (`v1`)
    pub fn current() -> Self {
        Self(Box::from(CURRENT_VERSION))
    }

    /// Check whether a path segment looks like a version token
    pub fn is_version_token(segment: &str) -> bool {
        segment.len() > 1 && segment.starts_with('v')
    }

    /// The token as it appears in paths
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ApiVersion {
    type Err = ApiVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::is_version_token(s) {
            Ok(Self(Box::from(s)))
        } else {
            Err(ApiVersionError(s.to_string()))
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ApiVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
