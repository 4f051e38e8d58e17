// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Health status types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Overall service status reported by the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallStatus {
    /// Every dependency answered its probe
    Ok,
    /// At least one dependency probe failed
    Degraded,
    /// The health report itself could not be built
    Error,
}

/// Status of a single downstream dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum DependencyStatus {
    /// Probe has not completed yet
    #[serde(rename = "checking...")]
    Checking,
    /// Probe succeeded
    #[serde(rename = "healthy")]
    Healthy,
    /// Probe failed
    #[serde(rename = "unhealthy")]
    Unhealthy,
}

impl OverallStatus {
    /// HTTP status code used for this overall status
    pub const fn http_status(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Degraded => 503,
            Self::Error => 500,
        }
    }
}

impl DependencyStatus {
    /// Check if the dependency answered its probe
    pub fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overall_status_serialization() {
        assert_eq!(
            serde_json::to_string(&OverallStatus::Ok).expect("serializes"),
            "\"OK\""
        );
        assert_eq!(
            serde_json::to_string(&OverallStatus::Degraded).expect("serializes"),
            "\"DEGRADED\""
        );
        assert_eq!(
            serde_json::to_string(&OverallStatus::Error).expect("serializes"),
            "\"ERROR\""
        );
    }

    #[test]
    fn dependency_status_serialization() {
        assert_eq!(
            serde_json::to_string(&DependencyStatus::Checking).expect("serializes"),
            "\"checking...\""
        );
        assert_eq!(
            serde_json::to_string(&DependencyStatus::Healthy).expect("serializes"),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&DependencyStatus::Unhealthy).expect("serializes"),
            "\"unhealthy\""
        );
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(OverallStatus::Ok.http_status(), 200);
        assert_eq!(OverallStatus::Degraded.http_status(), 503);
        assert_eq!(OverallStatus::Error.http_status(), 500);
    }

    #[test]
    fn healthy_check() {
        assert!(DependencyStatus::Healthy.is_healthy());
        assert!(!DependencyStatus::Unhealthy.is_healthy());
        assert!(!DependencyStatus::Checking.is_healthy());
    }
}
