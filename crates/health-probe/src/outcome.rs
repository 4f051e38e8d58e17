// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Probe outcomes and fault-isolated probe execution

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared_types::DependencyStatus;
use tracing::{debug, warn};

use crate::{DependencyProbe, ProbeError};

// Probe constants
const DEFAULT_PROBE_TIMEOUT_MILLIS: u64 = 2_000;

/// Result of probing one dependency
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    /// Dependency name
    pub name: &'static str,
    /// Healthy or unhealthy, never `Checking`
    pub status: DependencyStatus,
    /// Time spent waiting for the dependency
    pub response_time: Duration,
    /// When the probe finished
    pub checked_at: DateTime<Utc>,
    /// Failure description for unhealthy outcomes
    pub error: Option<String>,
}

impl ProbeOutcome {
    /// Create a successful outcome
    pub fn healthy(name: &'static str, response_time: Duration) -> Self {
        Self {
            name,
            status: DependencyStatus::Healthy,
            response_time,
            checked_at: Utc::now(),
            error: None,
        }
    }

    /// Create a failed outcome
    pub fn unhealthy(name: &'static str, response_time: Duration, reason: String) -> Self {
        Self {
            name,
            status: DependencyStatus::Unhealthy,
            response_time,
            checked_at: Utc::now(),
            error: Some(reason),
        }
    }

    /// Check if the dependency answered its probe
    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }
}

/// Timeout applied to a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTimeout(Duration);

impl ProbeTimeout {
    /// Create a probe timeout from milliseconds, clamping zero to one millisecond
    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis.max(1)))
    }

    /// Get the timeout duration
    pub fn value(self) -> Duration {
        self.0
    }
}

impl Default for ProbeTimeout {
    fn default() -> Self {
        Self(Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MILLIS))
    }
}

/// Run one probe under a timeout
///
/// Every failure, including the timeout, becomes an unhealthy outcome. The
/// caller can run several probes back to back and each one's outcome only
/// depends on its own dependency.
pub async fn run_probe<P>(probe: &P, timeout: ProbeTimeout) -> ProbeOutcome
where
    P: DependencyProbe + ?Sized,
{
    let name = probe.name();
    let started = Instant::now();

    let result = match tokio::time::timeout(timeout.value(), probe.probe()).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout {
            timeout_ms: u64::try_from(timeout.value().as_millis()).unwrap_or(u64::MAX),
        }),
    };
    let response_time = started.elapsed();

    match result {
        Ok(()) => {
            debug!(dependency = name, ?response_time, "dependency probe succeeded");
            ProbeOutcome::healthy(name, response_time)
        }
        Err(e) => {
            warn!(dependency = name, ?response_time, error = %e, "dependency probe failed");
            ProbeOutcome::unhealthy(name, response_time, e.to_string())
        }
    }
}

/// Run one probe on its own task
///
/// Like [`run_probe`], and a panic inside the probe also becomes an unhealthy
/// outcome for that dependency instead of unwinding into the caller.
pub async fn run_isolated<P>(probe: Arc<P>, timeout: ProbeTimeout) -> ProbeOutcome
where
    P: DependencyProbe + 'static,
{
    let name = probe.name();
    let started = Instant::now();

    match tokio::spawn(async move { run_probe(probe.as_ref(), timeout).await }).await {
        Ok(outcome) => outcome,
        Err(join_error) => {
            let response_time = started.elapsed();
            warn!(
                dependency = name,
                ?response_time,
                error = %join_error,
                "dependency check aborted"
            );
            ProbeOutcome::unhealthy(
                name,
                response_time,
                "dependency check panicked".to_string(),
            )
        }
    }
}
