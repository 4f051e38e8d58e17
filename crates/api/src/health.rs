// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Health aggregation
//!
//! A health report starts with status `OK` and every dependency `checking...`.
//! The probe outcomes are folded into it afterwards: any unhealthy dependency
//! turns the report `DEGRADED`, and that includes a probe that panicked. A
//! report that cannot be built at all (the checker itself failed, or the
//! process snapshot could not be read) becomes a minimal `ERROR` report.

use std::{fmt, future::Future, pin::Pin, sync::Arc, time::Duration};

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use datastores::{DependencyChecks, DependencyRegistry};
use health_probe::{DependencyProbe, ProbeOutcome};
use serde::Serialize;
use shared_types::{DependencyStatus, OverallStatus};
use tracing::{error, info};
use utoipa::ToSchema;

use crate::{
    config::{Environment, ServerConfig},
    metrics,
};

/// Object-safe handle on the dependency probes
pub trait DependencyChecker: fmt::Debug + Send + Sync {
    /// Probe every dependency once
    fn check_all(&self) -> Pin<Box<dyn Future<Output = DependencyChecks> + Send + '_>>;
}

impl<D, C> DependencyChecker for DependencyRegistry<D, C>
where
    D: DependencyProbe + fmt::Debug + 'static,
    C: DependencyProbe + fmt::Debug + 'static,
{
    fn check_all(&self) -> Pin<Box<dyn Future<Output = DependencyChecks> + Send + '_>> {
        Box::pin(self.probe_all())
    }
}

/// Per-dependency statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Relational store
    pub database: DependencyStatus,
    /// Key-value cache
    pub redis: DependencyStatus,
}

/// Resident memory figures of the process, in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    /// Resident set size
    pub rss: u64,
    /// Virtual memory size
    pub virtual_size: u64,
    /// Peak resident set size
    pub peak_rss: u64,
}

impl MemorySnapshot {
    /// Read the snapshot of the current process
    ///
    /// Platforms without `/proc` report zeros.
    pub async fn capture() -> anyhow::Result<Self> {
        if !cfg!(target_os = "linux") {
            return Ok(Self::default());
        }
        let status = tokio::fs::read_to_string("/proc/self/status")
            .await
            .context("failed to read /proc/self/status")?;
        Ok(Self::parse_proc_status(&status))
    }

    /// Parse the `Vm*` lines of a `/proc/<pid>/status` file
    pub fn parse_proc_status(status: &str) -> Self {
        let mut snapshot = Self::default();
        for line in status.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let Some(kib) = value
                .trim()
                .strip_suffix("kB")
                .and_then(|v| v.trim().parse::<u64>().ok())
            else {
                continue;
            };
            match key {
                "VmRSS" => snapshot.rss = kib * 1024,
                "VmSize" => snapshot.virtual_size = kib * 1024,
                "VmHWM" => snapshot.peak_rss = kib * 1024,
                _ => {}
            }
        }
        snapshot
    }
}

/// Full health report
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthReport {
    /// Overall status
    pub status: OverallStatus,
    /// Time the report was built
    pub timestamp: DateTime<Utc>,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Deployment environment
    pub environment: Environment,
    /// Seconds since the server started
    pub uptime: f64,
    /// Process memory
    pub memory: MemorySnapshot,
    /// Per-dependency statuses
    pub checks: HealthChecks,
}

impl HealthReport {
    /// Report before any probe has run
    pub fn base(config: &ServerConfig, uptime: Duration, memory: MemorySnapshot) -> Self {
        Self {
            status: OverallStatus::Ok,
            timestamp: Utc::now(),
            service: config.app.name.clone(),
            version: config.app.version.clone(),
            environment: config.environment,
            uptime: uptime.as_secs_f64(),
            memory,
            checks: HealthChecks {
                database: DependencyStatus::Checking,
                redis: DependencyStatus::Checking,
            },
        }
    }

    /// Fold probe outcomes into the report
    #[must_use]
    pub fn with_checks(mut self, checks: &DependencyChecks) -> Self {
        self.checks = HealthChecks {
            database: checks.database.status,
            redis: checks.redis.status,
        };
        self.status = if checks.all_healthy() {
            OverallStatus::Ok
        } else {
            OverallStatus::Degraded
        };
        self
    }

    /// HTTP status code for this report
    pub fn http_status(&self) -> u16 {
        self.status.http_status()
    }
}

/// Minimal report used when the health report cannot be built
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthFailure {
    /// Always `ERROR`
    pub status: OverallStatus,
    /// Time of the failure
    pub timestamp: DateTime<Utc>,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// What went wrong
    pub error: String,
}

impl HealthFailure {
    /// Build the failure report
    pub fn new(config: &ServerConfig, error: &anyhow::Error) -> Self {
        Self {
            status: OverallStatus::Error,
            timestamp: Utc::now(),
            service: config.app.name.clone(),
            version: config.app.version.clone(),
            error: error.to_string(),
        }
    }
}

/// Liveness body, always `{"status":"OK"}`
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct SimpleHealth {
    /// Always `OK`
    pub status: OverallStatus,
}

impl SimpleHealth {
    /// The liveness body
    pub const OK: Self = Self {
        status: OverallStatus::Ok,
    };
}

fn record_probe_metrics(outcome: &ProbeOutcome) {
    let result = if outcome.is_healthy() {
        "healthy"
    } else {
        "unhealthy"
    };
    metrics::observe_probe_duration(outcome.name, result, outcome.response_time.as_secs_f64());
}

/// Build a health report by probing every dependency
///
/// Each probe runs on its own task, so a panic inside one probe only marks
/// that dependency unhealthy. The checker as a whole also runs on its own task
/// and its failure becomes an `ERROR` report.
pub async fn aggregate(
    config: &ServerConfig,
    checker: Arc<dyn DependencyChecker>,
    uptime: Duration,
) -> anyhow::Result<HealthReport> {
    let memory = MemorySnapshot::capture().await?;
    let report = HealthReport::base(config, uptime, memory);

    let checks = tokio::spawn(async move { checker.check_all().await })
        .await
        .context("dependency probing failed")?;

    for outcome in checks.iter() {
        record_probe_metrics(outcome);
    }

    let report = report.with_checks(&checks);
    info!(
        status = ?report.status,
        database = ?report.checks.database,
        redis = ?report.checks.redis,
        "health check completed"
    );
    Ok(report)
}

/// Outcome of a health request: a report or a failure
#[derive(Debug, Clone)]
pub enum HealthResponse {
    /// The report was built
    Report(HealthReport),
    /// The report could not be built
    Failure(HealthFailure),
}

impl HealthResponse {
    /// Run the aggregator and capture its failure, if any
    pub async fn collect(
        config: &ServerConfig,
        checker: Arc<dyn DependencyChecker>,
        uptime: Duration,
    ) -> Self {
        match aggregate(config, checker, uptime).await {
            Ok(report) => Self::Report(report),
            Err(e) => {
                error!(error = format!("{e:#}"), "health report could not be built");
                Self::Failure(HealthFailure::new(config, &e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use health_probe::{ProbeError, ProbeTimeout};

    use super::*;

    #[derive(Debug)]
    struct StaticProbe {
        name: &'static str,
        healthy: bool,
    }

    impl DependencyProbe for StaticProbe {
        async fn probe(&self) -> Result<(), ProbeError> {
            if self.healthy {
                Ok(())
            } else {
                Err(ProbeError::UnexpectedReply {
                    message: "connection refused".to_string(),
                })
            }
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    #[derive(Debug)]
    struct PanickingChecker;

    impl DependencyChecker for PanickingChecker {
        #[allow(clippy::panic)]
        fn check_all(&self) -> Pin<Box<dyn Future<Output = DependencyChecks> + Send + '_>> {
            Box::pin(async { panic!("checker exploded") })
        }
    }

    #[derive(Debug)]
    struct PanickingDatabase;

    impl DependencyProbe for PanickingDatabase {
        #[allow(clippy::panic)]
        async fn probe(&self) -> Result<(), ProbeError> {
            panic!("driver bug");
        }

        fn name(&self) -> &'static str {
            "database"
        }
    }

    fn checker(database: bool, redis: bool) -> Arc<dyn DependencyChecker> {
        Arc::new(DependencyRegistry::new(
            StaticProbe {
                name: "database",
                healthy: database,
            },
            StaticProbe {
                name: "redis",
                healthy: redis,
            },
            ProbeTimeout::default(),
        ))
    }

    #[tokio::test]
    async fn all_healthy_is_ok() {
        let config = ServerConfig::for_testing();
        let report = aggregate(&config, checker(true, true), Duration::from_secs(5))
            .await
            .expect("report");

        assert_eq!(report.status, OverallStatus::Ok);
        assert_eq!(report.http_status(), 200);
        assert_eq!(report.checks.database, DependencyStatus::Healthy);
        assert_eq!(report.checks.redis, DependencyStatus::Healthy);
        assert!((report.uptime - 5.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn one_failure_degrades_without_skipping_the_other() {
        let config = ServerConfig::for_testing();

        for (database, redis) in [(false, true), (true, false), (false, false)] {
            let report = aggregate(&config, checker(database, redis), Duration::ZERO)
                .await
                .expect("report");

            assert_eq!(report.status, OverallStatus::Degraded);
            assert_eq!(report.http_status(), 503);
            assert_eq!(report.checks.database.is_healthy(), database);
            assert_eq!(report.checks.redis.is_healthy(), redis);
        }
    }

    #[tokio::test]
    async fn panicking_database_degrades_and_cache_stays_healthy() {
        let config = ServerConfig::for_testing();
        let checker = Arc::new(DependencyRegistry::new(
            PanickingDatabase,
            StaticProbe {
                name: "redis",
                healthy: true,
            },
            ProbeTimeout::default(),
        ));

        let HealthResponse::Report(report) =
            HealthResponse::collect(&config, checker, Duration::ZERO).await
        else {
            unreachable!("a panic inside one dependency still produces a report");
        };
        assert_eq!(report.status, OverallStatus::Degraded);
        assert_eq!(report.http_status(), 503);
        assert_eq!(report.checks.database, DependencyStatus::Unhealthy);
        assert_eq!(report.checks.redis, DependencyStatus::Healthy);
    }

    #[tokio::test]
    async fn panicking_checker_yields_error_report() {
        let config = ServerConfig::for_testing();
        let response =
            HealthResponse::collect(&config, Arc::new(PanickingChecker), Duration::ZERO).await;

        let HealthResponse::Failure(failure) = response else {
            unreachable!("a panicking checker cannot produce a report");
        };
        assert_eq!(failure.status, OverallStatus::Error);
        assert_eq!(failure.service, config.app.name);
        assert_eq!(failure.error, "dependency probing failed");
    }

    #[test]
    fn base_report_is_checking() {
        let config = ServerConfig::for_testing();
        let report = HealthReport::base(&config, Duration::ZERO, MemorySnapshot::default());
        let value = serde_json::to_value(&report).expect("serializes");

        assert_eq!(value["status"], "OK");
        assert_eq!(value["checks"]["database"], "checking...");
        assert_eq!(value["checks"]["redis"], "checking...");
        assert_eq!(value["environment"], "testing");
        assert_eq!(value["service"], "Backend API");
    }

    #[test]
    fn simple_health_body() {
        assert_eq!(
            serde_json::to_value(SimpleHealth::OK).expect("serializes"),
            serde_json::json!({"status": "OK"})
        );
    }

    #[test]
    fn proc_status_parsing() {
        let status = "Name:\tapi\nVmPeak:\t  300000 kB\nVmSize:\t  200000 kB\n\
            VmHWM:\t   20480 kB\nVmRSS:\t   10240 kB\nThreads:\t8\n";
        let snapshot = MemorySnapshot::parse_proc_status(status);

        assert_eq!(snapshot.rss, 10_240 * 1024);
        assert_eq!(snapshot.virtual_size, 200_000 * 1024);
        assert_eq!(snapshot.peak_rss, 20_480 * 1024);
    }
}
