// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Dependency registry
//!
//! Holds the probe for each downstream dependency and runs them in a fixed
//! order. Every probe runs on its own task under its own timeout, and its
//! failure or panic is folded into its own [`ProbeOutcome`]; the next probe
//! always runs.

use std::sync::Arc;

use health_probe::{DependencyProbe, ProbeOutcome, ProbeTimeout, run_isolated};
use tracing::debug;

use crate::{PostgresProbe, RedisProbe};

/// Outcomes of one round of dependency probing
#[derive(Debug, Clone)]
pub struct DependencyChecks {
    /// Relational store outcome
    pub database: ProbeOutcome,
    /// Key-value cache outcome
    pub redis: ProbeOutcome,
}

impl DependencyChecks {
    /// Check if every dependency answered its probe
    pub fn all_healthy(&self) -> bool {
        self.database.is_healthy() && self.redis.is_healthy()
    }

    /// Iterate over the outcomes in probing order
    pub fn iter(&self) -> impl Iterator<Item = &ProbeOutcome> {
        [&self.database, &self.redis].into_iter()
    }
}

/// Registry of the probes for the service's dependencies
#[derive(Debug)]
pub struct DependencyRegistry<D = PostgresProbe, C = RedisProbe> {
    database: Arc<D>,
    cache: Arc<C>,
    timeout: ProbeTimeout,
}

impl<D, C> Clone for DependencyRegistry<D, C> {
    fn clone(&self) -> Self {
        Self {
            database: Arc::clone(&self.database),
            cache: Arc::clone(&self.cache),
            timeout: self.timeout,
        }
    }
}

impl<D, C> DependencyRegistry<D, C>
where
    D: DependencyProbe + 'static,
    C: DependencyProbe + 'static,
{
    /// Create a new registry with the given probes
    pub fn new(database: D, cache: C, timeout: ProbeTimeout) -> Self {
        Self {
            database: Arc::new(database),
            cache: Arc::new(cache),
            timeout,
        }
    }

    /// Probe every dependency, one after the other
    pub async fn probe_all(&self) -> DependencyChecks {
        let database = run_isolated(Arc::clone(&self.database), self.timeout).await;
        let redis = run_isolated(Arc::clone(&self.cache), self.timeout).await;

        debug!(
            database = ?database.status,
            redis = ?redis.status,
            "dependency probing finished"
        );

        DependencyChecks { database, redis }
    }

    /// Names of the registered dependencies in probing order
    pub fn dependency_names(&self) -> [&'static str; 2] {
        [self.database.name(), self.cache.name()]
    }

    /// Per-probe timeout
    pub fn timeout(&self) -> ProbeTimeout {
        self.timeout
    }
}
