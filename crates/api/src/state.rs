// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server state management module
//!
//! This module provides shared application state for the API server,
//! including configuration, dependency probes, rate limiters, and
//! coordinated cancellation.

use std::{sync::Arc, time::Instant};

use datastores::{DependencyRegistry, PostgresProbe, RedisProbe};
use tokio_util::sync::CancellationToken;

use crate::{
    config::ServerConfig,
    health::{DependencyChecker, HealthResponse},
    middleware::RateLimiters,
};

/// Shared application state with cancellation token support
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Server configuration
    config: Arc<ServerConfig>,
    /// Probes for the downstream dependencies
    dependencies: Arc<dyn DependencyChecker>,
    /// Per-identity rate limiters
    rate_limiters: RateLimiters,
    /// Server start, for uptime
    started_at: Instant,
    /// Cancellation token for coordinated shutdown
    pub cancellation_token: CancellationToken,
}

impl ServerState {
    /// Create new server state
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `dependencies` - Probes for the downstream dependencies
    /// * `cancellation_token` - Token for coordinated cancellation
    pub fn new(
        config: ServerConfig,
        dependencies: Arc<dyn DependencyChecker>,
        cancellation_token: CancellationToken,
    ) -> Self {
        let rate_limiters = RateLimiters::from_config(&config.rate_limiting);
        Self {
            config: Arc::new(config),
            dependencies,
            rate_limiters,
            started_at: Instant::now(),
            cancellation_token,
        }
    }

    /// Build the dependency registry described by the configuration
    pub fn registry_from_config(config: &ServerConfig) -> DependencyRegistry {
        DependencyRegistry::new(
            PostgresProbe::new((&config.database).into()),
            RedisProbe::new((&config.redis).into()),
            config.health.probe_timeout(),
        )
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Rate limiters shared by every request
    pub fn rate_limiters(&self) -> &RateLimiters {
        &self.rate_limiters
    }

    /// Probe every dependency and build the health report
    pub async fn health_check(&self) -> HealthResponse {
        HealthResponse::collect(
            &self.config,
            Arc::clone(&self.dependencies),
            self.started_at.elapsed(),
        )
        .await
    }
}

#[cfg(test)]
impl ServerState {
    /// State for `config` with the dependencies it describes
    pub(crate) fn for_config(config: ServerConfig) -> Self {
        let registry = Arc::new(Self::registry_from_config(&config));
        Self::new(config, registry, CancellationToken::new())
    }
}
