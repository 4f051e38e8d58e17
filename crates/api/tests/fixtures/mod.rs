// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Test fixtures for end-to-end server tests
//!
//! Stub dependencies with a fixed answer, a fake peer that speaks neither
//! datastore protocol, and helpers that start the API server.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc};

use api::{DependencyChecker, Server, ServerConfig, ShutdownConfig};
use datastores::{DependencyRegistry, PostgresConfig, PostgresProbe};
use health_probe::{DependencyProbe, ProbeError};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};
use tokio_util::sync::CancellationToken;

/// Dependency with a fixed answer
#[derive(Debug, Clone, Copy)]
pub struct StubDependency {
    pub name: &'static str,
    pub healthy: bool,
}

impl DependencyProbe for StubDependency {
    async fn probe(&self) -> Result<(), ProbeError> {
        if self.healthy {
            Ok(())
        } else {
            Err(ProbeError::UnexpectedReply {
                message: format!("{} is down", self.name),
            })
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Checker whose two dependencies answer as given
pub fn stub_dependencies(database: bool, redis: bool) -> Arc<dyn DependencyChecker> {
    Arc::new(DependencyRegistry::new(
        StubDependency {
            name: "database",
            healthy: database,
        },
        StubDependency {
            name: "redis",
            healthy: redis,
        },
        ServerConfig::for_testing().health.probe_timeout(),
    ))
}

/// Checker with a real PostgreSQL client on `database_port` and a healthy cache
pub fn real_database_with_healthy_cache(database_port: u16) -> Arc<dyn DependencyChecker> {
    Arc::new(DependencyRegistry::new(
        PostgresProbe::new(PostgresConfig {
            host: "127.0.0.1".to_string(),
            port: database_port,
            ..PostgresConfig::default()
        }),
        StubDependency {
            name: "redis",
            healthy: true,
        },
        ServerConfig::for_testing().health.probe_timeout(),
    ))
}

/// Start a TCP server that answers every read with `reply`
pub async fn spawn_fake_server(reply: &'static [u8]) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake dependency");
    let port = listener.local_addr().expect("local addr").port();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0_u8; 512];
                while let Ok(read) = stream.read(&mut buf).await {
                    if read == 0 || stream.write_all(reply).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    port
}

/// Testing configuration pointing both datastores at the given ports
pub fn config_with_dependencies(database_port: u16, redis_port: u16) -> ServerConfig {
    let mut config = ServerConfig::for_testing();
    config.database.port = database_port;
    config.redis.port = redis_port;
    config
}

/// Start the server against the configured datastores and return its address
pub async fn start(config: ServerConfig) -> (SocketAddr, CancellationToken) {
    Server::new(config, ShutdownConfig::default())
        .expect("Failed to create server")
        .run_for_testing()
        .await
        .expect("Failed to start test server")
}

/// Start the server against the given dependencies and return its address
pub async fn start_with(
    config: ServerConfig,
    dependencies: Arc<dyn DependencyChecker>,
) -> (SocketAddr, CancellationToken) {
    Server::with_dependencies(config, ShutdownConfig::default(), dependencies)
        .expect("Failed to create server")
        .run_for_testing()
        .await
        .expect("Failed to start test server")
}
