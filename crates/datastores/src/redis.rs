// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Redis liveness probe
//!
//! Connects through the `redis` client, which authenticates when a password
//! is configured, and issues `PING`, expecting `PONG`.

use health_probe::{DependencyProbe, ProbeError};
use redis::{Client, ErrorKind, IntoConnectionInfo, RedisError};
use tracing::debug;

/// Configuration for the Redis probe
#[derive(Clone, PartialEq, Eq)]
pub struct RedisConfig {
    /// Redis host
    pub host: String,
    /// Redis port
    pub port: u16,
    /// Optional `AUTH` password
    pub password: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
        }
    }
}

impl std::fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl RedisConfig {
    fn client(&self) -> Result<Client, RedisError> {
        let mut info = (self.host.as_str(), self.port).into_connection_info()?;
        info.redis.password.clone_from(&self.password);
        Client::open(info)
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Probe for the key-value cache
#[derive(Debug, Clone)]
pub struct RedisProbe {
    config: RedisConfig,
}

impl RedisProbe {
    /// Create a new Redis probe
    pub fn new(config: RedisConfig) -> Self {
        Self { config }
    }

    /// Probe target configuration
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    fn classify(&self, error: RedisError) -> ProbeError {
        classify_error(&self.config.target(), error)
    }
}

impl DependencyProbe for RedisProbe {
    async fn probe(&self) -> Result<(), ProbeError> {
        let client = self.config.client().map_err(|e| self.classify(e))?;
        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| self.classify(e))?;

        let reply: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(|e| self.classify(e))?;

        if reply == "PONG" {
            debug!("redis answered PING");
            Ok(())
        } else {
            Err(ProbeError::unexpected_reply(reply.as_bytes()))
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Map a client error onto the probe error taxonomy
fn classify_error(target: &str, error: RedisError) -> ProbeError {
    if error.kind() == ErrorKind::AuthenticationFailed {
        ProbeError::Authentication {
            message: error.to_string(),
        }
    } else if error.is_connection_refusal() || error.is_io_error() {
        ProbeError::Connect {
            target: target.to_string(),
            source: std::io::Error::other(error),
        }
    } else {
        ProbeError::UnexpectedReply {
            message: error.to_string(),
        }
    }
}
