// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! PostgreSQL liveness probe
//!
//! Logs in with the configured credentials, runs `SELECT 1` and closes the
//! connection. A server that rejects the role or password is unhealthy.

use std::fmt;

use health_probe::{DependencyProbe, ProbeError};
use sqlx::{
    Connection,
    postgres::{PgConnectOptions, PgConnection},
};
use tracing::debug;

/// SQLSTATE codes of rejected logins
const AUTHENTICATION_FAILURES: [&str; 2] = ["28000", "28P01"];

/// Configuration for the PostgreSQL probe
#[derive(Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    /// Database host
    pub host: String,
    /// Database port
    pub port: u16,
    /// Login role
    pub user: String,
    /// Login password
    pub password: String,
    /// Database name
    pub database: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "password".to_string(),
            database: "backend_blockchain".to_string(),
        }
    }
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .finish()
    }
}

impl PostgresConfig {
    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Probe for the relational store
#[derive(Debug, Clone)]
pub struct PostgresProbe {
    config: PostgresConfig,
}

impl PostgresProbe {
    /// Create a new PostgreSQL probe
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }

    /// Probe target configuration
    pub fn config(&self) -> &PostgresConfig {
        &self.config
    }

    fn classify(&self, error: sqlx::Error) -> ProbeError {
        classify_error(&self.config.target(), error)
    }
}

impl DependencyProbe for PostgresProbe {
    async fn probe(&self) -> Result<(), ProbeError> {
        let mut connection = PgConnection::connect_with(&self.config.connect_options())
            .await
            .map_err(|e| self.classify(e))?;

        sqlx::query("SELECT 1")
            .execute(&mut connection)
            .await
            .map_err(|e| self.classify(e))?;
        connection.close().await.map_err(|e| self.classify(e))?;

        debug!(database = %self.config.database, "postgres answered SELECT 1");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "database"
    }
}

/// Map a driver error onto the probe error taxonomy
fn classify_error(target: &str, error: sqlx::Error) -> ProbeError {
    match error {
        sqlx::Error::Io(source) => ProbeError::Connect {
            target: target.to_string(),
            source,
        },
        sqlx::Error::Database(db)
            if db
                .code()
                .is_some_and(|code| AUTHENTICATION_FAILURES.contains(&&*code)) =>
        {
            ProbeError::Authentication {
                message: db.message().to_string(),
            }
        }
        other => ProbeError::UnexpectedReply {
            message: other.to_string(),
        },
    }
}
