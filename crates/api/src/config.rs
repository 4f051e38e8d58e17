// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server configuration module
//!
//! This module provides configuration structures and logic for the API server,
//! supporting different environments and validation of configuration parameters.

use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::Path,
    time::Duration,
};

use anyhow::{Result, anyhow, ensure};
use config::{Config, ConfigError, Environment as ConfigEnv, File};
use datastores::{PostgresConfig, RedisConfig};
use health_probe::ProbeTimeout;
use serde::{Deserialize, Deserializer, Serialize, de};
use shared_types::ApiVersion;

use crate::error::{ServerError, ServerResult};

const MIB: u64 = 1024 * 1024;

/// A validated server port that ensures the value is appropriate for the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerPort {
    port: u16,
    environment: Environment,
}

impl ServerPort {
    /// Create a new `ServerPort`, ensuring it's valid for the given environment
    ///
    /// # Errors
    ///
    /// Returns an error if the port is 0 in non-testing environments
    pub fn new(port: u16, environment: Environment) -> Result<Self> {
        if port == 0 && environment != Environment::Testing {
            return Err(anyhow!("port cannot be 0 in non-testing environments"));
        }
        Ok(Self { port, environment })
    }

    /// Create a safe default port for development
    pub const fn default_development() -> Self {
        Self {
            port: 3000,
            environment: Environment::Development,
        }
    }

    /// Create a safe testing port (port 0)
    pub const fn testing() -> Self {
        Self {
            port: 0,
            environment: Environment::Testing,
        }
    }

    /// Get the port value
    pub fn value(&self) -> u16 {
        self.port
    }
}

impl<'de> Deserialize<'de> for ServerPort {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let port = u16::deserialize(deserializer)?;
        // Validated against the environment once loading is complete
        Ok(Self {
            port,
            environment: Environment::Development,
        })
    }
}

impl Default for ServerPort {
    fn default() -> Self {
        Self::default_development()
    }
}

/// A validated timeout duration in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeoutSeconds(Duration);

impl TimeoutSeconds {
    /// Create a new `TimeoutSeconds`, ensuring the value is within valid bounds
    ///
    /// # Errors
    ///
    /// Returns an error if timeout is 0 or greater than 300 seconds
    pub fn new(seconds: u64) -> Result<Self> {
        ensure!(seconds != 0, "timeout must be greater than 0");
        ensure!(seconds <= 300, "timeout cannot exceed 300");
        Ok(Self(Duration::from_secs(seconds)))
    }

    /// Create a safe default timeout (30 seconds)
    pub const fn default_value() -> Self {
        Self(Duration::from_secs(30))
    }

    /// Create a safe testing timeout (5 seconds)
    pub const fn testing() -> Self {
        Self(Duration::from_secs(5))
    }

    /// Get the timeout value
    pub fn value(&self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for TimeoutSeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = u64::deserialize(deserializer)?;
        Self::new(seconds).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl Default for TimeoutSeconds {
    fn default() -> Self {
        Self::default_value()
    }
}

/// Environment types for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Production environment
    Production,
    /// Development environment
    #[default]
    Development,
    /// Testing environment, silences the access log
    Testing,
}

impl Environment {
    /// Check if this is the production environment
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Check if this is the development environment
    pub fn is_development(self) -> bool {
        matches!(self, Environment::Development)
    }

    /// Check if this is the designated test mode
    pub fn is_test_mode(self) -> bool {
        matches!(self, Environment::Testing)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
            Environment::Testing => write!(f, "testing"),
        }
    }
}

/// Service metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Service name shown in metadata and health responses
    pub name: String,
    /// Service version
    pub version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Backend API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Cross-origin policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins that are always allowed
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Request limits applied by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestLimitsConfig {
    /// Ceiling for the declared `Content-Length`
    pub max_body_bytes: u64,
    /// Requests slower than this are logged as warnings
    pub slow_request_threshold_ms: u64,
}

impl Default for RequestLimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * MIB,
            slow_request_threshold_ms: 1_000,
        }
    }
}

impl RequestLimitsConfig {
    /// Human-readable body ceiling (`"10MB"`)
    pub fn max_body_label(&self) -> String {
        if self.max_body_bytes >= MIB && self.max_body_bytes % MIB == 0 {
            format!("{}MB", self.max_body_bytes / MIB)
        } else {
            format!("{} bytes", self.max_body_bytes)
        }
    }

    /// Slow-request threshold as a duration
    pub fn slow_request_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_request_threshold_ms)
    }
}

/// API versioning policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Versions accepted by the version validator
    pub supported_versions: Vec<ApiVersion>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            supported_versions: vec![ApiVersion::current()],
        }
    }
}

/// One fixed-window rate limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    /// Window length in seconds
    pub window_seconds: u64,
    /// Requests admitted per client per window
    pub max_requests: u32,
}

impl RateLimitRule {
    /// Create a rule
    pub const fn new(window_seconds: u64, max_requests: u32) -> Self {
        Self {
            window_seconds,
            max_requests,
        }
    }

    /// Window length
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds.max(1))
    }

    /// Human-readable window length for `retryAfter` (`"15 minutes"`)
    pub fn window_label(&self) -> String {
        let seconds = self.window_seconds.max(1);
        let (amount, unit) = if seconds % 3600 == 0 {
            (seconds / 3600, "hour")
        } else if seconds % 60 == 0 {
            (seconds / 60, "minute")
        } else {
            (seconds, "second")
        };
        if amount == 1 {
            format!("1 {unit}")
        } else {
            format!("{amount} {unit}s")
        }
    }
}

/// Configuration for the rate limiters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitingConfig {
    /// Whether rate limiting is enforced at all
    pub enabled: bool,
    /// Limiter applied to every route of the site
    pub site: RateLimitRule,
    /// Limiter for versioned API routes
    pub api: RateLimitRule,
    /// Limiter for authentication endpoints
    pub auth: RateLimitRule,
    /// Limiter for health checks
    pub health: RateLimitRule,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            site: RateLimitRule::new(15 * 60, 100),
            api: RateLimitRule::new(15 * 60, 10_000),
            auth: RateLimitRule::new(15 * 60, 5),
            health: RateLimitRule::new(60, 3_000),
        }
    }
}

/// Relational store probe target
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Database host
    pub host: String,
    /// Database port
    pub port: u16,
    /// Login role
    pub user: String,
    /// Login password
    pub password: String,
    /// Database name
    pub name: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "password".to_string(),
            name: "backend_blockchain".to_string(),
        }
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("name", &self.name)
            .finish()
    }
}

impl From<&DatabaseSettings> for PostgresConfig {
    fn from(settings: &DatabaseSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            user: settings.user.clone(),
            password: settings.password.clone(),
            database: settings.name.clone(),
        }
    }
}

/// Key-value cache probe target
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    /// Redis host
    pub host: String,
    /// Redis port
    pub port: u16,
    /// Optional password
    pub password: Option<String>,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
        }
    }
}

impl fmt::Debug for RedisSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl From<&RedisSettings> for RedisConfig {
    fn from(settings: &RedisSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            password: settings.password.clone(),
        }
    }
}

/// Health check settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Per-probe timeout in milliseconds
    pub probe_timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 2_000,
        }
    }
}

impl HealthConfig {
    /// Per-probe timeout
    pub fn probe_timeout(&self) -> ProbeTimeout {
        ProbeTimeout::from_millis(self.probe_timeout_ms)
    }
}

/// Server configuration for different environments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address
    pub host: IpAddr,
    /// Server port (validated for environment compatibility)
    pub port: ServerPort,
    /// Request timeout in seconds (validated range: 1-300)
    pub timeout_seconds: TimeoutSeconds,
    /// Environment type
    pub environment: Environment,
    /// Service metadata
    pub app: AppConfig,
    /// Cross-origin policy
    pub cors: CorsConfig,
    /// Request limits
    pub limits: RequestLimitsConfig,
    /// API versioning policy
    pub api: ApiConfig,
    /// Rate limiter settings
    pub rate_limiting: RateLimitingConfig,
    /// Relational store probe target
    pub database: DatabaseSettings,
    /// Key-value cache probe target
    pub redis: RedisSettings,
    /// Health check settings
    pub health: HealthConfig,
}

impl ServerConfig {
    /// Create configuration from environment variables and optional configuration files
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if configuration is invalid or cannot be loaded.
    pub fn from_env() -> ServerResult<Self> {
        Self::load().map_err(|e| ServerError::Config {
            message: format!("failed to load configuration: {e}"),
        })
    }

    /// Load configuration from the working directory
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."))
    }

    /// Load configuration using the config crate with hierarchical sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. Configuration file (`config.json`)
    /// 3. Environment-specific file (`config.{env}.json`)
    /// 4. Environment variables with `SERVER__` prefix and `__` nesting
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or is invalid.
    pub fn load_from(dir: &Path) -> Result<Self, ConfigError> {
        let env_var = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let env_name = env_var.to_lowercase();

        let mut config_builder = Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 3000)?
            .set_default("timeout_seconds", 30)?
            .set_default("environment", "development")?
            .add_source(File::from(dir.join("config.json")).required(false))
            .add_source(File::from(dir.join(format!("config.{env_name}.json"))).required(false))
            .add_source(
                ConfigEnv::with_prefix("SERVER")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .with_list_parse_key("api.supported_versions")
                    .try_parsing(true),
            );

        if std::env::var("ENVIRONMENT").is_ok() {
            config_builder = config_builder.set_override("environment", env_name)?;
        }

        let config = config_builder.build()?;
        let mut server_config: Self = config.try_deserialize()?;

        // Fix the ServerPort to have the correct environment context
        server_config.port = ServerPort::new(server_config.port.value(), server_config.environment)
            .map_err(|e| ConfigError::Message(format!("invalid port configuration: {e}")))?;

        if server_config.api.supported_versions.is_empty() {
            return Err(ConfigError::Message(
                "at least one supported API version is required".to_string(),
            ));
        }

        Ok(server_config)
    }

    /// Create configuration optimized for testing
    ///
    /// Dependency probes point at a local port where nothing listens, so the
    /// health report is degraded unless a test overrides the targets.
    pub fn for_testing() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: ServerPort::testing(), // let OS choose available port
            timeout_seconds: TimeoutSeconds::testing(),
            environment: Environment::Testing,
            database: DatabaseSettings {
                host: "127.0.0.1".to_string(),
                port: 1,
                ..DatabaseSettings::default()
            },
            redis: RedisSettings {
                host: "127.0.0.1".to_string(),
                port: 1,
                password: None,
            },
            health: HealthConfig {
                probe_timeout_ms: 500,
            },
            ..Self::default()
        }
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port.value())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: ServerPort::default(),
            timeout_seconds: TimeoutSeconds::default(),
            environment: Environment::default(),
            app: AppConfig::default(),
            cors: CorsConfig::default(),
            limits: RequestLimitsConfig::default(),
            api: ApiConfig::default(),
            rate_limiting: RateLimitingConfig::default(),
            database: DatabaseSettings::default(),
            redis: RedisSettings::default(),
            health: HealthConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn timeout_validation() {
        // Invalid timeout values should fail to construct
        assert!(TimeoutSeconds::new(0).is_err());
        assert!(TimeoutSeconds::new(400).is_err());

        // Valid timeout values should construct successfully
        assert!(TimeoutSeconds::new(30).is_ok());
        assert!(TimeoutSeconds::new(1).is_ok());
        assert!(TimeoutSeconds::new(300).is_ok());
    }

    #[test]
    fn server_port_validation() {
        // Port 0 should only be valid in testing environment
        assert!(ServerPort::new(0, Environment::Testing).is_ok());
        assert!(ServerPort::new(0, Environment::Development).is_err());
        assert!(ServerPort::new(0, Environment::Production).is_err());

        // Non-zero ports should be valid in all environments
        assert!(ServerPort::new(3000, Environment::Development).is_ok());
        assert!(ServerPort::new(443, Environment::Production).is_ok());
    }

    #[test]
    fn environment_display() {
        assert_eq!(Environment::Production.to_string(), "production");
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Testing.to_string(), "testing");
    }

    #[test]
    fn pipeline_defaults() {
        let config = ServerConfig::default();

        assert_eq!(config.limits.max_body_bytes, 10 * 1024 * 1024);
        assert_eq!(config.limits.max_body_label(), "10MB");
        assert_eq!(
            config.limits.slow_request_threshold(),
            Duration::from_millis(1000)
        );
        assert_eq!(config.api.supported_versions, vec![ApiVersion::current()]);

        let limits = &config.rate_limiting;
        assert!(limits.enabled);
        assert_eq!(limits.site, RateLimitRule::new(900, 100));
        assert_eq!(limits.api, RateLimitRule::new(900, 10_000));
        assert_eq!(limits.auth, RateLimitRule::new(900, 5));
        assert_eq!(limits.health, RateLimitRule::new(60, 3_000));
    }

    #[test]
    fn window_labels() {
        assert_eq!(RateLimitRule::new(900, 5).window_label(), "15 minutes");
        assert_eq!(RateLimitRule::new(60, 5).window_label(), "1 minute");
        assert_eq!(RateLimitRule::new(3600, 5).window_label(), "1 hour");
        assert_eq!(RateLimitRule::new(45, 5).window_label(), "45 seconds");
        assert_eq!(RateLimitRule::new(0, 5).window(), Duration::from_secs(1));
    }

    #[test]
    fn body_label_for_odd_sizes() {
        let limits = RequestLimitsConfig {
            max_body_bytes: 1500,
            ..RequestLimitsConfig::default()
        };
        assert_eq!(limits.max_body_label(), "1500 bytes");
    }

    #[test]
    fn testing_config() {
        let config = ServerConfig::for_testing();
        assert_eq!(config.environment, Environment::Testing);
        assert!(config.environment.is_test_mode());
        assert_eq!(config.port.value(), 0);
        assert_eq!(config.redis.port, 1);
    }

    #[test]
    fn redis_password_is_not_printed() {
        let settings = RedisSettings {
            password: Some("hunter2".to_string()),
            ..RedisSettings::default()
        };
        assert!(!format!("{settings:?}").contains("hunter2"));
    }

    #[test]
    fn database_credentials_reach_the_connection_target() {
        let settings = DatabaseSettings {
            password: "s3cr3t".to_string(),
            ..DatabaseSettings::default()
        };
        assert!(!format!("{settings:?}").contains("s3cr3t"));

        let target = PostgresConfig::from(&settings);
        assert_eq!(target.user, "postgres");
        assert_eq!(target.password, "s3cr3t");
        assert_eq!(target.database, "backend_blockchain");
    }

    #[test]
    fn load_from_layers_files() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(
            dir.path().join("config.json"),
            r#"{
                "port": 8080,
                "app": { "name": "Ledger API" },
                "rate_limiting": { "auth": { "window_seconds": 60, "max_requests": 3 } },
                "redis": { "host": "cache.internal" }
            }"#,
        )
        .expect("Failed to write config file");

        let config = ServerConfig::load_from(dir.path()).expect("Failed to load config");

        assert_eq!(config.port.value(), 8080);
        assert_eq!(config.app.name, "Ledger API");
        assert_eq!(config.rate_limiting.auth, RateLimitRule::new(60, 3));
        // Untouched siblings keep their defaults
        assert_eq!(config.rate_limiting.health, RateLimitRule::new(60, 3_000));
        assert_eq!(config.redis.host, "cache.internal");
        assert_eq!(config.redis.port, 6379);
    }

    #[test]
    fn load_from_rejects_empty_version_set() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(
            dir.path().join("config.json"),
            r#"{ "api": { "supported_versions": [] } }"#,
        )
        .expect("Failed to write config file");

        assert!(ServerConfig::load_from(dir.path()).is_err());
    }

    #[test]
    fn load_from_rejects_invalid_version_token() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(
            dir.path().join("config.json"),
            r#"{ "api": { "supported_versions": ["latest"] } }"#,
        )
        .expect("Failed to write config file");

        assert!(ServerConfig::load_from(dir.path()).is_err());
    }
}
