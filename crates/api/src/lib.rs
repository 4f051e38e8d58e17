// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Backend API Server Implementation
//!
//! This crate provides the HTTP server for the backend API service, built with Axum
//! and designed for production use with layered configuration, a fixed request
//! pipeline, dependency health checks, and graceful shutdown.
//!
//! # Module Structure
//!
//! - [`config`]: Server configuration and environment management with hierarchical loading
//! - [`error`]: Error types and the uniform JSON error envelope
//! - [`state`]: Shared application state management with cancellation token support
//! - [`server`]: Main server implementation, request pipeline, and coordinated shutdown
//! - [`routes`]: Route configuration, request handlers, and not-found responders
//! - [`middleware`]: Request pipeline stages and route-group guards
//! - [`health`]: Fault-isolated aggregation of the dependency probes
//! - [`metrics`]: Prometheus request, rate limit, and probe metrics
//! - [`docs`]: `OpenAPI` document of the service
//! - [`openapi`]: `OpenAPI` specification and Swagger UI endpoints
//!
//! # Key Features
//!
//! - **Request Pipeline**: Correlation ids, timing, access logs with redaction,
//!   security headers, and a declared-size guard on every request
//! - **Route Groups**: API version, content-type, and fixed-window rate limit guards
//!   chosen by path under `/api`
//! - **Health Monitoring**: `PostgreSQL` and `Redis` probes where one failure never
//!   skips the other
//! - **Centralized Errors**: Every failure is logged once and rendered as
//!   `{"error": {"message", "status", ...}}`
//! - **Graceful Shutdown**: Coordinated termination using `CancellationToken` with timeouts

pub mod config;
pub mod docs;
pub mod error;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{Environment, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use health::{DependencyChecker, HealthReport, HealthResponse};
pub use server::{Server, ShutdownConfig};
pub use shared_types::{ApiVersion, ErrorBody, ErrorEnvelope};
pub use state::ServerState;
