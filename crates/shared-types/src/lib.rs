// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared types for the backend API service
//!
//! This crate provides the wire types that are shared across multiple crates
//! in the workspace, avoiding circular dependencies between the server and
//! the dependency probes.

pub mod api_version;
pub mod error_body;
pub mod health_status;

pub use api_version::{ApiVersion, ApiVersionError};
pub use error_body::{ErrorBody, ErrorEnvelope};
pub use health_status::{DependencyStatus, OverallStatus};
