// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Liveness probes for the service's datastores
//!
//! This crate provides implementations of the `DependencyProbe` trait for the
//! two downstream dependencies of the backend API, and a registry that runs
//! them one after the other with per-probe fault isolation.
//!
//! # Architecture
//!
//! - **Probe Implementations**: [`postgres`] (`sqlx`), [`redis`] (`redis`) - authenticated
//!   round trips through the real client libraries
//! - **Registry Pattern**: [`registry::DependencyRegistry`] - sequential, isolated probing
//!
//! Both probes open a fresh connection per check. Neither keeps a pool, so
//! concurrent health checks never share mutable state.

pub mod postgres;
pub mod redis;
pub mod registry;

pub use postgres::*;
pub use redis::*;
pub use registry::*;
