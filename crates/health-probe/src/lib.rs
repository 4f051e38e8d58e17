// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Dependency health probe traits and utilities
//!
//! This crate provides the abstraction the server uses to ask whether a
//! downstream dependency (relational store, key-value cache) is reachable,
//! without knowing how the dependency is contacted.
//!
//! # Core Abstractions
//!
//! - **`DependencyProbe` Trait**: async liveness check implemented by each dependency
//! - **`ProbeError`**: failure classification for connection, protocol and timeout errors
//! - **`run_probe`**: executes one probe under a timeout and folds every failure into a
//!   [`ProbeOutcome`], so one broken dependency can never abort the checks of another
//! - **`run_isolated`**: the same on a spawned task, so a panicking probe only marks its own
//!   dependency unhealthy

use thiserror::Error;

pub mod outcome;

pub use outcome::*;

/// Liveness check for a downstream dependency
///
/// Implementations perform real I/O and must not block the runtime.
pub trait DependencyProbe: Send + Sync {
    /// Contact the dependency once
    ///
    /// # Errors
    ///
    /// Returns an error if the dependency cannot be reached or answers with
    /// something other than the expected liveness reply
    fn probe(&self) -> impl Future<Output = Result<(), ProbeError>> + Send;

    /// Name under which the dependency is reported (`database`, `redis`, ...)
    fn name(&self) -> &'static str;
}

/// Errors a probe can report
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ProbeError {
    /// TCP connection could not be established
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// The probe did not finish in time
    #[error("probe timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// The dependency answered, but not with the expected reply
    #[error("unexpected reply: {message}")]
    UnexpectedReply { message: String },

    /// The dependency refused the supplied credentials
    #[error("authentication rejected: {message}")]
    Authentication { message: String },

    /// I/O failure after the connection was established
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Probe-specific error
    #[error(transparent)]
    Custom { error: anyhow::Error },
}

impl ProbeError {
    /// Create an unexpected-reply error from the raw bytes received
    pub fn unexpected_reply(bytes: &[u8]) -> Self {
        Self::UnexpectedReply {
            message: String::from_utf8_lossy(bytes).trim_end().to_string(),
        }
    }
}
