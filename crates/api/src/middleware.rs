// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Middleware module for HTTP request processing
//!
//! Every request passes the same stages in the same order:
//!
//! 1. [`context::tag_request`] assigns the correlation id
//! 2. [`timing::time_request`] measures the request
//! 3. [`access_log::log_access`] logs the request and its outcome
//! 4. [`security_headers::security_headers`] hardens the response headers
//! 5. [`guards::limit_declared_size`] rejects oversized declared bodies
//! 6. [`rate_limit::limit_site`] counts the request against the site limiter
//! 7. [`error_responder::respond_to_errors`] logs and renders handler errors
//!
//! Compression and the browser hardening headers of
//! [`security_headers::hardening_headers`] wrap the whole stack.
//!
//! Inside the API namespace, [`dispatch::guard_route_group`] then runs the
//! rate limiters and validators of the request's route group.

pub mod access_log;
pub mod context;
pub mod cors;
pub mod dispatch;
pub mod error_responder;
pub mod guards;
pub mod rate_limit;
pub mod security_headers;
pub mod timing;

pub use context::{REQUEST_ID_HEADER, RequestContext};
pub use dispatch::RouteGroup;
pub use rate_limit::{RateLimiter, RateLimiters};
