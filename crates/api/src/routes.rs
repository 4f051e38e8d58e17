// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Routes module
//!
//! This module provides route configuration for the API server. Everything
//! under `/api` is dispatched through the route-group guards; the site root,
//! metrics, and documentation are not.

pub mod handlers;

use axum::{Router, middleware, routing::get};
use handlers::{
    api_info_handler, api_not_found_handler, get_user_handler, health_handler,
    list_users_handler, not_found_handler, root_handler, simple_health_handler,
};

use crate::{
    metrics::metrics_handler,
    middleware::dispatch::{API_PREFIX, guard_route_group},
    openapi::{OPENAPI_JSON_PATH, openapi_spec, swagger_ui},
    state::ServerState,
};

/// Routes of the API namespace, relative to `/api`
fn api_routes(state: &ServerState) -> Router<ServerState> {
    Router::new()
        .route("/", get(api_info_handler))
        .route("/health", get(health_handler))
        .route("/health/simple", get(simple_health_handler))
        .route("/v1/users", get(list_users_handler))
        .route("/v1/users/{id}", get(get_user_handler))
        .fallback(api_not_found_handler)
        .method_not_allowed_fallback(api_not_found_handler)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard_route_group,
        ))
}

/// Create application routes
///
/// Documentation is only mounted outside production.
pub fn create_routes(state: &ServerState) -> Router<ServerState> {
    let mut router = Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .nest(API_PREFIX, api_routes(state));

    if !state.config().environment.is_production() {
        router = router
            .route("/api-docs", get(swagger_ui))
            .route(OPENAPI_JSON_PATH, get(openapi_spec));
    }

    router
        .fallback(not_found_handler)
        .method_not_allowed_fallback(not_found_handler)
}
