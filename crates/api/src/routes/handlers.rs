// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP request handlers module
//!
//! This module provides HTTP request handlers for the API server: service
//! metadata, health checks, the placeholder user resource, and the not-found
//! responders.

use axum::{
    Json,
    extract::{OriginalUri, Path, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{ErrorBody, ErrorEnvelope};
use utoipa::ToSchema;

use crate::{
    health::{HealthFailure, HealthReport, HealthResponse, SimpleHealth},
    state::ServerState,
};

const DOCS_PATH: &str = "/api-docs";

fn original_url(uri: &Uri) -> &str {
    uri.path_and_query()
        .map_or_else(|| uri.path(), |pq| pq.as_str())
}

fn documentation(state: &ServerState, production_text: &'static str) -> String {
    if state.config().environment.is_production() {
        production_text.to_string()
    } else {
        DOCS_PATH.to_string()
    }
}

/// Links advertised by the index endpoints
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Endpoints {
    /// API index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    /// Health check
    #[schema(example = "/api/health")]
    pub health: String,
    /// User resource
    #[schema(example = "/api/v1/users")]
    pub users: String,
    /// Documentation location
    #[schema(example = "/api-docs")]
    pub documentation: String,
}

/// Service metadata
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// Greeting or API name
    #[schema(example = "Welcome to Backend API")]
    pub message: String,
    /// Service or API version
    pub version: String,
    /// Deployment environment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Time of the response
    pub timestamp: DateTime<Utc>,
    /// Known endpoints
    pub endpoints: Endpoints,
}

/// Welcome endpoint
#[utoipa::path(
    get,
    path = "/",
    tag = "meta",
    summary = "Service metadata",
    responses(
        (status = 200, description = "Service name, version and entry points", body = ServiceInfo)
    )
)]
pub async fn root_handler(State(state): State<ServerState>) -> Json<ServiceInfo> {
    let config = state.config();
    Json(ServiceInfo {
        message: format!("Welcome to {}", config.app.name),
        version: config.app.version.clone(),
        environment: Some(config.environment.to_string()),
        timestamp: Utc::now(),
        endpoints: Endpoints {
            api: Some("/api".to_string()),
            health: "/api/health".to_string(),
            users: "/api/v1/users".to_string(),
            documentation: documentation(&state, "Contact support for API documentation"),
        },
    })
}

/// API index endpoint
#[utoipa::path(
    get,
    path = "/api",
    tag = "meta",
    summary = "API metadata",
    responses(
        (status = 200, description = "API version and entry points", body = ServiceInfo)
    )
)]
pub async fn api_info_handler(State(state): State<ServerState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: state.config().app.name.clone(),
        version: "v1".to_string(),
        environment: None,
        timestamp: Utc::now(),
        endpoints: Endpoints {
            api: None,
            health: "/api/health".to_string(),
            users: "/api/v1/users".to_string(),
            documentation: documentation(&state, "Contact support"),
        },
    })
}

/// Health check endpoint handler
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    summary = "Health check endpoint",
    description = "Probes the relational store and the key-value cache. Each probe is \
        isolated: one failing dependency marks the report DEGRADED without skipping the other.",
    responses(
        (status = 200, description = "Every dependency is healthy", body = HealthReport),
        (status = 503, description = "At least one dependency is unhealthy", body = HealthReport),
        (status = 500, description = "The report could not be built", body = HealthFailure),
        (status = 429, description = "Health check rate limit exceeded", body = ErrorEnvelope)
    )
)]
pub async fn health_handler(State(state): State<ServerState>) -> Response {
    match state.health_check().await {
        HealthResponse::Report(report) => {
            let status = StatusCode::from_u16(report.http_status())
                .unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
            (status, Json(report)).into_response()
        }
        HealthResponse::Failure(failure) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(failure)).into_response()
        }
    }
}

/// Liveness endpoint handler
#[utoipa::path(
    get,
    path = "/api/health/simple",
    tag = "health",
    summary = "Liveness check",
    description = "Always answers OK without probing any dependency.",
    responses(
        (status = 200, description = "Service is alive", body = SimpleHealth)
    )
)]
pub async fn simple_health_handler() -> Json<SimpleHealth> {
    Json(SimpleHealth::OK)
}

/// A user of the service
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User unique identifier
    #[schema(example = "d290f1ee-6c54-4b01-90e6-d701748f0851")]
    pub id: String,
    /// User email address
    #[schema(example = "user@example.com")]
    pub email: String,
    /// User username
    #[schema(min_length = 3, max_length = 50, example = "johndoe")]
    pub username: String,
    /// User first name
    pub first_name: Option<String>,
    /// User last name
    pub last_name: Option<String>,
    /// User active status
    pub is_active: bool,
    /// User creation date
    pub created_at: DateTime<Utc>,
    /// User last update date
    pub updated_at: DateTime<Utc>,
}

/// Page position of a list response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    /// Current page, starting at 1
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Total number of items
    pub total: u64,
    /// Total number of pages
    pub pages: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            total: 0,
            pages: 0,
        }
    }
}

/// List of users
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserList {
    /// Informational message
    pub message: String,
    /// Users of the current page
    pub data: Vec<User>,
    /// Page position
    pub pagination: Pagination,
}

/// A single user lookup
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserLookup {
    /// Informational message
    pub message: String,
    /// The user, when found
    pub data: Option<User>,
}

/// List users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    summary = "List users",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "A page of users", body = UserList),
        (status = 429, description = "API rate limit exceeded", body = ErrorEnvelope)
    )
)]
pub async fn list_users_handler() -> Json<UserList> {
    Json(UserList {
        message: "This is an example users endpoint. Implement your logic here.".to_string(),
        data: Vec::new(),
        pagination: Pagination::default(),
    })
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    summary = "Get user by ID",
    security(("bearerAuth" = [])),
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "The user lookup", body = UserLookup),
        (status = 429, description = "API rate limit exceeded", body = ErrorEnvelope)
    )
)]
pub async fn get_user_handler(Path(id): Path<String>) -> Json<UserLookup> {
    Json(UserLookup {
        message: format!(
            "This is an example get user by ID endpoint for ID: {id}. Implement your logic here."
        ),
        data: None,
    })
}

/// Not-found responder inside the API namespace
pub async fn api_not_found_handler(OriginalUri(uri): OriginalUri) -> Response {
    let body = ErrorBody::new(404, format!("API endpoint {} not found", original_url(&uri)))
        .with(
            "availableEndpoints",
            serde_json::json!({
                "health": "/api/health",
                "users": "/api/v1/users",
            }),
        );
    (StatusCode::NOT_FOUND, Json(body.into_envelope())).into_response()
}

/// Not-found responder for every other path
pub async fn not_found_handler(method: Method, OriginalUri(uri): OriginalUri) -> Response {
    let url = original_url(&uri);
    let body = ErrorBody::new(404, format!("Route {url} not found"))
        .with("method", method.as_str())
        .with("path", url);
    (StatusCode::NOT_FOUND, Json(body.into_envelope())).into_response()
}
