// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! `OpenAPI` document definition

use shared_types::{DependencyStatus, ErrorBody, ErrorEnvelope, OverallStatus};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{
    config::Environment,
    health::{HealthChecks, HealthFailure, HealthReport, MemorySnapshot, SimpleHealth},
    routes::handlers::{self, Endpoints, Pagination, ServiceInfo, User, UserList, UserLookup},
};

/// Registers the bearer token scheme referenced by the user routes
#[derive(Debug)]
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// `OpenAPI` document of the service
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "Backend API",
        description = "HTTP API scaffold with health checks, rate limiting and request validation"
    ),
    paths(
        handlers::root_handler,
        handlers::api_info_handler,
        handlers::health_handler,
        handlers::simple_health_handler,
        handlers::list_users_handler,
        handlers::get_user_handler,
    ),
    components(schemas(
        DependencyStatus,
        Endpoints,
        Environment,
        ErrorBody,
        ErrorEnvelope,
        HealthChecks,
        HealthFailure,
        HealthReport,
        MemorySnapshot,
        OverallStatus,
        Pagination,
        ServiceInfo,
        SimpleHealth,
        User,
        UserList,
        UserLookup,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "meta", description = "Service metadata"),
        (name = "health", description = "Health checks"),
        (name = "users", description = "User management endpoints")
    )
)]
pub struct ApiDoc;
